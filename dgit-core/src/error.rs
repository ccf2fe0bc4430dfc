//! Error taxonomy for dgit storage operations

use std::path::PathBuf;

use crate::object::{ObjectId, ObjectKind};

/// Result type for dgit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing repository state
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("Corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    #[error("Invalid object id: {0:?}")]
    InvalidObjectId(String),

    #[error("Object {id} is a {actual}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("Truncated tree: entry '{name}' needs 20 digest bytes, {remaining} left")]
    TruncatedTree { name: String, remaining: usize },

    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    #[error("Truncated index: {0}")]
    TruncatedIndex(String),

    #[error("Bad index signature: {0:?}")]
    BadSignature([u8; 4]),

    #[error("Unsupported index version: {0}")]
    UnsupportedIndexVersion(u32),

    #[error("Malformed commit: {0}")]
    MalformedCommit(String),

    #[error("While walking history at {id}: {source}")]
    History {
        id: ObjectId,
        #[source]
        source: Box<Error>,
    },

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Attach a filesystem path to an I/O error
    pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::IoAt { path, source }
    }
}
