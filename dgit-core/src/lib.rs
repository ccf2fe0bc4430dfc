//! dgit Core Library
//!
//! Content-addressable storage for a minimal version-control system:
//! - Object model and SHA-1 addressing (blob, tree, commit)
//! - Loose, zlib-compressed object store
//! - Tree and commit encodings
//! - Binary staging index
//! - Linear history traversal
//! - Repository handle and configuration

pub mod commit;
pub mod config;
pub mod error;
pub mod history;
pub mod index;
pub mod object;
pub mod repository;
pub mod store;
pub mod tree;

pub use commit::{Commit, Signature};
pub use config::{RepositoryConfig, UserConfig};
pub use error::{Error, Result};
pub use history::HistoryWalker;
pub use index::{Index, IndexEntry};
pub use object::{hash_object, ObjectId, ObjectKind};
pub use repository::{IndexedPath, Repository, DGIT_DIR};
pub use store::ObjectStore;
pub use tree::{TreeEntry, TreeMode};
