//! Tree objects: one directory level as `(mode, name, child id)` records
//!
//! Wire format per entry: `"<mode> <name>\0"` followed by the 20 raw digest
//! bytes of the child. Entries are sorted by name before encoding so a
//! snapshot's id depends only on its content.

use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{ID_LEN, ObjectId, ObjectKind};
use crate::repository::DGIT_DIR;
use crate::store::ObjectStore;

/// Entry mode. Only regular files and directories are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeMode {
    Regular,
    Directory,
}

impl TreeMode {
    /// Mode literal written into tree payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeMode::Regular => "100644",
            TreeMode::Directory => "40000",
        }
    }

    /// Numeric mode, as recorded in the index
    pub fn as_u32(&self) -> u32 {
        match self {
            TreeMode::Regular => 0o100644,
            TreeMode::Directory => 0o40000,
        }
    }

    /// Object kind the child id refers to
    pub fn kind(&self) -> ObjectKind {
        match self {
            TreeMode::Regular => ObjectKind::Blob,
            TreeMode::Directory => ObjectKind::Tree,
        }
    }

    /// Parse a mode literal; both `40000` and `040000` mean directory
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "100644" => Some(TreeMode::Regular),
            "40000" | "040000" => Some(TreeMode::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for TreeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory tree entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: TreeMode,
    /// Single path segment, never containing `/`
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry
    pub fn new(mode: TreeMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }
}

impl fmt::Display for TreeEntry {
    /// `ls-tree` rendering: `<mode> <kind> <hex>\t<name>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}\t{}", self.mode, self.mode.kind(), self.id, self.name)
    }
}

/// Encode entries as a tree payload, sorted by name byte-wise
pub fn encode(entries: &[TreeEntry]) -> Vec<u8> {
    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

    let mut buf = Vec::new();
    for entry in sorted {
        buf.extend_from_slice(entry.mode.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(entry.name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(entry.id.as_bytes());
    }
    buf
}

/// Decode a tree payload into its entries, in stored order
pub fn decode(payload: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut rest = payload;

    while !rest.is_empty() {
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::MalformedTree("entry header has no NUL terminator".to_string()))?;
        let head = std::str::from_utf8(&rest[..nul])
            .map_err(|_| Error::MalformedTree("entry header is not UTF-8".to_string()))?;
        let (mode, name) = head
            .split_once(' ')
            .ok_or_else(|| Error::MalformedTree(format!("entry header {:?} has no space", head)))?;
        let mode = TreeMode::parse(mode)
            .ok_or_else(|| Error::MalformedTree(format!("unknown mode {:?}", mode)))?;
        if name.is_empty() || name.contains('/') {
            return Err(Error::MalformedTree(format!("bad entry name {:?}", name)));
        }

        rest = &rest[nul + 1..];
        if rest.len() < ID_LEN {
            return Err(Error::TruncatedTree {
                name: name.to_string(),
                remaining: rest.len(),
            });
        }
        let (digest, tail) = rest.split_at(ID_LEN);
        let id = ObjectId::from_slice(digest).ok_or_else(|| Error::TruncatedTree {
            name: name.to_string(),
            remaining: digest.len(),
        })?;

        entries.push(TreeEntry::new(mode, name, id));
        rest = tail;
    }

    Ok(entries)
}

/// Load and decode a tree object from the store
pub fn read_tree(store: &ObjectStore, id: &ObjectId) -> Result<Vec<TreeEntry>> {
    let payload = store.get_kind(id, ObjectKind::Tree)?;
    decode(&payload)
}

/// Snapshot a directory into the store, depth-first, and return its tree id.
///
/// The metadata directory and names listed in `ignore` are skipped at every
/// level. Anything that is neither a regular file nor a directory (symlinks,
/// sockets) is skipped.
pub fn write_tree(store: &ObjectStore, dir: &Path, ignore: &[String]) -> Result<ObjectId> {
    let mut entries = Vec::new();

    for dirent in fs::read_dir(dir).map_err(Error::io_at(dir))? {
        let dirent = dirent.map_err(Error::io_at(dir))?;
        let name = dirent.file_name();
        let Some(name) = name.to_str() else {
            debug!(path = %dirent.path().display(), "skipping non UTF-8 name");
            continue;
        };
        if name == DGIT_DIR || ignore.iter().any(|reserved| reserved == name) {
            continue;
        }

        let path = dirent.path();
        let file_type = dirent.file_type().map_err(Error::io_at(&path))?;
        if file_type.is_dir() {
            let id = write_tree(store, &path, ignore)?;
            entries.push(TreeEntry::new(TreeMode::Directory, name, id));
        } else if file_type.is_file() {
            let id = store.put_file(&path)?;
            entries.push(TreeEntry::new(TreeMode::Regular, name, id));
        } else {
            debug!(path = %path.display(), "skipping special file");
        }
    }

    let id = store.put(ObjectKind::Tree, &encode(&entries))?;
    debug!(%id, dir = %dir.display(), entries = entries.len(), "wrote tree");
    Ok(id)
}
