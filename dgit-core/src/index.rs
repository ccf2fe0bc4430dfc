//! Binary staging index
//!
//! ```text
//! header   "DIRC" | version u32 BE (1) | count u32 BE
//! entry*   mode u32 BE | sha1 [20] | path_len u16 BE | path bytes
//! ```
//!
//! The file is always read whole, modified in memory and rewritten whole
//! through a temp file and rename.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{ID_LEN, ObjectId};

/// Index file signature
pub const INDEX_SIGNATURE: &[u8; 4] = b"DIRC";

/// Index format version
pub const INDEX_VERSION: u32 = 1;

const HEADER_LEN: usize = 12;
const ENTRY_FIXED_LEN: usize = 4 + ID_LEN + 2;

/// A staged path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub mode: u32,
    pub hash: ObjectId,
    pub path: String,
}

impl IndexEntry {
    pub fn new(mode: u32, hash: ObjectId, path: impl Into<String>) -> Self {
        Self {
            mode,
            hash,
            path: path.into(),
        }
    }
}

/// Handle on a repository's index file
#[derive(Debug, Clone)]
pub struct Index {
    path: PathBuf,
}

impl Index {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry. A missing index file is an empty index.
    pub fn load(&self) -> Result<Vec<IndexEntry>> {
        match fs::read(&self.path) {
            Ok(data) => decode(&data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::IoAt {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Replace the index file with exactly `entries`, in order
    pub fn save(&self, entries: &[IndexEntry]) -> Result<()> {
        let data = encode(entries)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &data).map_err(Error::io_at(&tmp_path))?;
        fs::rename(&tmp_path, &self.path).map_err(Error::io_at(&self.path))?;
        debug!(entries = entries.len(), path = %self.path.display(), "wrote index");
        Ok(())
    }

    /// Stage `path` at `hash`: replace its entry in place or append a new one
    pub fn stage(&self, path: &str, hash: ObjectId, mode: u32) -> Result<()> {
        let mut entries = self.load()?;
        match entries.iter_mut().find(|e| e.path == path) {
            Some(existing) => {
                existing.hash = hash;
                existing.mode = mode;
            }
            None => entries.push(IndexEntry::new(mode, hash, path)),
        }
        self.save(&entries)
    }
}

/// Serialize entries into the on-disk index format
pub fn encode(entries: &[IndexEntry]) -> Result<Vec<u8>> {
    let count = u32::try_from(entries.len())
        .map_err(|_| Error::Usage(format!("too many index entries: {}", entries.len())))?;

    let mut buf = Vec::with_capacity(HEADER_LEN + entries.len() * (ENTRY_FIXED_LEN + 32));
    buf.extend_from_slice(INDEX_SIGNATURE);
    buf.extend_from_slice(&INDEX_VERSION.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());

    for entry in entries {
        let path_len = u16::try_from(entry.path.len()).map_err(|_| {
            Error::Usage(format!("path too long for index: {} bytes", entry.path.len()))
        })?;
        buf.extend_from_slice(&entry.mode.to_be_bytes());
        buf.extend_from_slice(entry.hash.as_bytes());
        buf.extend_from_slice(&path_len.to_be_bytes());
        buf.extend_from_slice(entry.path.as_bytes());
    }
    Ok(buf)
}

/// Parse the on-disk index format
pub fn decode(data: &[u8]) -> Result<Vec<IndexEntry>> {
    let mut reader = Reader { data, pos: 0 };

    let signature: [u8; 4] = reader.take_array("signature")?;
    if &signature != INDEX_SIGNATURE {
        return Err(Error::BadSignature(signature));
    }
    let version = u32::from_be_bytes(reader.take_array("version")?);
    if version != INDEX_VERSION {
        return Err(Error::UnsupportedIndexVersion(version));
    }
    let count = u32::from_be_bytes(reader.take_array("entry count")?);

    let mut entries = Vec::new();
    for i in 0..count {
        let mode = u32::from_be_bytes(reader.take_array("entry mode")?);
        let hash = ObjectId::new(reader.take_array("entry hash")?);
        let path_len = u16::from_be_bytes(reader.take_array("path length")?);
        let path = reader.take(path_len as usize, "path")?;
        let path = String::from_utf8(path.to_vec())
            .map_err(|_| Error::TruncatedIndex(format!("entry {} path is not UTF-8", i)))?;
        entries.push(IndexEntry { mode, hash, path });
    }
    Ok(entries)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if remaining < len {
            return Err(Error::TruncatedIndex(format!(
                "{} needs {} bytes at offset {}, {} left",
                what, len, self.pos, remaining
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take(N, what)?);
        Ok(arr)
    }
}
