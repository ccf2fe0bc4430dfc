//! Loose object storage
//!
//! Objects live at `objects/<first 2 hex>/<remaining 38 hex>`, each one a
//! zlib stream of `"<kind> <len>\0" + payload`. The digest is the location,
//! so lookups are a single path construction with no manifest to consult.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::object::{self, ObjectId, ObjectKind};

/// Content-addressed object store rooted at an `objects/` directory
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a store handle over an existing or future `objects/` directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of an object on disk, whether or not it exists
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        let (prefix, rest) = hex.split_at(2);
        self.root.join(prefix).join(rest)
    }

    /// Check if object exists
    pub fn exists(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// Store a payload under its content address and return the id.
    ///
    /// Writing an object that is already present is a no-op.
    pub fn put(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let id = object::hash_object(kind, payload);
        if self.exists(&id) {
            trace!(%id, %kind, "object already stored");
            return Ok(id);
        }

        let path = self.object_path(&id);
        let dir = path
            .parent()
            .ok_or_else(|| Error::Usage(format!("object path {:?} has no parent", path)))?;
        fs::create_dir_all(dir).map_err(Error::io_at(dir))?;

        // Compress into a sibling temp file first so the final path only ever
        // holds a complete object.
        let tmp_path = path.with_extension("tmp");
        if let Err(e) = write_compressed(&tmp_path, kind, payload) {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::IoAt {
                path: tmp_path,
                source: e,
            });
        }
        fs::rename(&tmp_path, &path).map_err(Error::io_at(&path))?;

        debug!(%id, %kind, size = payload.len(), "wrote object");
        Ok(id)
    }

    /// Hash a file's content as a blob and store it
    pub fn put_file(&self, path: &Path) -> Result<ObjectId> {
        let content = fs::read(path).map_err(Error::io_at(path))?;
        self.put(ObjectKind::Blob, &content)
    }

    /// Read an object back as its kind and payload
    pub fn get(&self, id: &ObjectId) -> Result<(ObjectKind, Vec<u8>)> {
        let file = self.open(id)?;
        let mut raw = Vec::new();
        ZlibDecoder::new(file)
            .read_to_end(&mut raw)
            .map_err(|e| self.read_error(id, e))?;

        let (kind, payload) = object::unframe(*id, &raw)?;
        debug!(%id, %kind, size = payload.len(), "read object");
        Ok((kind, payload.to_vec()))
    }

    /// Read an object and require it to be of the given kind
    pub fn get_kind(&self, id: &ObjectId, expected: ObjectKind) -> Result<Vec<u8>> {
        let (actual, payload) = self.get(id)?;
        if actual != expected {
            return Err(Error::UnexpectedKind {
                id: *id,
                expected,
                actual,
            });
        }
        Ok(payload)
    }

    /// Read only the header of an object: its kind and declared size
    pub fn read_header(&self, id: &ObjectId) -> Result<(ObjectKind, usize)> {
        let file = self.open(id)?;
        let mut reader = BufReader::new(ZlibDecoder::new(file));
        let mut header = Vec::new();
        reader
            .read_until(0, &mut header)
            .map_err(|e| self.read_error(id, e))?;

        if header.pop() != Some(0) {
            return Err(Error::CorruptObject {
                id: *id,
                reason: "missing header separator".to_string(),
            });
        }
        object::parse_header(&header).map_err(|reason| Error::CorruptObject { id: *id, reason })
    }

    fn open(&self, id: &ObjectId) -> Result<File> {
        let path = self.object_path(id);
        File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(*id),
            _ => Error::IoAt { path, source: e },
        })
    }

    fn read_error(&self, id: &ObjectId, e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof => Error::CorruptObject {
                id: *id,
                reason: format!("decompression failed: {}", e),
            },
            _ => Error::IoAt {
                path: self.object_path(id),
                source: e,
            },
        }
    }
}

fn write_compressed(path: &Path, kind: ObjectKind, payload: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut encoder = ZlibEncoder::new(file, Compression::default());
    encoder.write_all(&object::header(kind, payload.len()))?;
    encoder.write_all(payload)?;
    let file = encoder.finish()?;
    file.sync_all()
}
