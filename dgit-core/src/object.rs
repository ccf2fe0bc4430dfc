//! Core object model for dgit
//!
//! Every stored object is framed as `"<kind> <len>\0" + payload` and addressed
//! by the SHA-1 digest of that framing, exactly like a Git loose object.

use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Size of a raw object digest in bytes
pub const ID_LEN: usize = 20;

/// Length of a hex-rendered object digest
pub const HEX_LEN: usize = ID_LEN * 2;

/// Unique identifier for any stored object
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_LEN]);

impl ObjectId {
    /// Create a new ObjectId from raw bytes
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an ObjectId from a slice that must be exactly 20 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; ID_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Convert to lowercase hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 40-character hexadecimal string (either case)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HEX_LEN {
            return Err(Error::InvalidObjectId(hex_str.to_string()));
        }
        let mut arr = [0u8; ID_LEN];
        hex::decode_to_slice(hex_str, &mut arr)
            .map_err(|_| Error::InvalidObjectId(hex_str.to_string()))?;
        Ok(Self(arr))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Object type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    /// The ASCII literal used in object headers
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            other => Err(format!("unknown object kind {:?}", other)),
        }
    }
}

/// Build the `"<kind> <len>\0"` header for a payload
pub fn header(kind: ObjectKind, len: usize) -> Vec<u8> {
    format!("{} {}\0", kind, len).into_bytes()
}

/// Frame a payload with its header, producing the bytes that are hashed and stored
pub fn frame(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut buf = header(kind, payload.len());
    buf.reserve(payload.len());
    buf.extend_from_slice(payload);
    buf
}

/// Compute the object id of `(kind, payload)` without touching the store
pub fn hash_object(kind: ObjectKind, payload: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(header(kind, payload.len()));
    hasher.update(payload);
    ObjectId(hasher.finalize().into())
}

/// Split a decompressed object into its kind and payload.
///
/// The declared length is checked against the actual payload length.
pub fn unframe(id: ObjectId, raw: &[u8]) -> Result<(ObjectKind, &[u8])> {
    let corrupt = |reason: String| Error::CorruptObject { id, reason };

    let nul = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt("missing header separator".to_string()))?;
    let (kind, declared) = parse_header(&raw[..nul]).map_err(corrupt)?;
    let payload = &raw[nul + 1..];

    if declared != payload.len() {
        return Err(corrupt(format!(
            "header declares {} bytes, payload has {}",
            declared,
            payload.len()
        )));
    }
    Ok((kind, payload))
}

/// Parse a `"<kind> <len>"` header (without the NUL)
pub(crate) fn parse_header(header: &[u8]) -> std::result::Result<(ObjectKind, usize), String> {
    let text = std::str::from_utf8(header).map_err(|_| "header is not UTF-8".to_string())?;
    let (kind, len) = text
        .split_once(' ')
        .ok_or_else(|| format!("malformed header {:?}", text))?;
    let kind = kind.parse::<ObjectKind>()?;
    let len = len
        .parse::<usize>()
        .map_err(|_| format!("bad length in header {:?}", text))?;
    Ok((kind, len))
}
