//! Commit objects
//!
//! Line-oriented text payload:
//!
//! ```text
//! tree <40-hex>
//! parent <40-hex>            (absent on a root commit)
//! author <name> <<email>> <epoch-seconds> <+/-HHMM>
//! committer <same format>
//!
//! <message>
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::object::ObjectId;

/// Identity plus timestamp for an author or committer line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Unix seconds
    pub timestamp: i64,
    /// UTC offset label, e.g. `+0000`
    pub offset: String,
}

impl Signature {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp: i64,
        offset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
            offset: offset.into(),
        }
    }

    /// Check that the signature renders as a single parseable line
    pub fn validate(&self) -> Result<()> {
        check_identity(&self.name, &self.email)?;
        check_offset(&self.offset)
    }

    /// Signature stamped with the current wall-clock time
    pub fn now(name: impl Into<String>, email: impl Into<String>, offset: impl Into<String>) -> Self {
        Self::new(name, email, chrono::Utc::now().timestamp(), offset)
    }

    /// Parse `"<name> <<email>> <timestamp> <offset>"`
    pub fn parse(line: &str) -> Result<Self> {
        let malformed = || Error::MalformedCommit(format!("bad signature {:?}", line));

        let mut parts = line.rsplitn(3, ' ');
        let offset = parts.next().ok_or_else(malformed)?;
        let timestamp = parts.next().ok_or_else(malformed)?;
        let ident = parts.next().ok_or_else(malformed)?;

        if !is_offset(offset) {
            return Err(malformed());
        }
        let timestamp = timestamp.parse::<i64>().map_err(|_| malformed())?;

        let ident = ident.strip_suffix('>').ok_or_else(malformed)?;
        let (name, email) = ident.rsplit_once('<').ok_or_else(malformed)?;

        let name = name.strip_suffix(' ').unwrap_or(name);
        Ok(Self::new(name, email, timestamp, offset))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} {}", self.name, self.email, self.timestamp, self.offset)
    }
}

/// Reject names or emails that would break the signature line
pub(crate) fn check_identity(name: &str, email: &str) -> Result<()> {
    for (field, value) in [("name", name), ("email", email)] {
        if value.contains(['\n', '<', '>']) {
            return Err(Error::Usage(format!(
                "{} {:?} must not contain newlines or angle brackets",
                field, value
            )));
        }
    }
    Ok(())
}

/// Reject offsets that are not `+HHMM` / `-HHMM`
pub(crate) fn check_offset(offset: &str) -> Result<()> {
    if is_offset(offset) {
        Ok(())
    } else {
        Err(Error::Usage(format!(
            "timezone offset {:?} must look like +HHMM or -HHMM",
            offset
        )))
    }
}

fn is_offset(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 5
        && matches!(bytes[0], b'+' | b'-')
        && bytes[1..].iter().all(u8::is_ascii_digit)
}

/// Commit/Revision object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Tree object ID for this snapshot
    pub tree: ObjectId,
    /// Parent commit (None for a root commit)
    pub parent: Option<ObjectId>,
    /// Absent only on commits written by tools that omit the line
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
    pub message: String,
}

impl Commit {
    /// Create a new commit
    pub fn new(
        tree: ObjectId,
        parent: Option<ObjectId>,
        author: Signature,
        committer: Signature,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parent,
            author: Some(author),
            committer: Some(committer),
            message: message.into(),
        }
    }

    /// Check if this is a root commit (no parent)
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Render the commit payload
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("tree {}\n", self.tree);
        if let Some(parent) = &self.parent {
            out.push_str(&format!("parent {}\n", parent));
        }
        if let Some(author) = &self.author {
            out.push_str(&format!("author {}\n", author));
        }
        if let Some(committer) = &self.committer {
            out.push_str(&format!("committer {}\n", committer));
        }
        out.push('\n');
        out.push_str(&self.message);
        out.push('\n');
        out.into_bytes()
    }

    /// Parse a commit payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| Error::MalformedCommit("payload is not UTF-8".to_string()))?;

        let (head, body) = text.split_once("\n\n").unwrap_or((text, ""));
        let message = body.strip_suffix('\n').unwrap_or(body);

        let mut tree = None;
        let mut parent = None;
        let mut author = None;
        let mut committer = None;

        for line in head.lines() {
            if let Some(hex) = line.strip_prefix("tree ") {
                tree = Some(ObjectId::from_hex(hex).map_err(|_| {
                    Error::MalformedCommit(format!("bad tree id {:?}", hex))
                })?);
            } else if let Some(hex) = line.strip_prefix("parent ") {
                if parent.is_some() {
                    return Err(Error::MalformedCommit("more than one parent".to_string()));
                }
                parent = Some(ObjectId::from_hex(hex).map_err(|_| {
                    Error::MalformedCommit(format!("bad parent id {:?}", hex))
                })?);
            } else if let Some(sig) = line.strip_prefix("author ") {
                author = Some(Signature::parse(sig)?);
            } else if let Some(sig) = line.strip_prefix("committer ") {
                committer = Some(Signature::parse(sig)?);
            }
        }

        let tree = tree.ok_or_else(|| Error::MalformedCommit("missing tree line".to_string()))?;

        Ok(Self {
            tree,
            parent,
            author,
            committer,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{hash_object, ObjectKind, ID_LEN};
    use proptest::prelude::*;

    fn sig() -> Signature {
        Signature::new("dgit User", "user@example.com", 1_700_000_000, "+0000")
    }

    fn tree_id() -> ObjectId {
        hash_object(ObjectKind::Tree, b"")
    }

    #[test]
    fn test_encode_root_commit() {
        let commit = Commit::new(tree_id(), None, sig(), sig(), "initial");
        let text = String::from_utf8(commit.encode()).unwrap();
        assert_eq!(
            text,
            "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
             author dgit User <user@example.com> 1700000000 +0000\n\
             committer dgit User <user@example.com> 1700000000 +0000\n\
             \n\
             initial\n"
        );
    }

    #[test]
    fn test_roundtrip_with_parent() {
        let parent = hash_object(ObjectKind::Commit, b"parent");
        let commit = Commit::new(tree_id(), Some(parent), sig(), sig(), "second\n\nwith body");
        let decoded = Commit::decode(&commit.encode()).unwrap();
        assert_eq!(decoded, commit);
        assert!(!decoded.is_root());
    }

    #[test]
    fn test_root_commit_has_no_parent() {
        let commit = Commit::new(tree_id(), None, sig(), sig(), "root");
        let decoded = Commit::decode(&commit.encode()).unwrap();
        assert!(decoded.parent.is_none());
        assert!(decoded.is_root());
    }

    #[test]
    fn test_decode_missing_tree() {
        let payload = b"author a <b> 1 +0000\ncommitter a <b> 1 +0000\n\nmsg\n";
        assert!(matches!(
            Commit::decode(payload),
            Err(Error::MalformedCommit(_))
        ));
    }

    #[test]
    fn test_decode_without_message() {
        let payload = format!(
            "tree {}\nauthor a <b> 1 +0000\ncommitter a <b> 1 +0000\n",
            tree_id()
        );
        let decoded = Commit::decode(payload.as_bytes()).unwrap();
        assert_eq!(decoded.message, "");
    }

    #[test]
    fn test_decode_ignores_unknown_headers() {
        let payload = format!(
            "tree {}\nencoding UTF-8\nauthor a <b> 1 +0000\ncommitter a <b> 1 +0000\n\nmsg\n",
            tree_id()
        );
        assert_eq!(Commit::decode(payload.as_bytes()).unwrap().message, "msg");
    }

    #[test]
    fn test_decode_rejects_bad_signature() {
        let payload = format!(
            "tree {}\nauthor nobody\ncommitter a <b> 1 +0000\n\nmsg\n",
            tree_id()
        );
        assert!(matches!(
            Commit::decode(payload.as_bytes()),
            Err(Error::MalformedCommit(_))
        ));
    }

    #[test]
    fn test_signature_parse() {
        let parsed = Signature::parse("Jane Q. Doe <jane@example.com> 1234567890 -0530").unwrap();
        assert_eq!(parsed.name, "Jane Q. Doe");
        assert_eq!(parsed.email, "jane@example.com");
        assert_eq!(parsed.timestamp, 1_234_567_890);
        assert_eq!(parsed.offset, "-0530");
        assert_eq!(
            parsed.to_string(),
            "Jane Q. Doe <jane@example.com> 1234567890 -0530"
        );
    }

    #[test]
    fn test_signature_rejects_bad_offset() {
        assert!(Signature::parse("a <b> 1 KST").is_err());
        assert!(Signature::parse("a <b> 1 +00").is_err());
    }

    #[test]
    fn test_signature_now_is_recent() {
        let now = Signature::now("a", "b", "+0000");
        assert!(now.timestamp > 1_600_000_000);
    }

    #[test]
    fn test_decode_without_signatures() {
        let payload = format!("tree {}\n\nimported\n", tree_id());
        let decoded = Commit::decode(payload.as_bytes()).unwrap();
        assert!(decoded.author.is_none());
        assert!(decoded.committer.is_none());
        assert_eq!(decoded.message, "imported");
        assert_eq!(decoded.encode(), payload.into_bytes());
    }

    #[test]
    fn test_signature_keeps_trailing_space_in_name() {
        let sig = Signature::new("a ", "b", 1, "+0000");
        assert_eq!(Signature::parse(&sig.to_string()).unwrap(), sig);

        let bare = Signature::parse("<b> 1 +0000").unwrap();
        assert_eq!(bare.name, "");
    }

    #[test]
    fn test_validate_rejects_unencodable_fields() {
        assert!(sig().validate().is_ok());
        for bad in [
            Signature::new("a", "b", 1, "KST"),
            Signature::new("Ada\nparent 0000", "b", 1, "+0000"),
            Signature::new("a", "<b>", 1, "+0000"),
            Signature::new("a>", "b", 1, "+0000"),
        ] {
            assert!(matches!(bad.validate(), Err(Error::Usage(_))), "{:?}", bad);
        }
    }

    fn arb_signature() -> impl Strategy<Value = Signature> {
        (
            "[^\n<>]{0,12}",
            "[^\n<>]{0,12}",
            any::<i64>(),
            "[+-][0-9]{4}",
        )
            .prop_map(|(name, email, ts, offset)| Signature::new(name, email, ts, offset))
    }

    fn arb_commit() -> impl Strategy<Value = Commit> {
        (
            any::<[u8; ID_LEN]>(),
            proptest::option::of(any::<[u8; ID_LEN]>()),
            arb_signature(),
            arb_signature(),
            any::<String>(),
        )
            .prop_map(|(tree, parent, author, committer, message)| {
                Commit::new(
                    ObjectId::new(tree),
                    parent.map(ObjectId::new),
                    author,
                    committer,
                    message,
                )
            })
    }

    proptest! {
        #[test]
        fn prop_commit_roundtrip(commit in arb_commit()) {
            prop_assert!(commit.author.as_ref().unwrap().validate().is_ok());
            prop_assert_eq!(Commit::decode(&commit.encode()).unwrap(), commit);
        }
    }
}
