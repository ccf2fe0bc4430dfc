//! Repository handle
//!
//! Layout on disk:
//! ```text
//! {work_tree}/
//!   .dgit/
//!     HEAD                    — "ref: refs/heads/master\n", written once
//!     config.json             — RepositoryConfig
//!     index                   — binary staging index
//!     objects/{hash[0..2]}/{hash[2..]}  — zlib-compressed loose objects
//!     refs/heads/
//! ```
//!
//! Every operation goes through an explicit `Repository` value; nothing is
//! resolved from the process working directory.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::commit::{Commit, Signature};
use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use crate::history::HistoryWalker;
use crate::index::Index;
use crate::object::{self, ObjectId, ObjectKind};
use crate::store::ObjectStore;
use crate::tree::{self, TreeEntry, TreeMode};

/// Name of the metadata directory at the work tree root
pub const DGIT_DIR: &str = ".dgit";

/// Initial HEAD contents
pub const DEFAULT_HEAD: &str = "ref: refs/heads/master\n";

/// An opened repository
#[derive(Debug, Clone)]
pub struct Repository {
    work_tree: PathBuf,
    git_dir: PathBuf,
    store: ObjectStore,
    index: Index,
    config: RepositoryConfig,
}

impl Repository {
    /// Create the metadata layout under `work_tree` (idempotent) and open it
    pub fn init(work_tree: &Path) -> Result<Self> {
        let git_dir = work_tree.join(DGIT_DIR);
        for dir in [git_dir.join("objects"), git_dir.join("refs").join("heads")] {
            fs::create_dir_all(&dir).map_err(Error::io_at(&dir))?;
        }

        let head = git_dir.join("HEAD");
        if !head.exists() {
            fs::write(&head, DEFAULT_HEAD).map_err(Error::io_at(&head))?;
        }
        if !git_dir.join(crate::config::CONFIG_FILE).exists() {
            RepositoryConfig::default().save(&git_dir)?;
        }

        info!(path = %git_dir.display(), "initialized repository");
        Self::open(work_tree)
    }

    /// Open an existing repository rooted at `work_tree`
    pub fn open(work_tree: &Path) -> Result<Self> {
        let git_dir = work_tree.join(DGIT_DIR);
        if !git_dir.is_dir() {
            return Err(Error::Usage(format!(
                "not a dgit repository: {}",
                work_tree.display()
            )));
        }
        let work_tree = fs::canonicalize(work_tree).map_err(Error::io_at(work_tree))?;
        let git_dir = work_tree.join(DGIT_DIR);
        let config = RepositoryConfig::load(&git_dir)?;

        Ok(Self {
            store: ObjectStore::new(git_dir.join("objects")),
            index: Index::new(git_dir.join("index")),
            work_tree,
            git_dir,
            config,
        })
    }

    /// Open the nearest repository at or above `start`
    pub fn discover(start: &Path) -> Result<Self> {
        let start = fs::canonicalize(start).map_err(Error::io_at(start))?;
        start
            .ancestors()
            .find(|dir| dir.join(DGIT_DIR).is_dir())
            .ok_or_else(|| {
                Error::Usage(format!(
                    "not a dgit repository (or any parent): {}",
                    start.display()
                ))
            })
            .and_then(Self::open)
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.store
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Blob id of a file, stored only when `write` is set
    pub fn hash_file(&self, path: &Path, write: bool) -> Result<ObjectId> {
        if write {
            return self.store.put_file(path);
        }
        let content = fs::read(path).map_err(Error::io_at(path))?;
        Ok(object::hash_object(ObjectKind::Blob, &content))
    }

    /// Store a file as a blob and stage it under its work-tree-relative path.
    ///
    /// Relative `path`s are resolved against the work tree.
    pub fn add(&self, path: &Path) -> Result<IndexedPath> {
        let full = self.work_tree.join(path);
        let full = fs::canonicalize(&full).map_err(Error::io_at(&full))?;
        if !full.is_file() {
            return Err(Error::Usage(format!("not a regular file: {}", full.display())));
        }
        let rel = self.relative_path(&full)?;

        let id = self.store.put_file(&full)?;
        self.index.stage(&rel, id, TreeMode::Regular.as_u32())?;
        Ok(IndexedPath { path: rel, id })
    }

    /// Snapshot the whole work tree and return the root tree id
    pub fn write_tree(&self) -> Result<ObjectId> {
        tree::write_tree(&self.store, &self.work_tree, &self.config.ignore)
    }

    /// Decoded entries of a tree object
    pub fn read_tree(&self, id: &ObjectId) -> Result<Vec<TreeEntry>> {
        tree::read_tree(&self.store, id)
    }

    /// Signature from config, stamped now
    pub fn signature(&self) -> Signature {
        Signature::now(
            &self.config.user.name,
            &self.config.user.email,
            &self.config.timezone,
        )
    }

    /// Commit a tree using the configured identity for both author and committer
    pub fn commit_tree(
        &self,
        tree: ObjectId,
        parent: Option<ObjectId>,
        message: &str,
    ) -> Result<ObjectId> {
        let sig = self.signature();
        self.commit_tree_with(tree, parent, message, sig.clone(), sig)
    }

    /// Commit a tree with explicit signatures
    pub fn commit_tree_with(
        &self,
        tree: ObjectId,
        parent: Option<ObjectId>,
        message: &str,
        author: Signature,
        committer: Signature,
    ) -> Result<ObjectId> {
        if message.trim().is_empty() {
            return Err(Error::Usage("commit message is required".to_string()));
        }
        author.validate()?;
        committer.validate()?;
        self.expect_kind(&tree, ObjectKind::Tree)?;
        if let Some(parent) = &parent {
            self.expect_kind(parent, ObjectKind::Commit)?;
        }

        let commit = Commit::new(tree, parent, author, committer, message);
        self.store.put(ObjectKind::Commit, &commit.encode())
    }

    /// Read and decode a single commit
    pub fn read_commit(&self, id: &ObjectId) -> Result<Commit> {
        let payload = self.store.get_kind(id, ObjectKind::Commit)?;
        Commit::decode(&payload)
    }

    /// Walk history from `start` to the root commit
    pub fn log(&self, start: ObjectId) -> HistoryWalker<'_> {
        HistoryWalker::new(&self.store, start)
    }

    fn expect_kind(&self, id: &ObjectId, expected: ObjectKind) -> Result<()> {
        let (actual, _) = self.store.read_header(id)?;
        if actual != expected {
            return Err(Error::UnexpectedKind {
                id: *id,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn relative_path(&self, full: &Path) -> Result<String> {
        let rel = full.strip_prefix(&self.work_tree).map_err(|_| {
            Error::Usage(format!("{} is outside the repository", full.display()))
        })?;

        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(seg) => {
                    let seg = seg.to_str().ok_or_else(|| {
                        Error::Usage(format!("path is not UTF-8: {}", rel.display()))
                    })?;
                    let reserved = seg == DGIT_DIR
                        || self.config.ignore.iter().any(|name| name == seg);
                    if reserved {
                        return Err(Error::Usage(format!(
                            "refusing to stage reserved path: {}",
                            rel.display()
                        )));
                    }
                    segments.push(seg);
                }
                _ => {
                    return Err(Error::Usage(format!("unexpected path: {}", rel.display())));
                }
            }
        }
        Ok(segments.join("/"))
    }
}

/// Result of staging a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPath {
    /// Work-tree-relative path with `/` separators
    pub path: String,
    pub id: ObjectId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_layout() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();

        let git_dir = repo.git_dir();
        assert!(git_dir.join("objects").is_dir());
        assert!(git_dir.join("refs/heads").is_dir());
        assert_eq!(fs::read_to_string(git_dir.join("HEAD")).unwrap(), DEFAULT_HEAD);
        assert!(git_dir.join("config.json").is_file());
    }

    #[test]
    fn test_init_keeps_existing_head() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let head = repo.git_dir().join("HEAD");
        fs::write(&head, "ref: refs/heads/main\n").unwrap();

        Repository::init(temp_dir.path()).unwrap();
        assert_eq!(fs::read_to_string(&head).unwrap(), "ref: refs/heads/main\n");
    }

    #[test]
    fn test_open_uninitialized() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            Repository::open(temp_dir.path()),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let nested = temp_dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = Repository::discover(&nested).unwrap();
        assert_eq!(found.work_tree(), repo.work_tree());
    }

    #[test]
    fn test_add_stages_relative_path() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src/lib.rs"), b"pub fn f() {}").unwrap();

        let staged = repo.add(Path::new("src/lib.rs")).unwrap();
        assert_eq!(staged.path, "src/lib.rs");
        assert!(repo.objects().exists(&staged.id));

        let entries = repo.index().load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mode, 0o100644);
        assert_eq!(entries[0].hash, staged.id);
    }

    #[test]
    fn test_add_absolute_path() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let file = repo.work_tree().join("notes.txt");
        fs::write(&file, b"n").unwrap();

        assert_eq!(repo.add(&file).unwrap().path, "notes.txt");
    }

    #[test]
    fn test_add_rejects_directory_and_outside() {
        let temp_dir = TempDir::new().unwrap();
        let work = temp_dir.path().join("work");
        fs::create_dir_all(work.join("dir")).unwrap();
        fs::write(temp_dir.path().join("outside.txt"), b"o").unwrap();
        let repo = Repository::init(&work).unwrap();

        assert!(matches!(repo.add(Path::new("dir")), Err(Error::Usage(_))));
        assert!(matches!(
            repo.add(Path::new("../outside.txt")),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_add_rejects_metadata_dir() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        assert!(matches!(
            repo.add(Path::new(".dgit/HEAD")),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_hash_file_without_write() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let file = temp_dir.path().join("hello.txt");
        fs::write(&file, b"hello").unwrap();

        let id = repo.hash_file(&file, false).unwrap();
        assert_eq!(id.to_hex(), "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
        assert!(!repo.objects().exists(&id));

        repo.hash_file(&file, true).unwrap();
        assert!(repo.objects().exists(&id));
    }

    #[test]
    fn test_commit_tree_requires_message() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let tree = repo.write_tree().unwrap();
        assert!(matches!(
            repo.commit_tree(tree, None, "  "),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_commit_tree_checks_kinds() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let blob = repo.objects().put(ObjectKind::Blob, b"x").unwrap();
        let tree = repo.write_tree().unwrap();

        assert!(matches!(
            repo.commit_tree(blob, None, "msg"),
            Err(Error::UnexpectedKind { .. })
        ));
        assert!(matches!(
            repo.commit_tree(tree, Some(tree), "msg"),
            Err(Error::UnexpectedKind { .. })
        ));
        let missing = object::hash_object(ObjectKind::Commit, b"nope");
        assert!(matches!(
            repo.commit_tree(tree, Some(missing), "msg"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_commit_uses_config_identity() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path()).unwrap();
        let mut config = RepositoryConfig::default();
        config.user.name = "Ada".to_string();
        config.user.email = "ada@example.com".to_string();
        config.timezone = "+0900".to_string();
        config.save(&temp_dir.path().join(DGIT_DIR)).unwrap();

        let repo = Repository::open(temp_dir.path()).unwrap();
        let tree = repo.write_tree().unwrap();
        let id = repo.commit_tree(tree, None, "configured").unwrap();

        let commit = repo.read_commit(&id).unwrap();
        let author = commit.author.unwrap();
        assert_eq!(author.name, "Ada");
        assert_eq!(author.offset, "+0900");
        assert_eq!(commit.committer.unwrap().email, "ada@example.com");
    }

    #[test]
    fn test_commit_rejects_unencodable_signature() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let tree = repo.write_tree().unwrap();

        let bad_zone = Signature::new("Ada", "ada@example.com", 1, "KST");
        assert!(matches!(
            repo.commit_tree_with(tree, None, "initial", bad_zone.clone(), bad_zone),
            Err(Error::Usage(_))
        ));

        let injected = Signature::new("Ada\nparent 0000", "ada@example.com", 1, "+0000");
        let ok = Signature::new("Ada", "ada@example.com", 1, "+0000");
        assert!(matches!(
            repo.commit_tree_with(tree, None, "initial", ok, injected),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_open_rejects_bad_timezone() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path()).unwrap();
        let mut config = RepositoryConfig::default();
        config.timezone = "KST".to_string();
        config.save(&temp_dir.path().join(DGIT_DIR)).unwrap();

        assert!(matches!(
            Repository::open(temp_dir.path()),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_metadata_dir_reserved_with_empty_ignore() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path()).unwrap();
        let mut config = RepositoryConfig::default();
        config.ignore = vec![];
        config.save(&temp_dir.path().join(DGIT_DIR)).unwrap();
        fs::write(temp_dir.path().join("a"), b"a").unwrap();

        let repo = Repository::open(temp_dir.path()).unwrap();
        let tree = repo.write_tree().unwrap();
        let names: Vec<String> = repo
            .read_tree(&tree)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["a"]);

        assert!(matches!(
            repo.add(Path::new(".dgit/HEAD")),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_write_tree_skips_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();

        let tree = repo.write_tree().unwrap();
        let entries = repo.read_tree(&tree).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
    }
}
