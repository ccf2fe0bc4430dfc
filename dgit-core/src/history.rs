//! Linear history traversal along parent links

use tracing::trace;

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::object::{ObjectId, ObjectKind};
use crate::store::ObjectStore;

/// Walks from a starting commit to the root, one parent link at a time.
///
/// Yields `(id, commit)` pairs, newest first. The first failure is yielded
/// wrapped in [`Error::History`] with the offending id, after which the walk
/// ends. Parent cycles are not detected.
pub struct HistoryWalker<'a> {
    store: &'a ObjectStore,
    cursor: Option<ObjectId>,
}

impl<'a> HistoryWalker<'a> {
    pub fn new(store: &'a ObjectStore, start: ObjectId) -> Self {
        Self {
            store,
            cursor: Some(start),
        }
    }

    fn step(&self, id: &ObjectId) -> Result<Commit> {
        let payload = self.store.get_kind(id, ObjectKind::Commit)?;
        Commit::decode(&payload)
    }
}

impl Iterator for HistoryWalker<'_> {
    type Item = Result<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor.take()?;
        match self.step(&id) {
            Ok(commit) => {
                trace!(%id, parent = ?commit.parent, "history step");
                self.cursor = commit.parent;
                Some(Ok((id, commit)))
            }
            Err(e) => Some(Err(Error::History {
                id,
                source: Box::new(e),
            })),
        }
    }
}

impl std::iter::FusedIterator for HistoryWalker<'_> {}
