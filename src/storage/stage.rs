//! Staging area: the pending-change buffer for the next commit.
//!
//! Four structures, all cleared at the commit boundary:
//! - `staged`: path → blob digest recorded by `add`
//! - `removed`: paths deleted from tracking, surfaced in status
//! - `untracked`: paths excluded from the next commit's snapshot
//! - `clean`: paths explicitly added whose content equals head's version
//!
//! A path marked clean still counts as "something to commit" (the user
//! asked for it), but contributes no snapshot change on its own.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::storage::blob::BlobStore;
use crate::storage::commit::Snapshot;
use crate::storage::error::StorageResult;
use crate::storage::types::BlobId;
use crate::storage::workdir::WorkDir;

/// what `stage` did with a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// blob persisted, digest recorded for the next commit
    Staged,
    /// content equals head's version; recorded clean, not staged
    Clean,
    /// digest already staged; nothing to do
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagingArea {
    staged: BTreeMap<String, BlobId>,
    removed: BTreeSet<String>,
    untracked: BTreeSet<String>,
    clean: BTreeSet<String>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// stage a working file against the head snapshot
    ///
    /// reads the file, computes its digest, and either records it staged
    /// (persisting the blob) or marks it clean when it matches head's
    /// version for that path. A digest equal to the currently staged one
    /// is a no-op. Fails with `FileNotFound` if the file is missing.
    pub fn stage(
        &mut self,
        workdir: &WorkDir,
        store: &BlobStore,
        path: &str,
        head: &Snapshot,
    ) -> StorageResult<StageOutcome> {
        let bytes = workdir.read(path)?;
        let digest = BlobId::for_bytes(&bytes);

        if head.get(path) == Some(&digest) {
            // re-adding the head version supersedes a stale staged digest
            self.staged.remove(path);
            self.clean.insert(path.to_string());
            return Ok(StageOutcome::Clean);
        }
        if self.staged.get(path) == Some(&digest) {
            return Ok(StageOutcome::Unchanged);
        }

        store.put(&bytes)?;
        self.clean.remove(path);
        self.staged.insert(path.to_string(), digest);
        Ok(StageOutcome::Staged)
    }

    /// record an already-computed digest, bypassing the clean check
    ///
    /// used by merge, which stages files it just wrote itself.
    pub fn stage_digest(&mut self, path: &str, digest: BlobId) {
        self.clean.remove(path);
        self.staged.insert(path.to_string(), digest);
    }

    /// drop any pending staged digest for a path
    pub fn unstage(&mut self, path: &str) -> bool {
        self.staged.remove(path).is_some()
    }

    /// mark a path for removal from tracking
    pub fn mark_removed(&mut self, path: &str) {
        self.removed.insert(path.to_string());
        self.untracked.insert(path.to_string());
    }

    /// mark a path excluded from the next commit without surfacing it
    /// in the removed section (merge uses this for target-side deletes)
    pub fn mark_untracked(&mut self, path: &str) {
        self.untracked.insert(path.to_string());
    }

    /// forget any removal/untracked/clean marks for a path
    pub fn clear_marks(&mut self, path: &str) {
        self.removed.remove(path);
        self.untracked.remove(path);
        self.clean.remove(path);
    }

    pub fn staged_blob(&self, path: &str) -> Option<&BlobId> {
        self.staged.get(path)
    }

    pub fn is_staged(&self, path: &str) -> bool {
        self.staged.contains_key(path)
    }

    pub fn is_clean(&self, path: &str) -> bool {
        self.clean.contains(path)
    }

    pub fn is_untracked(&self, path: &str) -> bool {
        self.untracked.contains(path)
    }

    /// staged paths in lexicographic order
    pub fn staged_paths(&self) -> impl Iterator<Item = (&str, &BlobId)> {
        self.staged.iter().map(|(p, b)| (p.as_str(), b))
    }

    /// removed paths in lexicographic order
    pub fn removed_paths(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().map(String::as_str)
    }

    pub fn untracked_paths(&self) -> impl Iterator<Item = &str> {
        self.untracked.iter().map(String::as_str)
    }

    /// anything at all queued for the next commit
    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty() || !self.clean.is_empty() || !self.untracked.is_empty()
    }

    /// staged or clean entries present (merge precondition)
    pub fn has_uncommitted(&self) -> bool {
        !self.staged.is_empty() || !self.clean.is_empty()
    }

    /// empty the staging map and every auxiliary set
    ///
    /// runs after every successful commit, checkout, and reset.
    pub fn clear(&mut self) {
        self.staged.clear();
        self.removed.clear();
        self.untracked.clear();
        self.clean.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, WorkDir, BlobStore) {
        let dir = TempDir::new().unwrap();
        let wd = WorkDir::new(dir.path());
        let store = BlobStore::open(dir.path().join(".gitlite/blobs")).unwrap();
        (dir, wd, store)
    }

    #[test]
    fn test_stage_new_file() {
        let (_dir, wd, store) = setup();
        let mut stage = StagingArea::new();
        wd.write("a.txt", b"x").unwrap();

        let outcome = stage.stage(&wd, &store, "a.txt", &Snapshot::new()).unwrap();

        assert_eq!(outcome, StageOutcome::Staged);
        assert!(stage.is_staged("a.txt"));
        assert!(store.contains(&BlobId::for_bytes(b"x")));
    }

    #[test]
    fn test_stage_missing_file() {
        let (_dir, wd, store) = setup();
        let mut stage = StagingArea::new();

        let result = stage.stage(&wd, &store, "missing.txt", &Snapshot::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_stage_head_identical_content_is_clean() {
        let (_dir, wd, store) = setup();
        let mut stage = StagingArea::new();
        wd.write("a.txt", b"x").unwrap();
        let head: Snapshot = [("a.txt".to_string(), BlobId::for_bytes(b"x"))].into();

        let outcome = stage.stage(&wd, &store, "a.txt", &head).unwrap();

        assert_eq!(outcome, StageOutcome::Clean);
        assert!(!stage.is_staged("a.txt"));
        assert!(stage.is_clean("a.txt"));
    }

    #[test]
    fn test_reverting_to_head_drops_stale_staged_digest() {
        let (_dir, wd, store) = setup();
        let mut stage = StagingArea::new();
        let head: Snapshot = [("a.txt".to_string(), BlobId::for_bytes(b"x"))].into();

        wd.write("a.txt", b"modified").unwrap();
        stage.stage(&wd, &store, "a.txt", &head).unwrap();
        assert!(stage.is_staged("a.txt"));

        wd.write("a.txt", b"x").unwrap();
        let outcome = stage.stage(&wd, &store, "a.txt", &head).unwrap();

        assert_eq!(outcome, StageOutcome::Clean);
        assert!(!stage.is_staged("a.txt"));
    }

    #[test]
    fn test_restaging_same_content_is_noop() {
        let (_dir, wd, store) = setup();
        let mut stage = StagingArea::new();
        wd.write("a.txt", b"x").unwrap();

        stage.stage(&wd, &store, "a.txt", &Snapshot::new()).unwrap();
        let outcome = stage.stage(&wd, &store, "a.txt", &Snapshot::new()).unwrap();

        assert_eq!(outcome, StageOutcome::Unchanged);
    }

    #[test]
    fn test_clear_empties_everything() {
        let (_dir, wd, store) = setup();
        let mut stage = StagingArea::new();
        wd.write("a.txt", b"x").unwrap();
        stage.stage(&wd, &store, "a.txt", &Snapshot::new()).unwrap();
        stage.mark_removed("b.txt");

        assert!(stage.has_pending());
        stage.clear();
        assert!(!stage.has_pending());
        assert_eq!(stage.removed_paths().count(), 0);
    }
}
