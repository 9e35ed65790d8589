//! Core repository controller.
//!
//! This is the central component of the storage layer. It composes the
//! content store, staging area, commit graph, and branch table into the
//! user-facing operations, enforcing every business rule along the way.
//! Operations return typed results and never print; rendering is the
//! CLI's problem.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::storage::blob::BlobStore;
use crate::storage::commit::{Commit, CommitGraph, Snapshot};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::refs::BranchTable;
use crate::storage::stage::{StageOutcome, StagingArea};
use crate::storage::types::{BlobId, BranchName, CommitId};
use crate::storage::workdir::WorkDir;

/// the serializable part of a repository: everything the persistence
/// boundary round-trips between invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoState {
    pub graph: CommitGraph,
    pub branches: BranchTable,
    pub stage: StagingArea,
}

impl RepoState {
    /// fresh state: root commit, `master`, empty staging area
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// fresh state with a pinned root timestamp (tests)
    pub fn new_at(timestamp: DateTime<Utc>) -> Self {
        let graph = CommitGraph::new_at(timestamp);
        let root = graph.root().clone();
        Self {
            graph,
            branches: BranchTable::new(root),
            stage: StagingArea::new(),
        }
    }
}

impl Default for RepoState {
    fn default() -> Self {
        Self::new()
    }
}

/// how a merge ended
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// a merge commit was created
    Merged(CommitId),
    /// the current branch pointer moved forward; no commit created
    FastForwarded(CommitId),
    /// conflict markers written and staged; no commit created
    Conflicts(Vec<String>),
}

/// snapshot of the repository for status rendering
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub current_branch: String,
    pub branches: Vec<String>,
    pub staged: Vec<String>,
    pub removed: Vec<String>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Branches ===")?;
        for name in &self.branches {
            if *name == self.current_branch {
                writeln!(f, "*{}", name)?;
            } else {
                writeln!(f, "{}", name)?;
            }
        }
        writeln!(f, "\n=== Staged Files ===")?;
        for path in &self.staged {
            writeln!(f, "{}", path)?;
        }
        writeln!(f, "\n=== Removed Files ===")?;
        for path in &self.removed {
            writeln!(f, "{}", path)?;
        }
        // the last two sections are tracked but always rendered empty
        writeln!(f, "\n=== Modifications Not Staged For Commit ===")?;
        write!(f, "\n=== Untracked Files ===")
    }
}

/// the repository controller
///
/// owns the in-memory state plus handles on the content store and the
/// working directory. One instance per invocation; the workspace layer
/// constructs it from persisted state and saves it back afterwards.
pub struct Repository {
    state: RepoState,
    store: BlobStore,
    workdir: WorkDir,
}

impl Repository {
    /// brand-new repository (root commit only)
    pub fn new(workdir: WorkDir, store: BlobStore) -> Self {
        Self {
            state: RepoState::new(),
            store,
            workdir,
        }
    }

    /// rebuild a controller from persisted state
    pub fn from_state(state: RepoState, workdir: WorkDir, store: BlobStore) -> Self {
        Self {
            state,
            store,
            workdir,
        }
    }

    pub fn state(&self) -> &RepoState {
        &self.state
    }

    pub fn into_state(self) -> RepoState {
        self.state
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// the commit the current branch points at
    pub fn head_commit(&self) -> StorageResult<&Commit> {
        self.state.graph.lookup(self.state.branches.head())
    }

    pub fn current_branch(&self) -> &BranchName {
        self.state.branches.current()
    }

    // ==================== Staging Operations ====================

    /// stage a working file for the next commit
    ///
    /// re-adding supersedes any earlier removal mark for the path.
    pub fn add(&mut self, path: &str) -> StorageResult<StageOutcome> {
        if !self.workdir.exists(path) {
            return Err(StorageError::FileNotFound(path.to_string()));
        }
        let head = &self.state.graph.lookup(self.state.branches.head())?.snapshot;
        self.state.stage.clear_marks(path);
        self.state.stage.stage(&self.workdir, &self.store, path, head)
    }

    /// untrack a file: exclude it from the next commit
    ///
    /// deletes the working copy when head tracks the path; unstages a
    /// pending add either way.
    pub fn rm(&mut self, path: &str) -> StorageResult<()> {
        let tracked = self.head_commit()?.tracks(path);
        let staged = self.state.stage.is_staged(path);
        let clean = self.state.stage.is_clean(path);
        if !tracked && !staged && !clean {
            return Err(StorageError::NothingToRemove(path.to_string()));
        }
        if tracked {
            self.workdir.remove(path)?;
            self.state.stage.mark_removed(path);
        }
        if staged {
            self.state.stage.unstage(path);
        }
        Ok(())
    }

    // ==================== Commit ====================

    /// snapshot the staged changes as a new commit on the current branch
    pub fn commit(&mut self, message: &str) -> StorageResult<CommitId> {
        self.commit_at(message, Utc::now())
    }

    /// commit with a pinned timestamp (tests)
    pub fn commit_at(&mut self, message: &str, timestamp: DateTime<Utc>) -> StorageResult<CommitId> {
        if message.trim().is_empty() {
            return Err(StorageError::EmptyMessage);
        }
        if !self.state.stage.has_pending() {
            return Err(StorageError::NothingToCommit);
        }

        let parent = self.state.branches.head().clone();
        let snapshot = self.next_snapshot()?;
        let id = self
            .state
            .graph
            .create_commit(&parent, message, snapshot, timestamp)?;

        // the transaction boundary: branch retargeted, staging reset
        self.state.branches.retarget_current(id.clone());
        self.state.stage.clear();
        info!(commit = %id.short(), branch = %self.state.branches.current(), "committed");
        Ok(id)
    }

    /// the next commit's snapshot: parent's mapping layered with staged
    /// digests, minus every path marked untracked
    fn next_snapshot(&self) -> StorageResult<Snapshot> {
        let mut snapshot = self.head_commit()?.snapshot.clone();
        for (path, blob) in self.state.stage.staged_paths() {
            if !self.state.stage.is_untracked(path) {
                snapshot.insert(path.to_string(), blob.clone());
            }
        }
        for path in self.state.stage.untracked_paths() {
            snapshot.remove(path);
        }
        Ok(snapshot)
    }

    // ==================== Checkout ====================

    /// restore a path from the head commit into the working directory
    pub fn checkout_file(&mut self, path: &str) -> StorageResult<()> {
        let head = self.state.branches.head().clone();
        self.restore_file(&head, path)
    }

    /// restore a path from an explicit commit (id or unique prefix)
    pub fn checkout_file_at(&mut self, id_prefix: &str, path: &str) -> StorageResult<()> {
        let id = self.state.graph.resolve_short(id_prefix)?;
        self.restore_file(&id, path)
    }

    fn restore_file(&mut self, id: &CommitId, path: &str) -> StorageResult<()> {
        let commit = self.state.graph.lookup(id)?;
        let blob = commit
            .blob(path)
            .ok_or_else(|| StorageError::FileNotInCommit(path.to_string()))?;
        let bytes = self.store.get(blob)?;
        self.workdir.write(path, &bytes)
    }

    /// switch to another branch, rewriting the working directory
    pub fn checkout_branch(&mut self, name: &BranchName) -> StorageResult<()> {
        let target_id = match self.state.branches.get(name) {
            Some(id) => id.clone(),
            None => return Err(StorageError::NoSuchBranch(name.to_string())),
        };
        if name == self.state.branches.current() {
            return Err(StorageError::AlreadyOnBranch(name.to_string()));
        }
        let target = self.state.graph.lookup(&target_id)?.snapshot.clone();
        self.check_untracked_conflicts(&target)?;

        let current = self.head_commit()?.snapshot.clone();
        for (path, blob) in &target {
            let bytes = self.store.get(blob)?;
            self.workdir.write(path, &bytes)?;
        }
        for path in current.keys() {
            if !target.contains_key(path) {
                self.workdir.remove(path)?;
            }
        }

        self.state.stage.clear();
        self.state.branches.switch_to(name.clone())?;
        info!(branch = %name, "checked out");
        Ok(())
    }

    /// a working file the target would overwrite, accounted for by
    /// neither the current head nor the staging area
    fn check_untracked_conflicts(&self, target: &Snapshot) -> StorageResult<()> {
        let head = self.head_commit()?;
        for path in target.keys() {
            if self.workdir.exists(path)
                && !head.tracks(path)
                && !self.state.stage.is_staged(path)
            {
                return Err(StorageError::UntrackedFileConflict(path.clone()));
            }
        }
        Ok(())
    }

    // ==================== Branches ====================

    /// create a branch at the current head (no switch)
    pub fn branch(&mut self, name: BranchName) -> StorageResult<()> {
        let head = self.state.branches.head().clone();
        self.state.branches.create(name, head)
    }

    pub fn delete_branch(&mut self, name: &BranchName) -> StorageResult<()> {
        self.state.branches.delete(name)
    }

    // ==================== Reset ====================

    /// move the current branch to an arbitrary commit and restore its files
    ///
    /// accepts a short id. Does not delete working files the target no
    /// longer tracks; conflicts abort the same way checkout's do.
    pub fn reset(&mut self, id_prefix: &str) -> StorageResult<()> {
        let id = self.state.graph.resolve_short(id_prefix)?;
        let target = self.state.graph.lookup(&id)?.snapshot.clone();
        self.check_untracked_conflicts(&target)?;

        for (path, blob) in &target {
            let bytes = self.store.get(blob)?;
            self.workdir.write(path, &bytes)?;
        }
        self.state.branches.retarget_current(id.clone());
        self.state.stage.clear();
        info!(commit = %id.short(), "reset");
        Ok(())
    }

    // ==================== Merge ====================

    /// merge another branch into the current one
    ///
    /// three-way comparison against the split point; whole-file
    /// resolution. Conflicts are an outcome, not an error: markers are
    /// written and staged, and the caller commits manually.
    pub fn merge(&mut self, name: &BranchName) -> StorageResult<MergeOutcome> {
        if self.state.stage.has_uncommitted() {
            return Err(StorageError::UncommittedChanges);
        }
        let given_id = self.state.branches.resolve(name)?.clone();
        if name == self.state.branches.current() {
            return Err(StorageError::CannotMergeSelf);
        }
        let given = self.state.graph.lookup(&given_id)?.snapshot.clone();
        self.check_untracked_conflicts(&given)?;

        let current_id = self.state.branches.head().clone();
        if self.state.graph.is_ancestor(&given_id, &current_id)? {
            return Err(StorageError::GivenIsAncestor);
        }
        if self.state.graph.is_ancestor(&current_id, &given_id)? {
            self.state.branches.retarget_current(given_id.clone());
            info!(branch = %name, "fast-forwarded");
            return Ok(MergeOutcome::FastForwarded(given_id));
        }

        let split_id = self.state.graph.split_point(&current_id, &given_id)?;
        let split = self.state.graph.lookup(&split_id)?.snapshot.clone();
        let current = self.state.graph.lookup(&current_id)?.snapshot.clone();
        debug!(
            split = %split_id.short(),
            current = %current_id.short(),
            given = %given_id.short(),
            "merge baseline located"
        );

        let mut paths: BTreeSet<&String> = BTreeSet::new();
        paths.extend(split.keys());
        paths.extend(current.keys());
        paths.extend(given.keys());

        let mut conflicts = Vec::new();
        for path in paths {
            let at_split = split.get(path);
            let on_current = current.get(path);
            let on_given = given.get(path);

            if on_current == at_split {
                if on_given != at_split {
                    match on_given {
                        // modified (or added) only on the given side
                        Some(blob) => {
                            let bytes = self.store.get(blob)?;
                            self.workdir.write(path, &bytes)?;
                            self.state.stage.stage_digest(path, blob.clone());
                        }
                        // removed only on the given side
                        None => {
                            self.workdir.remove(path)?;
                            self.state.stage.mark_untracked(path);
                        }
                    }
                }
            } else if on_given == at_split || on_current == on_given {
                // modified only on our side, or both sides agree: keep ours
            } else {
                self.write_conflict(path, on_current, on_given)?;
                conflicts.push(path.clone());
            }
        }

        if !conflicts.is_empty() {
            debug!(count = conflicts.len(), "merge conflicts staged");
            return Ok(MergeOutcome::Conflicts(conflicts));
        }

        let message = format!(
            "Merged {} with {}.",
            self.state.branches.current(),
            name
        );
        let id = self.commit(&message)?;
        Ok(MergeOutcome::Merged(id))
    }

    /// write a conflict-marker file for `path` and stage it
    fn write_conflict(
        &mut self,
        path: &str,
        current: Option<&BlobId>,
        given: Option<&BlobId>,
    ) -> StorageResult<()> {
        let mut content = Vec::new();
        content.extend_from_slice(b"<<<<<<< HEAD\n");
        if let Some(blob) = current {
            content.extend_from_slice(&self.store.get(blob)?);
        }
        content.extend_from_slice(b"=======\n");
        if let Some(blob) = given {
            content.extend_from_slice(&self.store.get(blob)?);
        }
        content.extend_from_slice(b">>>>>>>\n");

        self.workdir.write(path, &content)?;
        let id = self.store.put(&content)?;
        self.state.stage.stage_digest(path, id);
        Ok(())
    }

    // ==================== History Queries ====================

    /// head-to-root history of the current branch
    pub fn log(&self) -> StorageResult<Vec<&Commit>> {
        self.state.graph.history(self.state.branches.head())
    }

    /// every commit ever made, in arbitrary order
    pub fn global_log(&self) -> Vec<&Commit> {
        self.state.graph.iter().collect()
    }

    /// ids of all commits whose message equals `message` exactly
    pub fn find(&self, message: &str) -> StorageResult<Vec<CommitId>> {
        let found = self.state.graph.find_by_message(message);
        if found.is_empty() {
            return Err(StorageError::NoCommitWithMessage(message.to_string()));
        }
        Ok(found)
    }

    /// branch, staging, and removal listing for status output
    pub fn status(&self) -> StatusReport {
        StatusReport {
            current_branch: self.state.branches.current().to_string(),
            branches: self
                .state
                .branches
                .names()
                .map(BranchName::to_string)
                .collect(),
            staged: self
                .state
                .stage
                .staged_paths()
                .map(|(p, _)| p.to_string())
                .collect(),
            removed: self.state.stage.removed_paths().map(str::to_string).collect(),
        }
    }
}
