//! Commit creation and history traversal
//!
//! commits are the atomic units of history here. Each one carries the
//! full path → blob mapping for its tree (a snapshot, not a diff), a
//! message, a timestamp, and a parent link. The graph stores commits in
//! an id-keyed arena with a separate append-only children index, so
//! nodes never reference each other directly and the DAG is a DAG of
//! ids, not of owning references.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BlobId, CommitId};

/// full path → blob mapping tracked by a commit
///
/// ordered so the id derivation below is deterministic.
pub type Snapshot = BTreeMap<String, BlobId>;

/// the message every root commit carries
pub const INITIAL_COMMIT_MESSAGE: &str = "initial commit";

/// an immutable node in the history DAG
///
/// no field changes after creation; the children list lives in the
/// graph's index, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitId,
    pub parent: Option<CommitId>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot: Snapshot,
}

impl Commit {
    fn new(
        parent: Option<CommitId>,
        message: String,
        snapshot: Snapshot,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let id = derive_id(&message, timestamp, &snapshot, parent.as_ref());
        Self {
            id,
            parent,
            message,
            timestamp,
            snapshot,
        }
    }

    /// check if this commit tracks the given path
    pub fn tracks(&self, path: &str) -> bool {
        self.snapshot.contains_key(path)
    }

    /// get the blob tracked at the given path
    pub fn blob(&self, path: &str) -> Option<&BlobId> {
        self.snapshot.get(path)
    }

    /// check if this is the root of its graph
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// a commit's id is a pure function of its immutable fields
///
/// the snapshot iterates in path order, so two commits with the same
/// message, timestamp, mapping, and parent always hash identically.
fn derive_id(
    message: &str,
    timestamp: DateTime<Utc>,
    snapshot: &Snapshot,
    parent: Option<&CommitId>,
) -> CommitId {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(b"\n");
    hasher.update(timestamp.to_rfc3339().as_bytes());
    hasher.update(b"\n");
    for (path, blob) in snapshot {
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(blob.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(parent.map(CommitId::as_str).unwrap_or("").as_bytes());
    CommitId::new(hex::encode(hasher.finalize()))
}

/// the append-only commit DAG
///
/// an arena of commits keyed by id plus an id → children index. Commits
/// are never removed and never change after insertion; the index only
/// ever gains entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitGraph {
    commits: HashMap<CommitId, Commit>,
    children: HashMap<CommitId, Vec<CommitId>>,
    root: CommitId,
}

impl CommitGraph {
    /// create a graph holding only the root commit
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// create a graph whose root commit carries the given timestamp
    pub fn new_at(timestamp: DateTime<Utc>) -> Self {
        let root = Commit::new(
            None,
            INITIAL_COMMIT_MESSAGE.to_string(),
            Snapshot::new(),
            timestamp,
        );
        let root_id = root.id.clone();
        let mut commits = HashMap::new();
        commits.insert(root_id.clone(), root);
        Self {
            commits,
            children: HashMap::new(),
            root: root_id,
        }
    }

    /// the root commit's id
    pub fn root(&self) -> &CommitId {
        &self.root
    }

    /// number of commits in the graph
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// append a new commit under `parent`
    ///
    /// fails with `EmptyMessage` on a blank message and with `NoChanges`
    /// when the snapshot equals the parent's. The caller supplies the
    /// timestamp so tests can pin it.
    pub fn create_commit(
        &mut self,
        parent: &CommitId,
        message: impl Into<String>,
        snapshot: Snapshot,
        timestamp: DateTime<Utc>,
    ) -> StorageResult<CommitId> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(StorageError::EmptyMessage);
        }
        let parent_commit = self.lookup(parent)?;
        if parent_commit.snapshot == snapshot {
            return Err(StorageError::NoChanges);
        }

        let commit = Commit::new(Some(parent.clone()), message, snapshot, timestamp);
        let id = commit.id.clone();
        debug!(commit = %id.short(), parent = %parent.short(), "commit created");

        self.commits.insert(id.clone(), commit);
        self.children
            .entry(parent.clone())
            .or_default()
            .push(id.clone());
        Ok(id)
    }

    /// look up a commit by its full id
    pub fn lookup(&self, id: &CommitId) -> StorageResult<&Commit> {
        self.commits
            .get(id)
            .ok_or_else(|| StorageError::AmbiguousOrUnknownId(id.to_string()))
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.commits.contains_key(id)
    }

    /// the ids appended under a commit, in creation order
    pub fn children(&self, id: &CommitId) -> &[CommitId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// resolve a possibly-short id to the unique commit it prefixes
    ///
    /// zero matches and multiple matches both fail: a prefix that does
    /// not pin down one commit is unusable either way.
    pub fn resolve_short(&self, prefix: &str) -> StorageResult<CommitId> {
        let mut matched: Option<&CommitId> = None;
        for id in self.commits.keys() {
            if id.matches_prefix(prefix) {
                if matched.is_some() {
                    return Err(StorageError::AmbiguousOrUnknownId(prefix.to_string()));
                }
                matched = Some(id);
            }
        }
        matched
            .cloned()
            .ok_or_else(|| StorageError::AmbiguousOrUnknownId(prefix.to_string()))
    }

    /// walk parent links from `from` down to the root, inclusive
    pub fn history(&self, from: &CommitId) -> StorageResult<Vec<&Commit>> {
        let mut entries = Vec::new();
        let mut cursor = Some(from.clone());
        while let Some(id) = cursor {
            let commit = self.commits.get(&id).ok_or_else(|| {
                StorageError::Internal(format!("dangling parent link to {}", id.short()))
            })?;
            cursor = commit.parent.clone();
            entries.push(commit);
        }
        Ok(entries)
    }

    /// iterate every commit in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &Commit> {
        self.commits.values()
    }

    /// ids of all commits whose message equals `message` exactly
    pub fn find_by_message(&self, message: &str) -> Vec<CommitId> {
        self.commits
            .values()
            .filter(|c| c.message == message)
            .map(|c| c.id.clone())
            .collect()
    }

    /// check whether `candidate` appears on `head`'s parent chain
    /// (a commit counts as its own ancestor here)
    pub fn is_ancestor(&self, candidate: &CommitId, head: &CommitId) -> StorageResult<bool> {
        let mut cursor = Some(head.clone());
        while let Some(id) = cursor {
            if id == *candidate {
                return Ok(true);
            }
            cursor = self.lookup(&id)?.parent.clone();
        }
        Ok(false)
    }

    /// the ancestor-id chain of a head, excluding the head itself
    fn ancestor_chain(&self, head: &CommitId) -> StorageResult<Vec<CommitId>> {
        let mut chain = Vec::new();
        let mut cursor = self.lookup(head)?.parent.clone();
        while let Some(id) = cursor {
            cursor = self.lookup(&id)?.parent.clone();
            chain.push(id);
        }
        Ok(chain)
    }

    /// nearest common ancestor of two heads, used as the merge baseline
    ///
    /// collects both full ancestor chains and scans the shorter one, in
    /// order, against membership in the longer. With single-parent
    /// histories (all this graph can produce) this is exact; on imported
    /// multi-parent graphs it is a linear approximation of the true LCA.
    pub fn split_point(&self, a: &CommitId, b: &CommitId) -> StorageResult<CommitId> {
        let chain_a = self.ancestor_chain(a)?;
        let chain_b = self.ancestor_chain(b)?;

        let (shorter, longer) = if chain_a.len() <= chain_b.len() {
            (&chain_a, &chain_b)
        } else {
            (&chain_b, &chain_a)
        };
        let membership: HashSet<&CommitId> = longer.iter().collect();
        for id in shorter {
            if membership.contains(id) {
                return Ok(id.clone());
            }
        }
        Err(StorageError::Internal(format!(
            "no common ancestor between {} and {}",
            a.short(),
            b.short()
        )))
    }
}

impl Default for CommitGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, secs).unwrap()
    }

    fn snapshot(entries: &[(&str, &[u8])]) -> Snapshot {
        entries
            .iter()
            .map(|(path, bytes)| (path.to_string(), BlobId::for_bytes(bytes)))
            .collect()
    }

    #[test]
    fn test_root_commit() {
        let graph = CommitGraph::new_at(ts(0));
        let root = graph.lookup(graph.root()).unwrap();

        assert!(root.is_root());
        assert!(root.snapshot.is_empty());
        assert_eq!(root.message, INITIAL_COMMIT_MESSAGE);
    }

    #[test]
    fn test_commit_ids_are_deterministic() {
        let snap = snapshot(&[("a.txt", b"x")]);
        let a = derive_id("m", ts(1), &snap, None);
        let b = derive_id("m", ts(1), &snap, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_commit_ids_differ_per_field() {
        let snap = snapshot(&[("a.txt", b"x")]);
        let base = derive_id("m", ts(1), &snap, None);

        assert_ne!(base, derive_id("other", ts(1), &snap, None));
        assert_ne!(base, derive_id("m", ts(2), &snap, None));
        assert_ne!(base, derive_id("m", ts(1), &snapshot(&[("a.txt", b"y")]), None));
        let parent = CommitId::new("ff");
        assert_ne!(base, derive_id("m", ts(1), &snap, Some(&parent)));
    }

    #[test]
    fn test_create_commit_appends_child() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();

        let id = graph
            .create_commit(&root, "first", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();

        assert_eq!(graph.children(&root), &[id.clone()]);
        assert_eq!(graph.lookup(&id).unwrap().parent, Some(root));
    }

    #[test]
    fn test_empty_message_rejected() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();

        let result = graph.create_commit(&root, "   ", snapshot(&[("a.txt", b"x")]), ts(1));
        assert!(matches!(result, Err(StorageError::EmptyMessage)));
    }

    #[test]
    fn test_unchanged_snapshot_rejected() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();

        let result = graph.create_commit(&root, "nothing new", Snapshot::new(), ts(1));
        assert!(matches!(result, Err(StorageError::NoChanges)));
    }

    #[test]
    fn test_resolve_short() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();
        let id = graph
            .create_commit(&root, "first", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();

        let prefix = &id.as_str()[..8];
        assert_eq!(graph.resolve_short(prefix).unwrap(), id);
        assert_eq!(graph.resolve_short(id.as_str()).unwrap(), id);

        assert!(matches!(
            graph.resolve_short("this-prefix-matches-nothing"),
            Err(StorageError::AmbiguousOrUnknownId(_))
        ));
    }

    #[test]
    fn test_resolve_short_shared_prefix_is_ambiguous() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();
        let a = graph
            .create_commit(&root, "a", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();
        let b = graph
            .create_commit(&a, "b", snapshot(&[("a.txt", b"y")]), ts(2))
            .unwrap();

        let shared: String = a
            .as_str()
            .chars()
            .zip(b.as_str().chars())
            .take_while(|(x, y)| x == y)
            .map(|(x, _)| x)
            .collect();
        if !shared.is_empty() {
            assert!(matches!(
                graph.resolve_short(&shared),
                Err(StorageError::AmbiguousOrUnknownId(_))
            ));
        }
    }

    #[test]
    fn test_history_walks_to_root() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();
        let first = graph
            .create_commit(&root, "m1", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();
        let second = graph
            .create_commit(&first, "m2", snapshot(&[("a.txt", b"y")]), ts(2))
            .unwrap();

        let entries = graph.history(&second).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, second);
        assert_eq!(entries[1].id, first);
        assert_eq!(entries[2].id, root);
    }

    #[test]
    fn test_is_ancestor() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();
        let first = graph
            .create_commit(&root, "m1", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();

        assert!(graph.is_ancestor(&root, &first).unwrap());
        assert!(graph.is_ancestor(&first, &first).unwrap());
        assert!(!graph.is_ancestor(&first, &root).unwrap());
    }

    #[test]
    fn test_split_point_of_diverged_branches() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();
        let base = graph
            .create_commit(&root, "base", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();
        let left = graph
            .create_commit(&base, "left", snapshot(&[("a.txt", b"l")]), ts(2))
            .unwrap();
        let right = graph
            .create_commit(&base, "right", snapshot(&[("a.txt", b"r")]), ts(3))
            .unwrap();

        assert_eq!(graph.split_point(&left, &right).unwrap(), base);
    }

    #[test]
    fn test_split_point_with_uneven_depth() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();
        let base = graph
            .create_commit(&root, "base", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();
        let left = graph
            .create_commit(&base, "left", snapshot(&[("a.txt", b"l")]), ts(2))
            .unwrap();
        let mut right = graph
            .create_commit(&base, "right-1", snapshot(&[("b.txt", b"1")]), ts(3))
            .unwrap();
        right = graph
            .create_commit(&right, "right-2", snapshot(&[("b.txt", b"2")]), ts(4))
            .unwrap();

        assert_eq!(graph.split_point(&left, &right).unwrap(), base);
    }

    #[test]
    fn test_find_by_message() {
        let mut graph = CommitGraph::new_at(ts(0));
        let root = graph.root().clone();
        let first = graph
            .create_commit(&root, "same", snapshot(&[("a.txt", b"x")]), ts(1))
            .unwrap();
        let second = graph
            .create_commit(&first, "same", snapshot(&[("a.txt", b"y")]), ts(2))
            .unwrap();

        let mut found = graph.find_by_message("same");
        found.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(found, expected);
        assert!(graph.find_by_message("absent").is_empty());
    }
}
