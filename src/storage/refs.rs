//! Branch and head management.
//!
//! Branches are named pointers into the commit graph. Exactly one entry
//! is the current branch; the head commit is always whatever the current
//! branch points at. The table never holds an id the graph doesn't know.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BranchName, CommitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTable {
    branches: BTreeMap<BranchName, CommitId>,
    current: BranchName,
}

impl BranchTable {
    /// create the table with `master` pointing at the root commit
    pub fn new(root: CommitId) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(BranchName::master(), root);
        Self {
            branches,
            current: BranchName::master(),
        }
    }

    /// the current branch's name
    pub fn current(&self) -> &BranchName {
        &self.current
    }

    /// the head commit: the current branch's referent
    pub fn head(&self) -> &CommitId {
        &self.branches[&self.current]
    }

    pub fn exists(&self, name: &BranchName) -> bool {
        self.branches.contains_key(name)
    }

    pub fn get(&self, name: &BranchName) -> Option<&CommitId> {
        self.branches.get(name)
    }

    /// resolve a branch name to its commit id
    pub fn resolve(&self, name: &BranchName) -> StorageResult<&CommitId> {
        self.branches
            .get(name)
            .ok_or_else(|| StorageError::UnknownBranch(name.to_string()))
    }

    /// create a new branch pointing at `target` (no switch)
    pub fn create(&mut self, name: BranchName, target: CommitId) -> StorageResult<()> {
        if self.exists(&name) {
            return Err(StorageError::BranchExists(name.to_string()));
        }
        self.branches.insert(name, target);
        Ok(())
    }

    /// delete a branch; the current branch is never deletable
    pub fn delete(&mut self, name: &BranchName) -> StorageResult<()> {
        if !self.exists(name) {
            return Err(StorageError::UnknownBranch(name.to_string()));
        }
        if *name == self.current {
            return Err(StorageError::CannotRemoveCurrentBranch(name.to_string()));
        }
        self.branches.remove(name);
        Ok(())
    }

    /// move the current branch's pointer to a new commit
    pub fn retarget_current(&mut self, target: CommitId) {
        self.branches.insert(self.current.clone(), target);
    }

    /// make `name` the current branch; the caller validates existence
    pub fn switch_to(&mut self, name: BranchName) -> StorageResult<()> {
        if !self.exists(&name) {
            return Err(StorageError::NoSuchBranch(name.to_string()));
        }
        self.current = name;
        Ok(())
    }

    /// all branch names in lexicographic order
    pub fn names(&self) -> impl Iterator<Item = &BranchName> {
        self.branches.keys()
    }

    /// all (name, target) pairs in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = (&BranchName, &CommitId)> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BranchTable {
        BranchTable::new(CommitId::new("root-id"))
    }

    #[test]
    fn test_new_table_points_master_at_root() {
        let table = table();
        assert_eq!(table.current().as_str(), "master");
        assert_eq!(table.head().as_str(), "root-id");
    }

    #[test]
    fn test_branch_lifecycle() {
        let mut table = table();
        let feature = BranchName::new("feature").unwrap();

        table.create(feature.clone(), CommitId::new("root-id")).unwrap();
        assert!(table.exists(&feature));
        assert_eq!(table.resolve(&feature).unwrap().as_str(), "root-id");

        table.delete(&feature).unwrap();
        assert!(!table.exists(&feature));
    }

    #[test]
    fn test_duplicate_branch_rejected() {
        let mut table = table();
        let feature = BranchName::new("feature").unwrap();
        table.create(feature.clone(), CommitId::new("root-id")).unwrap();

        let result = table.create(feature, CommitId::new("root-id"));
        assert!(matches!(result, Err(StorageError::BranchExists(_))));
    }

    #[test]
    fn test_current_branch_not_deletable() {
        let mut table = table();
        let result = table.delete(&BranchName::master());
        assert!(matches!(
            result,
            Err(StorageError::CannotRemoveCurrentBranch(_))
        ));
    }

    #[test]
    fn test_retarget_and_switch() {
        let mut table = table();
        let dev = BranchName::new("dev").unwrap();
        table.create(dev.clone(), CommitId::new("root-id")).unwrap();

        table.retarget_current(CommitId::new("new-tip"));
        assert_eq!(table.head().as_str(), "new-tip");

        table.switch_to(dev).unwrap();
        assert_eq!(table.head().as_str(), "root-id");

        let missing = BranchName::new("missing").unwrap();
        assert!(matches!(
            table.switch_to(missing),
            Err(StorageError::NoSuchBranch(_))
        ));
    }

    #[test]
    fn test_names_are_sorted() {
        let mut table = table();
        table
            .create(BranchName::new("zeta").unwrap(), CommitId::new("root-id"))
            .unwrap();
        table
            .create(BranchName::new("alpha").unwrap(), CommitId::new("root-id"))
            .unwrap();

        let names: Vec<_> = table.names().map(BranchName::as_str).collect();
        assert_eq!(names, vec!["alpha", "master", "zeta"]);
    }
}
