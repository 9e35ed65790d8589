//! Storage layer error types
//!
//! All errors that can occur during storage operations are defined here.
//! We use `thiserror` for ergonomic error definition, and the `Display`
//! strings double as the user-facing sentences the CLI prints.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::{BlobId, InvalidNameError};

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// the named working file does not exist on disk
    #[error("File does not exist.")]
    FileNotFound(String),

    /// commit was attempted with a blank message
    #[error("Please enter a commit message")]
    EmptyMessage,

    /// nothing is staged, marked clean, or marked for removal
    #[error("No changes added to the commit.")]
    NothingToCommit,

    /// the requested snapshot is identical to the parent's
    #[error("no changes relative to the parent commit")]
    NoChanges,

    /// the path is neither staged, tracked by head, nor clean
    #[error("No reason to remove the file.")]
    NothingToRemove(String),

    /// no commit id matches the given prefix, or several do
    #[error("No commit with that id exists.")]
    AmbiguousOrUnknownId(String),

    /// the commit exists but does not track the requested path
    #[error("File does not exist in that commit.")]
    FileNotInCommit(String),

    /// checkout target branch is missing
    #[error("No such branch exists.")]
    NoSuchBranch(String),

    /// checkout target branch is already the current branch
    #[error("No need to checkout the current branch.")]
    AlreadyOnBranch(String),

    /// branch creation collided with an existing name
    #[error("A branch with that name already exists.")]
    BranchExists(String),

    /// branch deletion or merge target is missing
    #[error("A branch with that name does not exist.")]
    UnknownBranch(String),

    /// the current branch cannot be deleted
    #[error("Cannot remove the current branch")]
    CannotRemoveCurrentBranch(String),

    /// a working file would be silently overwritten
    #[error("There is an untracked file in the way; delete it or add it first.")]
    UntrackedFileConflict(String),

    /// merge requires a clean staging area
    #[error("You have uncommitted changes.")]
    UncommittedChanges,

    /// merge target equals the current branch
    #[error("Cannot merge a branch with itself.")]
    CannotMergeSelf,

    /// the given branch head is already in the current history
    #[error("Given branch is an ancestor of the current branch.")]
    GivenIsAncestor,

    /// no commit carries the queried message
    #[error("Found no commit with that message.")]
    NoCommitWithMessage(String),

    /// the content store has no blob with this id
    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),

    /// no state directory at the given location
    #[error("Not in an initialized gitlite directory.")]
    NotInitialized(PathBuf),

    /// a state directory already exists at the given location
    #[error("A gitlite version-control system already exists in the current directory.")]
    AlreadyInitialized(PathBuf),

    /// invalid branch name
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// persisted state failed an integrity check
    #[error("corrupted state at {path}: {reason}")]
    CorruptedState { path: PathBuf, reason: String },

    /// state serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// internal error that shouldn't happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// check if this error came from bad user input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StorageError::FileNotFound(_)
                | StorageError::EmptyMessage
                | StorageError::NothingToCommit
                | StorageError::NothingToRemove(_)
                | StorageError::AlreadyOnBranch(_)
                | StorageError::BranchExists(_)
                | StorageError::CannotRemoveCurrentBranch(_)
                | StorageError::CannotMergeSelf
                | StorageError::InvalidName(_)
        )
    }

    /// check if this error indicates a missing or inconsistent reference
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            StorageError::AmbiguousOrUnknownId(_)
                | StorageError::FileNotInCommit(_)
                | StorageError::NoSuchBranch(_)
                | StorageError::UnknownBranch(_)
                | StorageError::NoCommitWithMessage(_)
                | StorageError::BlobNotFound(_)
                | StorageError::NotInitialized(_)
        )
    }

    /// check if this error is a hard failure rather than a reported outcome
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StorageError::Io(_)
                | StorageError::Serialization(_)
                | StorageError::CorruptedState { .. }
                | StorageError::Internal(_)
        )
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let user = StorageError::EmptyMessage;
        assert!(user.is_user_error());
        assert!(!user.is_state_error());
        assert!(!user.is_fatal());

        let state = StorageError::AmbiguousOrUnknownId("abc".into());
        assert!(!state.is_user_error());
        assert!(state.is_state_error());

        let fatal = StorageError::Internal("broken".into());
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_user_facing_sentences() {
        assert_eq!(
            StorageError::NothingToCommit.to_string(),
            "No changes added to the commit."
        );
        assert_eq!(
            StorageError::UntrackedFileConflict("a.txt".into()).to_string(),
            "There is an untracked file in the way; delete it or add it first."
        );
    }
}
