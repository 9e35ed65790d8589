//! storage layer for gitlite
//!
//! this module is the whole version-control core. The upper layers
//! (workspace facade, CLI) use this API and never touch the object
//! model directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Repository                            │
//! │  (controller: add, commit, checkout, branch, merge, ...)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │    stage    │       │    refs     │       │   workdir   │
//!  │  (pending)  │       │ (branches)  │       │  (file io)  │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!         │                     │
//!         ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐
//!  │    blob     │       │   commit    │
//!  │  (content)  │       │  (history)  │
//!  └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gitlite::storage::{BlobStore, Repository, WorkDir};
//!
//! let workdir = WorkDir::new("./project");
//! let store = BlobStore::open("./project/.gitlite/blobs")?;
//! let mut repo = Repository::new(workdir, store);
//!
//! repo.add("a.txt")?;
//! let id = repo.commit("first")?;
//! println!("committed {}", id.short());
//! ```

mod blob;
mod commit;
mod error;
mod refs;
mod repository;
mod stage;
mod types;
mod workdir;

// Re-export public API
pub use blob::BlobStore;
pub use commit::{Commit, CommitGraph, Snapshot, INITIAL_COMMIT_MESSAGE};
pub use error::{StorageError, StorageResult};
pub use refs::BranchTable;
pub use repository::{MergeOutcome, RepoState, Repository, StatusReport};
pub use stage::{StageOutcome, StagingArea};
pub use types::{BlobId, BranchName, CommitId, InvalidNameError};
pub use workdir::WorkDir;
