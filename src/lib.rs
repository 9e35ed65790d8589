//! gitlite - a local, single-user version-control engine
//!
//! This crate tracks snapshots of a working directory as an immutable
//! commit graph with content-addressed blob storage, supports branching,
//! and merges divergent branches by three-way comparison against their
//! common ancestor. State lives in a `.gitlite` directory and round-trips
//! through one JSON state file between invocations.
//!
//! # Example
//!
//! ```no_run
//! use gitlite::workspace::Workspace;
//!
//! let ws = Workspace::init("./project").unwrap();
//! ws.with_repo_mut(|repo| {
//!     repo.add("notes.txt")?;
//!     repo.commit("first notes")?;
//!     Ok(())
//! }).unwrap();
//! ws.save().unwrap();
//! ```

pub mod cli;
pub mod storage;
pub mod workspace;
