//! Workspace: the persistence boundary around the repository controller.
//!
//! One workspace = one working directory with a `.gitlite` state
//! directory inside it. The full controller state (commit graph, branch
//! table, staging area) is loaded from `state.json` before an operation
//! and saved back afterwards; blobs live next to it under `blobs/`.
//! The controller is wrapped in a single `RwLock`, so embedding the
//! workspace in a long-lived process serializes every mutation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::storage::{
    BlobStore, RepoState, Repository, StorageError, StorageResult, WorkDir,
};

/// name of the state directory inside the working directory
pub const STATE_DIR: &str = ".gitlite";
const STATE_FILE: &str = "state.json";
const BLOBS_DIR: &str = "blobs";

/// Workspace configuration options.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// the directory under version control
    pub root: PathBuf,
    /// name of the state directory created inside `root`
    pub state_dir: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            state_dir: STATE_DIR.to_string(),
        }
    }
}

impl WorkspaceConfig {
    /// create a configuration rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// override the state directory name
    pub fn state_dir(mut self, name: impl Into<String>) -> Self {
        self.state_dir = name.into();
        self
    }

    fn state_dir_path(&self) -> PathBuf {
        self.root.join(&self.state_dir)
    }

    fn state_file_path(&self) -> PathBuf {
        self.state_dir_path().join(STATE_FILE)
    }

    fn blobs_path(&self) -> PathBuf {
        self.state_dir_path().join(BLOBS_DIR)
    }
}

/// handle on an initialized working directory
///
/// clone freely; the controller is shared behind one lock.
#[derive(Clone)]
pub struct Workspace {
    config: WorkspaceConfig,
    repo: Arc<RwLock<Repository>>,
    // keeps the backing directory of an ephemeral workspace alive
    _ephemeral: Option<Arc<tempfile::TempDir>>,
}

impl Workspace {
    /// initialize a brand-new repository in `root`
    ///
    /// fails if a state directory is already there.
    pub fn init(root: impl AsRef<Path>) -> StorageResult<Self> {
        Self::init_with_config(WorkspaceConfig::new(root.as_ref()))
    }

    pub fn init_with_config(config: WorkspaceConfig) -> StorageResult<Self> {
        let state_dir = config.state_dir_path();
        if state_dir.exists() {
            return Err(StorageError::AlreadyInitialized(state_dir));
        }
        std::fs::create_dir_all(&state_dir)?;

        let workdir = WorkDir::new(&config.root);
        let store = BlobStore::open(config.blobs_path())?;
        let repo = Repository::new(workdir, store);

        let workspace = Self {
            config,
            repo: Arc::new(RwLock::new(repo)),
            _ephemeral: None,
        };
        workspace.save()?;
        Ok(workspace)
    }

    /// open an existing repository in `root`
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(WorkspaceConfig::new(root.as_ref()))
    }

    pub fn open_with_config(config: WorkspaceConfig) -> StorageResult<Self> {
        let state_file = config.state_file_path();
        if !state_file.is_file() {
            return Err(StorageError::NotInitialized(config.state_dir_path()));
        }

        let bytes = std::fs::read(&state_file)?;
        let state: RepoState = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::CorruptedState {
                path: state_file.clone(),
                reason: e.to_string(),
            }
        })?;
        if let Err(reason) = integrity(&state) {
            return Err(StorageError::CorruptedState {
                path: state_file,
                reason,
            });
        }

        let workdir = WorkDir::new(&config.root);
        let store = BlobStore::open(config.blobs_path())?;
        let repo = Repository::from_state(state, workdir, store);

        Ok(Self {
            config,
            repo: Arc::new(RwLock::new(repo)),
            _ephemeral: None,
        })
    }

    /// a throwaway workspace backed by a temporary directory
    ///
    /// handy for embedding and tests; the directory is removed when the
    /// last clone drops.
    pub fn ephemeral() -> StorageResult<Self> {
        let dir = tempfile::TempDir::new()?;
        let mut workspace = Self::init(dir.path())?;
        workspace._ephemeral = Some(Arc::new(dir));
        Ok(workspace)
    }

    /// the directory under version control
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// execute a function with read access to the controller
    pub fn with_repo<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Repository) -> StorageResult<T>,
    {
        let repo = self.repo.read();
        f(&repo)
    }

    /// execute a function with exclusive access to the controller
    pub fn with_repo_mut<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Repository) -> StorageResult<T>,
    {
        let mut repo = self.repo.write();
        f(&mut repo)
    }

    /// write the controller state back to `state.json`
    pub fn save(&self) -> StorageResult<()> {
        let repo = self.repo.read();
        let bytes = serde_json::to_vec_pretty(repo.state())?;
        std::fs::write(self.config.state_file_path(), bytes)?;
        Ok(())
    }

    /// save, treating failure as "no state change occurred"
    ///
    /// the CLI calls this after every mutating command; a failed save
    /// leaves the previous on-disk state intact, which is the documented
    /// recovery story for a local tool.
    pub fn checkpoint(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to persist state");
        }
    }
}

/// cheap invariant check on reloaded state: every branch must target a
/// commit the graph actually holds
fn integrity(state: &RepoState) -> Result<(), String> {
    if state.branches.get(state.branches.current()).is_none() {
        return Err(format!(
            "current branch '{}' is not in the branch table",
            state.branches.current()
        ));
    }
    for (name, target) in state.branches.iter() {
        if !state.graph.contains(target) {
            return Err(format!(
                "branch '{}' targets unknown commit {}",
                name,
                target.short()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_state_layout() {
        let dir = TempDir::new().unwrap();
        let _ws = Workspace::init(dir.path()).unwrap();

        assert!(dir.path().join(".gitlite/state.json").is_file());
        assert!(dir.path().join(".gitlite/blobs").is_dir());
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let _ws = Workspace::init(dir.path()).unwrap();

        let result = Workspace::init(dir.path());
        assert!(matches!(result, Err(StorageError::AlreadyInitialized(_))));
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let dir = TempDir::new().unwrap();
        let result = Workspace::open(dir.path());
        assert!(matches!(result, Err(StorageError::NotInitialized(_))));
    }

    #[test]
    fn test_state_round_trips_exactly() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::init(dir.path()).unwrap();

        ws.with_repo_mut(|repo| {
            repo.workdir().write("a.txt", b"x")?;
            repo.add("a.txt")?;
            repo.commit("m1")?;
            repo.workdir().write("b.txt", b"y")?;
            repo.add("b.txt")?;
            repo.branch(crate::storage::BranchName::new("dev")?)?;
            Ok(())
        })
        .unwrap();
        ws.save().unwrap();

        let saved = ws.with_repo(|repo| Ok(repo.state().clone())).unwrap();
        let reopened = Workspace::open(dir.path()).unwrap();
        let loaded = reopened.with_repo(|repo| Ok(repo.state().clone())).unwrap();

        assert_eq!(saved, loaded);
    }

    #[test]
    fn test_operations_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let ws = Workspace::init(dir.path()).unwrap();
            ws.with_repo_mut(|repo| {
                repo.workdir().write("a.txt", b"x")?;
                repo.add("a.txt")?;
                repo.commit("m1")?;
                Ok(())
            })
            .unwrap();
            ws.save().unwrap();
        }

        let ws = Workspace::open(dir.path()).unwrap();
        let log_len = ws.with_repo(|repo| Ok(repo.log()?.len())).unwrap();
        assert_eq!(log_len, 2);
    }

    #[test]
    fn test_ephemeral_workspace() {
        let ws = Workspace::ephemeral().unwrap();
        ws.with_repo_mut(|repo| {
            repo.workdir().write("a.txt", b"x")?;
            repo.add("a.txt")?;
            repo.commit("m1")?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_corrupted_state_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let _ws = Workspace::init(dir.path()).unwrap();

        std::fs::write(dir.path().join(".gitlite/state.json"), b"not json at all").unwrap();
        let result = Workspace::open(dir.path());
        assert!(matches!(result, Err(StorageError::CorruptedState { .. })));
    }

    #[test]
    fn test_custom_state_dir() {
        let dir = TempDir::new().unwrap();
        let config = WorkspaceConfig::new(dir.path()).state_dir(".custom");
        let _ws = Workspace::init_with_config(config.clone()).unwrap();

        assert!(dir.path().join(".custom/state.json").is_file());
        let reopened = Workspace::open_with_config(config);
        assert!(reopened.is_ok());
    }
}
