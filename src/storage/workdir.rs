//! Working directory file access.
//!
//! Thin wrappers over the filesystem, rooted at the directory under
//! version control. Paths are repository-relative strings; everything
//! here is a given utility as far as the core algorithms are concerned.

use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::BlobId;

/// handle on the directory under version control
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// the directory's absolute root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// check whether a working file exists
    pub fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }

    /// read a working file's bytes
    ///
    /// fails with `FileNotFound` if the path is missing, which callers
    /// surface directly to the user.
    pub fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.root.join(path);
        if !full.is_file() {
            return Err(StorageError::FileNotFound(path.to_string()));
        }
        Ok(fs::read(full)?)
    }

    /// write a working file, creating parent directories as needed
    pub fn write(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, bytes)?;
        Ok(())
    }

    /// delete a working file; a missing file is not an error
    pub fn remove(&self, path: &str) -> StorageResult<()> {
        let full = self.root.join(path);
        if full.is_file() {
            fs::remove_file(full)?;
        }
        Ok(())
    }

    /// compute the content digest of a working file
    pub fn digest(&self, path: &str) -> StorageResult<BlobId> {
        let bytes = self.read(path)?;
        Ok(BlobId::for_bytes(&bytes))
    }
}
