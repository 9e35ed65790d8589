//! Blob operations for file content storage.
//!
//! Every version of every tracked file is stored exactly once, as a file
//! named by the hex SHA-256 of its bytes. Writes are idempotent: storing
//! the same bytes twice hits the same path and is a no-op the second time.
//! Nothing above this module may mutate stored content.

use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::BlobId;

/// on-disk content-addressed store
///
/// lives under `<state-dir>/blobs/`, one file per digest.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// open the store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// store a byte sequence, returning its id
    ///
    /// idempotent: an already-present digest is left untouched.
    pub fn put(&self, bytes: &[u8]) -> StorageResult<BlobId> {
        let id = BlobId::for_bytes(bytes);
        let path = self.blob_path(&id);
        if !path.exists() {
            fs::write(&path, bytes)?;
        }
        Ok(id)
    }

    /// read a blob's content back
    pub fn get(&self, id: &BlobId) -> StorageResult<Vec<u8>> {
        let path = self.blob_path(id);
        if !path.exists() {
            return Err(StorageError::BlobNotFound(id.clone()));
        }
        Ok(fs::read(&path)?)
    }

    /// check whether a blob is present
    pub fn contains(&self, id: &BlobId) -> bool {
        self.blob_path(id).exists()
    }

    /// the store's root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.dir.join(id.as_str())
    }
}
