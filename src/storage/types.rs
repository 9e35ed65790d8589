//! core type-safe wrappers around the storage primitives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// This makes sure we don't accidentally pass a blob ID where a commit ID
/// is expected. Both are hex SHA-256 digests, but they name different things.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    pub(crate) fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// short form of the commit ID
    pub fn short(&self) -> String {
        self.0[..7.min(self.0.len())].to_string()
    }

    /// check whether this id starts with the given user-entered prefix
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// blob identifier: hex SHA-256 of the blob's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobId(String);

impl BlobId {
    pub(crate) fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// compute the id for a byte sequence
    pub fn for_bytes(bytes: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a validated branch name
///
/// branch names are used as keys in the branch table and shown in status
/// output, so they get the same restrictions git applies to refs, minus
/// the parts we don't model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchName(String);

impl BranchName {
    /// the default branch name
    pub const MASTER: &'static str = "master";

    /// create a new BranchName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.contains("..") || name.starts_with('/') || name.ends_with('/') {
            return Err(InvalidNameError::InvalidPath(name));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(InvalidNameError::InvalidPath(name));
        }
        Ok(Self(name))
    }

    /// create the default branch name
    pub fn master() -> Self {
        Self(Self::MASTER.to_string())
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// error type for invalid names (branches, paths)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    InvalidPath(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::InvalidPath(path) => write!(f, "invalid name: '{}'", path),
        }
    }
}

impl std::error::Error for InvalidNameError {}
