//! attributes::traits
//!
//! Storage backend trait for extended attributes.
//!
//! # Design
//!
//! An `AttributeStore` is a raw name → bytes map per path. Names passed in
//! are fully qualified (namespace included); namespacing, UTF-8 handling
//! and typed values live one layer up in [`AttributeCache`].
//!
//! Implementations MUST:
//! - Report a missing attribute as `Ok(None)`, never as an error
//! - Treat removing a missing attribute as success
//! - Be thread-safe (Send + Sync)
//!
//! [`AttributeCache`]: super::AttributeCache

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::TypeError;

/// Errors from attribute storage.
#[derive(Debug, Error)]
pub enum AttrError {
    /// The filesystem (or platform) has no extended attribute support.
    #[error("extended attributes not supported for '{path}'")]
    Unsupported { path: PathBuf },

    /// Underlying I/O failed.
    #[error("attribute '{name}' on '{path}': {source}")]
    Io {
        path: PathBuf,
        name: String,
        source: std::io::Error,
    },

    /// A stored value is not valid UTF-8.
    #[error("attribute '{name}' on '{path}' is not valid UTF-8")]
    Encoding { path: PathBuf, name: String },

    /// The key does not form a valid attribute name.
    #[error(transparent)]
    InvalidKey(#[from] TypeError),

    /// Some keys failed to copy.
    #[error("copied {copied} attributes, {} failed: {}", failed.len(), failed.join(", "))]
    PartialCopy { copied: usize, failed: Vec<String> },
}

impl AttrError {
    pub(crate) fn io(path: &Path, name: &str, source: std::io::Error) -> Self {
        AttrError::Io {
            path: path.to_path_buf(),
            name: name.to_string(),
            source,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, AttrError::Unsupported { .. })
    }
}

/// Backend for reading and writing extended attributes.
pub trait AttributeStore: Send + Sync + std::fmt::Debug {
    /// Read attribute `name`, `None` when absent.
    fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>, AttrError>;

    /// Create or replace attribute `name`.
    fn set(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), AttrError>;

    /// Remove attribute `name`. Absent is not an error.
    fn remove(&self, path: &Path, name: &str) -> Result<(), AttrError>;

    /// Every attribute name on `path`, any namespace.
    fn list(&self, path: &Path) -> Result<Vec<String>, AttrError>;

    /// Whether attributes can be written to `path`, not only listed.
    fn supported(&self, path: &Path) -> bool;
}
