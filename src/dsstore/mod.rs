//! dsstore
//!
//! Read-only decoder for macOS Finder `.DS_Store` files.
//!
//! # Layers
//!
//! - [`buddy`] - file header, block address table, table of contents
//! - [`btree`] - iterative walk of the `DSDB` B-tree
//! - [`record`] - raw records and their typed payloads
//! - [`plist`] - the binary property-list subset embedded in blobs
//! - [`settings`] - interpretation of records into a [`DirectoryMetadataRecord`]
//! - [`cache`] - per-directory cache keyed on file modification time
//!
//! Decoding is all-or-nothing at the container level (bad header,
//! truncation, cycles) and best-effort at the record level (a malformed
//! icon position or view dictionary is logged and skipped).
//!
//! # Example
//!
//! ```ignore
//! use finderz::dsstore;
//!
//! let record = dsstore::decode("/Users/me/Pictures/.DS_Store")?;
//! println!("{} view, icons {}pt", record.view_style(), record.icon_size());
//! ```

mod btree;
mod buddy;
pub mod cache;
pub mod model;
pub mod plist;
mod reader;
pub mod record;
mod settings;

use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

pub use btree::MAX_TREE_DEPTH;
pub use cache::{DirectoryCache, DEFAULT_DIRECTORY_CAPACITY};
pub use model::{
    color_label_name, DirectoryMetadataRecord, IconPosition, Setting, ViewStyle, WindowBounds,
};
pub use record::{Record, RecordValue};

/// File name Finder uses for its per-directory store.
pub const DS_STORE_NAME: &str = ".DS_Store";

/// Largest `.DS_Store` the decoder will load.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Errors from decoding a `.DS_Store`.
#[derive(Debug, Error)]
pub enum DsStoreError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The bytes are not a well-formed `.DS_Store`.
    #[error("malformed .DS_Store: {0}")]
    Format(String),

    /// A recognized structure this decoder does not handle.
    #[error("unsupported .DS_Store content: {0}")]
    Unsupported(String),
}

/// Decoder with a size limit on the files it will load.
#[derive(Debug, Clone)]
pub struct DsStoreDecoder {
    max_file_size: u64,
}

impl Default for DsStoreDecoder {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DsStoreDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse files larger than `bytes`.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Read and decode the file at `path`.
    pub fn decode(&self, path: &Path) -> Result<DirectoryMetadataRecord, DsStoreError> {
        let io_err = |source| DsStoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let len = std::fs::metadata(path).map_err(io_err)?.len();
        if len > self.max_file_size {
            return Err(DsStoreError::Format(format!(
                "file is {len} bytes, limit is {}",
                self.max_file_size
            )));
        }
        let bytes = std::fs::read(path).map_err(io_err)?;
        debug!("decoding {} ({} bytes)", path.display(), bytes.len());
        self.decode_bytes(&bytes)
    }

    /// Decode an in-memory `.DS_Store` image.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<DirectoryMetadataRecord, DsStoreError> {
        if bytes.len() as u64 > self.max_file_size {
            return Err(DsStoreError::Format(format!(
                "image is {} bytes, limit is {}",
                bytes.len(),
                self.max_file_size
            )));
        }
        let alloc = buddy::BuddyAllocator::open(bytes)?;
        let master = alloc
            .toc_entry("DSDB")
            .ok_or_else(|| DsStoreError::Format("no DSDB entry in table of contents".into()))?;
        let header = btree::TreeHeader::read(&alloc, master)?;
        debug!(
            "DSDB: root {} levels {} records {} nodes {} page {} ({} blocks)",
            header.root,
            header.levels,
            header.records,
            header.nodes,
            header.page_size,
            alloc.block_count()
        );
        let records = btree::walk(&alloc, &header)?;
        Ok(settings::interpret(records))
    }
}

/// Decode the `.DS_Store` at `path` with default limits.
pub fn decode(path: impl AsRef<Path>) -> Result<DirectoryMetadataRecord, DsStoreError> {
    DsStoreDecoder::default().decode(path.as_ref())
}

/// Decode an in-memory `.DS_Store` image with default limits.
pub fn decode_bytes(bytes: &[u8]) -> Result<DirectoryMetadataRecord, DsStoreError> {
    DsStoreDecoder::default().decode_bytes(bytes)
}
