//! dsstore::cache
//!
//! Directory path → decoded [`DirectoryMetadataRecord`], validated against
//! the `.DS_Store` file's size and modification time on every lookup.
//!
//! The mutex guards only the map. Decoding runs unlocked, so two threads
//! missing on the same directory both decode and the later insert wins.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use log::debug;
use lru::LruCache;

use super::{DirectoryMetadataRecord, DsStoreDecoder, DsStoreError, DS_STORE_NAME};

/// Default number of directories kept decoded.
pub const DEFAULT_DIRECTORY_CAPACITY: usize = 512;

/// Identity of the file a cached record was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

#[derive(Debug)]
struct Entry {
    stamp: Stamp,
    record: Arc<DirectoryMetadataRecord>,
}

/// Shared cache of decoded directories.
#[derive(Debug)]
pub struct DirectoryCache {
    decoder: DsStoreDecoder,
    entries: Mutex<LruCache<PathBuf, Entry>>,
}

impl Default for DirectoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTORY_CAPACITY)
    }
}

impl DirectoryCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_decoder(capacity, DsStoreDecoder::default())
    }

    pub fn with_decoder(capacity: usize, decoder: DsStoreDecoder) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            decoder,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Decoded record for `dir`, or `None` when it has no `.DS_Store`.
    ///
    /// A cached record is reused only while the file's length and mtime
    /// are unchanged; otherwise it is decoded again and replaced whole.
    pub fn get(&self, dir: &Path) -> Result<Option<Arc<DirectoryMetadataRecord>>, DsStoreError> {
        let file = dir.join(DS_STORE_NAME);
        let meta = match std::fs::metadata(&file) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.lock().pop(dir);
                return Ok(None);
            }
            Err(source) => return Err(DsStoreError::Io { path: file, source }),
        };
        let stamp = Stamp {
            modified: meta.modified().ok(),
            len: meta.len(),
        };

        if let Some(entry) = self.lock().get(dir) {
            if entry.stamp == stamp {
                debug!("directory cache hit: {}", dir.display());
                return Ok(Some(Arc::clone(&entry.record)));
            }
        }

        debug!("directory cache miss: {}", dir.display());
        let record = Arc::new(self.decoder.decode(&file)?);
        self.lock().put(
            dir.to_path_buf(),
            Entry {
                stamp,
                record: Arc::clone(&record),
            },
        );
        Ok(Some(record))
    }

    /// Drop the cached record for `dir`.
    pub fn invalidate(&self, dir: &Path) {
        self.lock().pop(dir);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<PathBuf, Entry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
