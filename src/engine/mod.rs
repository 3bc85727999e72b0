//! engine
//!
//! Aggregates every metadata source into one [`UniversalMetadata`] per file.
//!
//! # Lookup
//!
//! ```text
//! aggregate cache -> AttributeSource -> DsStoreSource -> PngSource -> merge
//!                 -> write back expensive fields -> aggregate cache
//! ```
//!
//! Sources run in ascending precedence and each merge overwrites earlier
//! values, except that a default-filled field never replaces an explicit
//! one. Fields the registry marks as write-back (`ai_prompt`, `ai_model`)
//! are persisted to the attribute cache when freshly extracted and
//! different from what is stored there, so the next process start finds
//! them without re-parsing.
//!
//! # Concurrency
//!
//! The aggregate cache is one mutex held only for map access. Extraction
//! runs unlocked; two threads missing on the same path both extract and
//! the later insert wins.
//!
//! # Example
//!
//! ```ignore
//! use finderz::core::config::Config;
//! use finderz::engine::MetadataEngine;
//!
//! let engine = MetadataEngine::from_config(&Config::load()?.config);
//! let meta = engine.get(Path::new("/photos/render.png"))?;
//! if let Some(prompt) = meta.field("ai_prompt") {
//!     println!("{}", prompt.formatted());
//! }
//! ```

pub mod extractor;
pub mod sources;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use lru::LruCache;
use thiserror::Error;

use crate::attributes::{AttrError, AttributeCache, AttributeStore, XattrStore};
use crate::core::config::Config;
use crate::dsstore::{DirectoryCache, DsStoreDecoder};
use crate::fields::{registry, FieldSource, UniversalMetadata};
use crate::png::PngTextExtractor;

pub use extractor::{ExtractError, Extractor};
pub use sources::{AttributeSource, DsStoreSource, PngSource};

/// Default number of aggregates kept in memory.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The file itself could not be inspected.
    #[error("cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing through the attribute cache failed.
    #[error(transparent)]
    Attribute(#[from] AttrError),

    /// The key has no attribute cache slot.
    #[error("field '{0}' cannot be written")]
    NotWritable(String),
}

/// Metadata aggregation engine.
#[derive(Debug)]
pub struct MetadataEngine {
    attributes: AttributeCache,
    directories: Arc<DirectoryCache>,
    extractors: Vec<Box<dyn Extractor>>,
    cache: Mutex<LruCache<PathBuf, Arc<UniversalMetadata>>>,
    write_back: bool,
}

impl MetadataEngine {
    /// Engine over `attributes` with every built-in source and defaults.
    pub fn new(attributes: AttributeCache) -> Self {
        Self::with_store(&Config::default(), attributes)
    }

    /// Engine configured from `config`, storing attributes on the filesystem.
    pub fn from_config(config: &Config) -> Self {
        let store: Arc<dyn AttributeStore> = Arc::new(XattrStore::new());
        let attributes = AttributeCache::with_namespace(store, &config.attributes.namespace);
        Self::with_store(config, attributes)
    }

    /// Engine configured from `config` over an existing attribute cache.
    ///
    /// The cache's namespace wins over `config.attributes.namespace`.
    pub fn with_store(config: &Config, attributes: AttributeCache) -> Self {
        let directories = Arc::new(DirectoryCache::with_decoder(
            config.cache.directories,
            DsStoreDecoder::new().with_max_file_size(config.ds_store.max_file_size),
        ));

        let mut extractors: Vec<Box<dyn Extractor>> =
            vec![Box::new(AttributeSource::new(attributes.clone()))];
        if config.ds_store.enabled {
            extractors.push(Box::new(DsStoreSource::new(Arc::clone(&directories))));
        }
        if config.png.enabled {
            extractors.push(Box::new(PngSource::new(PngTextExtractor::new(
                config.png.max_text_chunk,
            ))));
        }

        let capacity = NonZeroUsize::new(config.cache.capacity).unwrap_or(NonZeroUsize::MIN);
        debug!(
            "MetadataEngine created: capacity={}, sources={}",
            capacity,
            extractors.len()
        );
        Self {
            attributes,
            directories,
            extractors,
            cache: Mutex::new(LruCache::new(capacity)),
            write_back: config.attributes.write_back,
        }
    }

    /// Append an extractor with higher precedence than all existing ones.
    pub fn add_extractor(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    /// Extractor names in precedence order, lowest first.
    pub fn extractor_names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn attributes(&self) -> &AttributeCache {
        &self.attributes
    }

    pub fn directories(&self) -> &DirectoryCache {
        &self.directories
    }

    /// All metadata for `path`, from cache when possible.
    pub fn get(&self, path: &Path) -> Result<Arc<UniversalMetadata>, EngineError> {
        if let Some(hit) = self.lock().get(path) {
            debug!("aggregate cache hit: {}", path.display());
            return Ok(Arc::clone(hit));
        }

        std::fs::symlink_metadata(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("aggregate cache miss: {}", path.display());
        let meta = Arc::new(self.extract(path));
        self.lock().put(path.to_path_buf(), Arc::clone(&meta));
        Ok(meta)
    }

    /// Run every source and merge, bypassing the aggregate cache.
    fn extract(&self, path: &Path) -> UniversalMetadata {
        let mut meta = UniversalMetadata::new(path);
        for extractor in &self.extractors {
            if !extractor.supports(path) {
                continue;
            }
            match extractor.extract(path) {
                Ok(fields) => {
                    debug!(
                        "{}: {} fields from {}",
                        path.display(),
                        fields.len(),
                        extractor.name()
                    );
                    meta.merge_all(fields);
                }
                Err(e) => warn!("{} failed for {}: {e}", extractor.name(), path.display()),
            }
        }
        if self.write_back {
            self.write_back(path, &meta);
        }
        meta
    }

    /// Persist freshly extracted write-back fields that differ from the cache.
    fn write_back(&self, path: &Path, meta: &UniversalMetadata) {
        for spec in registry::all().iter().filter(|s| s.write_back) {
            let (Some(field), Some(cache_key)) = (meta.field(spec.key), spec.cache_key) else {
                continue;
            };
            if field.source == FieldSource::Xattr || field.defaulted {
                continue;
            }
            match self.attributes.get(path, cache_key) {
                Ok(Some(cached)) if cached == field.value => continue,
                Ok(_) => {}
                Err(e) if e.is_unsupported() => return,
                Err(e) => {
                    warn!("cannot read cached {cache_key} for {}: {e}", path.display());
                    continue;
                }
            }
            match self.attributes.set(path, cache_key, &field.value) {
                Ok(()) => debug!("wrote back {cache_key} for {}", path.display()),
                Err(e) if e.is_unsupported() => return,
                Err(e) => warn!("cannot write back {cache_key} for {}: {e}", path.display()),
            }
        }
    }

    /// Write a field through the attribute cache and drop the stale aggregate.
    ///
    /// Only registered fields with a cache slot can be written. Ratings are
    /// clamped to `0..=5`.
    pub fn set_attribute(&self, path: &Path, key: &str, value: &str) -> Result<(), EngineError> {
        let cache_key = registry::lookup(key)
            .and_then(|spec| spec.cache_key)
            .ok_or_else(|| EngineError::NotWritable(key.to_string()))?;
        let value = if key == "rating" {
            sources::normalize_rating(value)
                .ok_or_else(|| EngineError::NotWritable(format!("{key} = {value:?}")))?
        } else {
            value.to_string()
        };
        self.attributes.set(path, cache_key, &value)?;
        self.invalidate(path);
        Ok(())
    }

    /// Forget the aggregate for `path`.
    pub fn invalidate(&self, path: &Path) {
        self.lock().pop(path);
    }

    /// Forget every aggregate and every decoded directory.
    pub fn clear_all(&self) {
        self.lock().clear();
        self.directories.clear();
    }

    /// Number of cached aggregates.
    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<PathBuf, Arc<UniversalMetadata>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
