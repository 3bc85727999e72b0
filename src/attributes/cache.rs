//! attributes::cache
//!
//! Namespaced, string-valued view over an [`AttributeStore`].
//!
//! Every key is stored as `<namespace><key>`, e.g. `user.finderz.rating`.
//! Values are UTF-8; integers are decimal text.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use super::traits::{AttrError, AttributeStore};
use crate::core::types::AttrKey;

/// Default namespace prefix.
pub const DEFAULT_NAMESPACE: &str = "user.finderz.";

/// Star rating key.
pub const RATING_KEY: &str = "rating";
/// Generation prompt key.
pub const AI_PROMPT_KEY: &str = "ai.prompt";
/// Generation model key.
pub const AI_MODEL_KEY: &str = "ai.model";

/// Highest star rating.
pub const MAX_RATING: u8 = 5;

/// Durable per-file key/value cache kept in extended attributes.
#[derive(Debug, Clone)]
pub struct AttributeCache {
    store: Arc<dyn AttributeStore>,
    namespace: String,
}

impl AttributeCache {
    /// Cache over `store` with the default namespace.
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    /// Cache over `store` with a custom namespace. The namespace should end
    /// in `.`; configuration validation enforces this.
    pub fn with_namespace(store: Arc<dyn AttributeStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn name(&self, key: &str) -> Result<String, AttrError> {
        let key = AttrKey::new(key)?;
        Ok(format!("{}{}", self.namespace, key))
    }

    /// Read `key`, `None` when absent.
    pub fn get(&self, path: &Path, key: &str) -> Result<Option<String>, AttrError> {
        let name = self.name(key)?;
        match self.store.get(path, &name)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| AttrError::Encoding {
                    path: path.to_path_buf(),
                    name,
                }),
            None => Ok(None),
        }
    }

    /// Write `key`.
    pub fn set(&self, path: &Path, key: &str, value: &str) -> Result<(), AttrError> {
        let name = self.name(key)?;
        debug!("set {} on {}", name, path.display());
        self.store.set(path, &name, value.as_bytes())
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub fn remove(&self, path: &Path, key: &str) -> Result<(), AttrError> {
        let name = self.name(key)?;
        self.store.remove(path, &name)
    }

    /// Keys under our namespace, with the prefix stripped.
    pub fn list_all(&self, path: &Path) -> Result<BTreeSet<String>, AttrError> {
        Ok(self
            .store
            .list(path)?
            .into_iter()
            .filter_map(|name| name.strip_prefix(&self.namespace).map(str::to_owned))
            .filter(|key| !key.is_empty())
            .collect())
    }

    /// Copy every namespaced key from `src` to `dest`.
    ///
    /// Best effort: each key is attempted even if an earlier one failed.
    /// Returns the number copied, or [`AttrError::PartialCopy`] naming the
    /// keys that failed.
    pub fn copy_all(&self, src: &Path, dest: &Path) -> Result<usize, AttrError> {
        let keys = self.list_all(src)?;
        let mut copied = 0;
        let mut failed = Vec::new();

        for key in keys {
            let result = self
                .get(src, &key)
                .and_then(|value| match value {
                    Some(value) => self.set(dest, &key, &value).map(|()| true),
                    // Removed between list and get.
                    None => Ok(false),
                });
            match result {
                Ok(true) => copied += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("failed to copy attribute '{key}' to {}: {e}", dest.display());
                    failed.push(key);
                }
            }
        }

        if failed.is_empty() {
            Ok(copied)
        } else {
            Err(AttrError::PartialCopy { copied, failed })
        }
    }

    /// Whether `path` can hold attributes.
    pub fn supported(&self, path: &Path) -> bool {
        self.store.supported(path)
    }

    /// Star rating, clamped to `0..=5`. Unparseable values read as absent.
    pub fn rating(&self, path: &Path) -> Result<Option<u8>, AttrError> {
        let Some(raw) = self.get(path, RATING_KEY)? else {
            return Ok(None);
        };
        match raw.trim().parse::<i64>() {
            Ok(n) => Ok(Some(clamp_rating(n))),
            Err(_) => {
                warn!("ignoring non-numeric rating {raw:?} on {}", path.display());
                Ok(None)
            }
        }
    }

    /// Store a star rating, clamped to `0..=5`.
    pub fn set_rating(&self, path: &Path, rating: i64) -> Result<u8, AttrError> {
        let rating = clamp_rating(rating);
        self.set(path, RATING_KEY, &rating.to_string())?;
        Ok(rating)
    }

    pub fn ai_prompt(&self, path: &Path) -> Result<Option<String>, AttrError> {
        self.get(path, AI_PROMPT_KEY)
    }

    pub fn set_ai_prompt(&self, path: &Path, prompt: &str) -> Result<(), AttrError> {
        self.set(path, AI_PROMPT_KEY, prompt)
    }

    pub fn ai_model(&self, path: &Path) -> Result<Option<String>, AttrError> {
        self.get(path, AI_MODEL_KEY)
    }

    pub fn set_ai_model(&self, path: &Path, model: &str) -> Result<(), AttrError> {
        self.set(path, AI_MODEL_KEY, model)
    }
}

/// Clamp any integer into the star range.
pub fn clamp_rating(rating: i64) -> u8 {
    rating.clamp(0, i64::from(MAX_RATING)) as u8
}
