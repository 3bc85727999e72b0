//! attributes::memory_store
//!
//! In-process attribute store. Used in tests and as the fallback when the
//! filesystem cannot hold extended attributes, so ratings and prompts set
//! during a session still stick until exit.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::traits::{AttrError, AttributeStore};

type Attrs = HashMap<PathBuf, BTreeMap<String, Vec<u8>>>;

/// Attribute store held in memory.
#[derive(Debug, Default)]
pub struct MemoryAttributeStore {
    attrs: Mutex<Attrs>,
    unsupported: bool,
}

impl MemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that behaves like a filesystem without attribute support.
    pub fn unsupported() -> Self {
        Self {
            attrs: Mutex::default(),
            unsupported: true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Attrs> {
        self.attrs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, path: &Path) -> Result<(), AttrError> {
        if self.unsupported {
            return Err(AttrError::Unsupported {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl AttributeStore for MemoryAttributeStore {
    fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>, AttrError> {
        self.check(path)?;
        Ok(self.lock().get(path).and_then(|a| a.get(name)).cloned())
    }

    fn set(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), AttrError> {
        self.check(path)?;
        self.lock()
            .entry(path.to_path_buf())
            .or_default()
            .insert(name.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, path: &Path, name: &str) -> Result<(), AttrError> {
        self.check(path)?;
        if let Some(attrs) = self.lock().get_mut(path) {
            attrs.remove(name);
        }
        Ok(())
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, AttrError> {
        self.check(path)?;
        Ok(self
            .lock()
            .get(path)
            .map(|a| a.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn supported(&self, _path: &Path) -> bool {
        !self.unsupported
    }
}
