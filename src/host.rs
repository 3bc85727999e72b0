//! host
//!
//! The surface a file browser talks to.
//!
//! The browser implements [`FileHost`] for its own file handles and drives
//! [`MetadataColumns`], which renders and sorts column cells from the
//! engine's aggregates. Lookups never fail from the host's point of view:
//! a file that cannot be resolved or read simply shows an empty cell.
//!
//! # Example
//!
//! ```ignore
//! struct Browser;
//!
//! impl FileHost for Browser {
//!     type Handle = PathBuf;
//!
//!     fn resolve_path(&self, handle: &PathBuf) -> Option<PathBuf> {
//!         Some(handle.clone())
//!     }
//!
//!     fn notify_attribute_changed(&self, handle: &PathBuf, key: &str) {
//!         redraw(handle, key);
//!     }
//! }
//!
//! let columns = MetadataColumns::new(Browser, MetadataEngine::from_config(&config));
//! let cell = columns.get_formatted_attribute(&path, "rating");
//! ```

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::engine::{EngineError, MetadataEngine};
use crate::fields::{compare_fields, registry, UniversalMetadata};

/// Errors from host-initiated writes.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host could not map the handle to a local path.
    #[error("file handle does not resolve to a local path")]
    Unresolved,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What the file browser provides.
pub trait FileHost: Send + Sync {
    /// The browser's own file reference.
    type Handle;

    /// Local path for `handle`, or `None` for remote or virtual items.
    fn resolve_path(&self, handle: &Self::Handle) -> Option<PathBuf>;

    /// Called after `key` changed for `handle` so the cell can be redrawn.
    fn notify_attribute_changed(&self, handle: &Self::Handle, key: &str);
}

/// Metadata columns backed by a [`MetadataEngine`].
#[derive(Debug)]
pub struct MetadataColumns<H: FileHost> {
    host: H,
    engine: MetadataEngine,
}

impl<H: FileHost> MetadataColumns<H> {
    pub fn new(host: H, engine: MetadataEngine) -> Self {
        Self { host, engine }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn engine(&self) -> &MetadataEngine {
        &self.engine
    }

    /// Every column key, in registry order.
    pub fn list_available_metadata_keys(&self) -> Vec<&'static str> {
        registry::keys().collect()
    }

    /// Display string for `key`, empty when the file has no such field.
    pub fn get_formatted_attribute(&self, handle: &H::Handle, key: &str) -> String {
        self.lookup(handle)
            .and_then(|meta| meta.field(key).map(|f| f.formatted()))
            .unwrap_or_default()
    }

    /// Sort order of two files by `key`. Files without the field sort first.
    pub fn compare_by_attribute(&self, a: &H::Handle, b: &H::Handle, key: &str) -> Ordering {
        let a = self.lookup(a);
        let b = self.lookup(b);
        compare_fields(
            a.as_deref().and_then(|m| m.field(key)),
            b.as_deref().and_then(|m| m.field(key)),
        )
    }

    /// Write `value` for `key` through the attribute cache and tell the host.
    pub fn set_attribute(
        &self,
        handle: &H::Handle,
        key: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let path = self.host.resolve_path(handle).ok_or(HostError::Unresolved)?;
        self.engine.set_attribute(&path, key, value)?;
        self.host.notify_attribute_changed(handle, key);
        Ok(())
    }

    fn lookup(&self, handle: &H::Handle) -> Option<Arc<UniversalMetadata>> {
        let path = self.host.resolve_path(handle)?;
        match self.engine.get(&path) {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!("no metadata for {}: {e}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeCache, MemoryAttributeStore};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct Recorder {
        changed: Mutex<Vec<(String, String)>>,
    }

    impl FileHost for Recorder {
        type Handle = PathBuf;

        fn resolve_path(&self, handle: &PathBuf) -> Option<PathBuf> {
            if handle.starts_with("remote:") {
                None
            } else {
                Some(handle.clone())
            }
        }

        fn notify_attribute_changed(&self, handle: &PathBuf, key: &str) {
            self.changed
                .lock()
                .unwrap()
                .push((handle.display().to_string(), key.to_string()));
        }
    }

    fn columns() -> (TempDir, MetadataColumns<Recorder>) {
        let dir = TempDir::new().unwrap();
        let cache = AttributeCache::new(Arc::new(MemoryAttributeStore::new()));
        let columns = MetadataColumns::new(Recorder::default(), MetadataEngine::new(cache));
        (dir, columns)
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn keys_follow_registry() {
        let (_dir, columns) = columns();
        let keys = columns.list_available_metadata_keys();
        assert_eq!(keys.first(), Some(&"rating"));
        assert!(keys.contains(&"ai_prompt"));
        assert!(keys.contains(&"mac_view_style"));
        assert_eq!(keys.len(), registry::all().len());
    }

    #[test]
    fn absent_fields_render_empty() {
        let (dir, columns) = columns();
        let file = touch(&dir, "a.txt");
        assert_eq!(columns.get_formatted_attribute(&file, "rating"), "");
        assert_eq!(
            columns.get_formatted_attribute(&dir.path().join("missing"), "rating"),
            ""
        );
        assert_eq!(
            columns.get_formatted_attribute(&PathBuf::from("remote:x"), "rating"),
            ""
        );
    }

    #[test]
    fn set_rating_renders_stars_and_notifies() {
        let (dir, columns) = columns();
        let file = touch(&dir, "a.txt");
        columns.set_attribute(&file, "rating", "4").unwrap();
        assert_eq!(columns.get_formatted_attribute(&file, "rating"), "★★★★☆");

        let changed = columns.host().changed.lock().unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].1, "rating");
    }

    #[test]
    fn unresolved_handles_cannot_be_written() {
        let (_dir, columns) = columns();
        let err = columns
            .set_attribute(&PathBuf::from("remote:x"), "rating", "1")
            .unwrap_err();
        assert!(matches!(err, HostError::Unresolved));
        assert!(columns.host().changed.lock().unwrap().is_empty());
    }

    #[test]
    fn compares_by_typed_value() {
        let (dir, columns) = columns();
        let low = touch(&dir, "low.txt");
        let high = touch(&dir, "high.txt");
        let none = touch(&dir, "none.txt");
        columns.set_attribute(&low, "rating", "2").unwrap();
        columns.set_attribute(&high, "rating", "5").unwrap();

        assert_eq!(columns.compare_by_attribute(&low, &high, "rating"), Ordering::Less);
        assert_eq!(columns.compare_by_attribute(&high, &low, "rating"), Ordering::Greater);
        assert_eq!(columns.compare_by_attribute(&none, &low, "rating"), Ordering::Less);
        assert_eq!(columns.compare_by_attribute(&none, &none, "rating"), Ordering::Equal);
    }
}
