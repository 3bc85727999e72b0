//! attributes
//!
//! Durable per-file metadata in filesystem extended attributes.
//!
//! # Layers
//!
//! - [`AttributeStore`] - raw backend trait
//! - [`XattrStore`] - the real filesystem (unix)
//! - [`MemoryAttributeStore`] - in-process, for tests and unsupported filesystems
//! - [`AttributeCache`] - namespacing, UTF-8 values, typed helpers
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use finderz::attributes::{AttributeCache, XattrStore};
//!
//! let cache = AttributeCache::new(Arc::new(XattrStore::new()));
//! cache.set_rating(path, 4)?;
//! assert_eq!(cache.rating(path)?, Some(4));
//! ```

pub mod cache;
pub mod memory_store;
pub mod traits;
pub mod xattr_store;

pub use cache::{
    clamp_rating, AttributeCache, AI_MODEL_KEY, AI_PROMPT_KEY, DEFAULT_NAMESPACE, MAX_RATING,
    RATING_KEY,
};
pub use memory_store::MemoryAttributeStore;
pub use traits::{AttrError, AttributeStore};
pub use xattr_store::XattrStore;
