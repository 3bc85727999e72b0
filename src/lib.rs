//! finderz - Unified file metadata for file browsers
//!
//! finderz reads metadata that lives outside a file's own contents or in
//! formats a browser does not understand natively, merges it into one
//! field model and renders it as sortable columns:
//!
//! - Finder layout from macOS `.DS_Store` files (view style, icon
//!   positions, labels, comments)
//! - AI generation parameters embedded in PNG text chunks
//! - A persistent cache in the file's own extended attributes
//!
//! # Architecture
//!
//! - [`host`] - Column interface for the embedding file browser
//! - [`engine`] - Runs every metadata source, merges by precedence, caches
//! - [`fields`] - Field model, registry, formatting and sort order
//! - [`dsstore`] - `.DS_Store` decoder and per-directory cache
//! - [`png`] - PNG text-chunk extraction and generation-parameter parsing
//! - [`attributes`] - Namespaced extended attribute cache
//! - [`core`] - Strong types and configuration
//!
//! # Correctness Invariants
//!
//! 1. Decoders never panic on untrusted input; malformed data is an error
//!    or is skipped with a warning
//! 2. An aggregate holds at most one field per key
//! 3. Every persisted attribute carries the configured namespace prefix
//!
//! # Logging
//!
//! Diagnostics go through the [`log`] facade. The library installs no
//! logger; hosts choose one.

pub mod attributes;
pub mod core;
pub mod dsstore;
pub mod engine;
pub mod fields;
pub mod host;
pub mod png;

pub use crate::core::config::Config;
pub use engine::{EngineError, Extractor, MetadataEngine};
pub use fields::{FieldSource, MetadataField, UniversalMetadata};
pub use host::{FileHost, MetadataColumns};
