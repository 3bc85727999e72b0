//! engine::extractor
//!
//! The capability trait every metadata source implements.
//!
//! # Invariants
//!
//! - `supports()` is cheap (path inspection only, no parsing)
//! - `extract()` returns fields for this source alone; merging and
//!   precedence belong to the engine
//! - A failure affects only this source; the engine logs it and moves on

use std::path::Path;

use thiserror::Error;

use crate::attributes::AttrError;
use crate::dsstore::DsStoreError;
use crate::fields::MetadataField;

/// Errors an extractor may report.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    DsStore(#[from] DsStoreError),

    #[error(transparent)]
    Attribute(#[from] AttrError),

    #[error("{0}")]
    Other(String),
}

/// A pluggable metadata source.
///
/// # Example
///
/// ```ignore
/// use finderz::engine::{Extractor, ExtractError};
/// use finderz::fields::{FieldSource, MetadataField};
///
/// #[derive(Debug)]
/// struct SidecarSource;
///
/// impl Extractor for SidecarSource {
///     fn name(&self) -> &'static str { "sidecar" }
///
///     fn supports(&self, path: &Path) -> bool {
///         path.with_extension("xmp").exists()
///     }
///
///     fn extract(&self, path: &Path) -> Result<Vec<MetadataField>, ExtractError> {
///         Ok(vec![MetadataField::new("keywords", "beach", FieldSource::Exif)])
///     }
/// }
/// ```
pub trait Extractor: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this source can say anything about `path`.
    fn supports(&self, path: &Path) -> bool;

    /// Fields this source knows for `path`.
    fn extract(&self, path: &Path) -> Result<Vec<MetadataField>, ExtractError>;
}
