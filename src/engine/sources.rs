//! engine::sources
//!
//! The built-in extractors, lowest precedence first:
//!
//! 1. [`AttributeSource`] - values cached in extended attributes
//! 2. [`DsStoreSource`] - Finder layout from `.DS_Store`
//! 3. [`PngSource`] - PNG text chunks and AI generation parameters

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use super::extractor::{ExtractError, Extractor};
use crate::attributes::{clamp_rating, AttributeCache, RATING_KEY};
use crate::dsstore::{DirectoryCache, DirectoryMetadataRecord, Setting};
use crate::fields::{registry, FieldSource, MetadataField};
use crate::png::{PngTextExtractor, TOOL_KEY};

/// Fields persisted in the attribute cache.
#[derive(Debug, Clone)]
pub struct AttributeSource {
    cache: AttributeCache,
}

impl AttributeSource {
    pub fn new(cache: AttributeCache) -> Self {
        Self { cache }
    }
}

impl Extractor for AttributeSource {
    fn name(&self) -> &'static str {
        "attributes"
    }

    fn supports(&self, _path: &Path) -> bool {
        true
    }

    fn extract(&self, path: &Path) -> Result<Vec<MetadataField>, ExtractError> {
        let keys = match self.cache.list_all(path) {
            Ok(keys) => keys,
            Err(e) if e.is_unsupported() => {
                debug!("no attribute support for {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut fields = Vec::new();
        for key in &keys {
            // An unreadable value skips only its own key.
            let value = match self.cache.get(path, key) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    warn!("skipping attribute {key} on {}: {e}", path.display());
                    continue;
                }
            };
            match registry::by_cache_key(key) {
                Some(spec) if key == RATING_KEY => {
                    if let Some(rating) = normalize_rating(&value) {
                        fields.push(MetadataField::new(spec.key, rating, FieldSource::Xattr));
                    }
                }
                Some(spec) => fields.push(MetadataField::new(spec.key, value, FieldSource::Xattr)),
                None => {
                    let field_key = key.replace('.', "_");
                    if registry::lookup(&field_key).is_some() {
                        debug!("attribute {key} shadows a registered field, skipped");
                        continue;
                    }
                    fields.push(
                        MetadataField::new(&field_key, value, FieldSource::Xattr)
                            .in_category(registry::CATEGORY_ATTRIBUTES),
                    );
                }
            }
        }
        if !keys.is_empty() {
            fields.push(MetadataField::new(
                "xattr_count",
                keys.len().to_string(),
                FieldSource::Xattr,
            ));
        }
        Ok(fields)
    }
}

/// Finder metadata from the parent directory's `.DS_Store`, and for
/// directories from their own.
#[derive(Debug, Clone)]
pub struct DsStoreSource {
    directories: Arc<DirectoryCache>,
}

impl DsStoreSource {
    pub fn new(directories: Arc<DirectoryCache>) -> Self {
        Self { directories }
    }
}

impl Extractor for DsStoreSource {
    fn name(&self) -> &'static str {
        "ds_store"
    }

    fn supports(&self, path: &Path) -> bool {
        path.parent().is_some() || path.is_dir()
    }

    fn extract(&self, path: &Path) -> Result<Vec<MetadataField>, ExtractError> {
        let parent = match path.parent() {
            Some(parent) => self.directories.get(parent)?,
            None => None,
        };

        let mut fields = Vec::new();
        if let (Some(record), Some(name)) = (&parent, path.file_name().and_then(|n| n.to_str())) {
            per_file_fields(record, name, &mut fields);
        }

        let folder = if path.is_dir() {
            self.directories.get(path)?
        } else {
            parent
        };
        if let Some(record) = folder {
            folder_fields(&record, &mut fields);
        }
        Ok(fields)
    }
}

fn per_file_fields(record: &DirectoryMetadataRecord, name: &str, out: &mut Vec<MetadataField>) {
    let field = |key: &str, value: String| MetadataField::new(key, value, FieldSource::DsStore);
    if let Some(pos) = record.icon_position(name) {
        out.push(field("mac_icon_position", format!("{}, {}", pos.x, pos.y)));
    }
    if let Some(label) = record.color_label(name) {
        out.push(field("mac_color_label", label.to_string()));
    }
    if let Some(comment) = record.comment(name) {
        out.push(field("mac_comment", comment.to_string()));
    }
}

fn folder_fields(record: &DirectoryMetadataRecord, out: &mut Vec<MetadataField>) {
    let setting = |key: &str, value: String, which: Setting| {
        let f = MetadataField::new(key, value, FieldSource::DsStore);
        if record.is_explicit(which) {
            f
        } else {
            f.defaulted()
        }
    };
    out.push(setting(
        "mac_view_style",
        record.view_style().to_string(),
        Setting::ViewStyle,
    ));
    out.push(setting(
        "mac_icon_size",
        record.icon_size().to_string(),
        Setting::IconSize,
    ));
    out.push(setting(
        "mac_text_size",
        record.text_size().to_string(),
        Setting::TextSize,
    ));
    out.push(setting(
        "mac_sort_column",
        record.sort_column().to_string(),
        Setting::SortColumn,
    ));
    if let Some(background) = record.background_image() {
        out.push(MetadataField::new(
            "mac_background",
            background,
            FieldSource::DsStore,
        ));
    }
    if let Some(modified) = record.modified() {
        out.push(MetadataField::new(
            "mac_folder_modified",
            modified.to_rfc3339(),
            FieldSource::DsStore,
        ));
    }
    out.push(MetadataField::new(
        "has_mac_metadata",
        "true",
        FieldSource::DsStore,
    ));
}

/// PNG text key → field key for derived generation parameters.
const PNG_FIELD_KEYS: &[(&str, &str)] = &[
    ("prompt", "ai_prompt"),
    ("negative_prompt", "ai_negative_prompt"),
    ("model", "ai_model"),
    ("sampler", "ai_sampler"),
    ("scheduler", "ai_scheduler"),
    ("steps", "ai_steps"),
    ("cfg_scale", "ai_cfg"),
    ("seed", "ai_seed"),
    ("size", "ai_size"),
    (TOOL_KEY, "ai_tool"),
];

/// Text chunks and generation parameters from PNG files.
#[derive(Debug, Clone, Default)]
pub struct PngSource {
    extractor: PngTextExtractor,
}

impl PngSource {
    pub fn new(extractor: PngTextExtractor) -> Self {
        Self { extractor }
    }
}

impl Extractor for PngSource {
    fn name(&self) -> &'static str {
        "png"
    }

    fn supports(&self, path: &Path) -> bool {
        PngTextExtractor::supports(path)
    }

    fn extract(&self, path: &Path) -> Result<Vec<MetadataField>, ExtractError> {
        Ok(png_fields(self.extractor.extract(path)))
    }
}

/// Map extracted PNG text to fields.
///
/// Generation parameters become `ai_*` fields, tagged as workflow data when
/// ComfyUI wrote them. Other chunks become `png_<keyword>` text fields.
pub(crate) fn png_fields(mut text: BTreeMap<String, String>) -> Vec<MetadataField> {
    let source = match text.get(TOOL_KEY).map(String::as_str) {
        Some("ComfyUI") => FieldSource::AiWorkflow,
        _ => FieldSource::PngText,
    };
    let mut fields = Vec::new();
    for (from, to) in PNG_FIELD_KEYS {
        if let Some(value) = text.remove(*from) {
            if !value.trim().is_empty() {
                fields.push(MetadataField::new(to, value, source));
            }
        }
    }
    for (keyword, value) in text {
        let key = format!("png_{}", sanitize_keyword(&keyword));
        fields.push(MetadataField::new(&key, value, FieldSource::PngText));
    }
    fields
}

fn sanitize_keyword(keyword: &str) -> String {
    keyword
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Clamp a cached rating string; `None` when it is not a number.
pub(crate) fn normalize_rating(raw: &str) -> Option<String> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(|n| clamp_rating(n).to_string())
}
