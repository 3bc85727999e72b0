//! fields::registry
//!
//! The closed table of known metadata keys.
//!
//! Each entry fixes how a key is displayed, typed, compared and cached.
//! Keys not in the table are still accepted and treated as plain text in
//! the `Other` category.

use super::FieldSource;

/// How a field's value is typed, formatted and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Date,
    /// Stars, `0..=5`.
    Rating,
    /// Boolean shown as a check mark.
    Flag,
    /// Finder label index, `0..=7`.
    ColorLabel,
}

/// Registry entry for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub kind: FieldKind,
    pub source: FieldSource,
    /// Attribute cache key, for fields that persist.
    pub cache_key: Option<&'static str>,
    /// Freshly extracted values are written back to the attribute cache.
    pub write_back: bool,
}

pub const CATEGORY_RATING: &str = "Rating";
pub const CATEGORY_AI: &str = "AI Generation";
pub const CATEGORY_FINDER: &str = "Finder";
pub const CATEGORY_ATTRIBUTES: &str = "Attributes";
pub const CATEGORY_OTHER: &str = "Other";

const fn spec(
    key: &'static str,
    display_name: &'static str,
    category: &'static str,
    kind: FieldKind,
    source: FieldSource,
) -> FieldSpec {
    FieldSpec {
        key,
        display_name,
        category,
        kind,
        source,
        cache_key: None,
        write_back: false,
    }
}

const fn cached(mut s: FieldSpec, cache_key: &'static str, write_back: bool) -> FieldSpec {
    s.cache_key = Some(cache_key);
    s.write_back = write_back;
    s
}

use FieldKind::*;
use FieldSource::{AiWorkflow, DsStore, PngText, Xattr};

static REGISTRY: &[FieldSpec] = &[
    cached(spec("rating", "Rating", CATEGORY_RATING, Rating, Xattr), "rating", false),
    cached(spec("ai_prompt", "AI Prompt", CATEGORY_AI, Text, PngText), "ai.prompt", true),
    spec("ai_negative_prompt", "Negative Prompt", CATEGORY_AI, Text, PngText),
    cached(spec("ai_model", "AI Model", CATEGORY_AI, Text, PngText), "ai.model", true),
    spec("ai_sampler", "Sampler", CATEGORY_AI, Text, PngText),
    spec("ai_scheduler", "Scheduler", CATEGORY_AI, Text, AiWorkflow),
    spec("ai_steps", "Steps", CATEGORY_AI, Integer, PngText),
    spec("ai_cfg", "CFG Scale", CATEGORY_AI, Float, PngText),
    spec("ai_seed", "Seed", CATEGORY_AI, Integer, PngText),
    spec("ai_size", "Generated Size", CATEGORY_AI, Text, PngText),
    spec("ai_tool", "AI Tool", CATEGORY_AI, Text, PngText),
    cached(spec("keywords", "Keywords", CATEGORY_ATTRIBUTES, Text, Xattr), "keywords", false),
    spec("xattr_count", "XAttrs", CATEGORY_ATTRIBUTES, Integer, Xattr),
    spec("mac_color_label", "Label", CATEGORY_FINDER, ColorLabel, DsStore),
    spec("mac_comment", "Comments", CATEGORY_FINDER, Text, DsStore),
    spec("mac_icon_position", "Icon Position", CATEGORY_FINDER, Text, DsStore),
    spec("mac_view_style", "View Style", CATEGORY_FINDER, Text, DsStore),
    spec("mac_icon_size", "Icon Size", CATEGORY_FINDER, Integer, DsStore),
    spec("mac_text_size", "Text Size", CATEGORY_FINDER, Integer, DsStore),
    spec("mac_sort_column", "Sort By", CATEGORY_FINDER, Text, DsStore),
    spec("mac_background", "Background", CATEGORY_FINDER, Text, DsStore),
    spec("mac_folder_modified", "Finder Modified", CATEGORY_FINDER, Date, DsStore),
    spec("has_mac_metadata", "Finder Data", CATEGORY_FINDER, Flag, DsStore),
];

/// All registered entries, in display order.
pub fn all() -> &'static [FieldSpec] {
    REGISTRY
}

/// Registered keys, in display order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|s| s.key)
}

/// Entry for `key`, if registered.
pub fn lookup(key: &str) -> Option<&'static FieldSpec> {
    REGISTRY.iter().find(|s| s.key == key)
}

/// Entry for the field cached under attribute key `cache_key`.
pub fn by_cache_key(cache_key: &str) -> Option<&'static FieldSpec> {
    REGISTRY.iter().find(|s| s.cache_key == Some(cache_key))
}

/// Display name, category and kind for `key`, falling back to plain text.
pub fn describe(key: &str) -> (&str, &'static str, FieldKind) {
    match lookup(key) {
        Some(spec) => (spec.display_name, spec.category, spec.kind),
        None => (key, CATEGORY_OTHER, FieldKind::Text),
    }
}
