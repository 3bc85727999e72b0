//! fields
//!
//! The unified field model every extractor produces.
//!
//! A [`UniversalMetadata`] holds at most one [`MetadataField`] per key.
//! Fields carry the raw string, an optional typed value for sorting, and
//! where they came from.

pub mod format;
pub mod registry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

pub use format::{compare_fields, format_field};
pub use registry::{FieldKind, FieldSpec};

/// Where a field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSource {
    /// Finder `.DS_Store`.
    DsStore,
    /// Extended attribute cache.
    Xattr,
    /// PNG text chunk.
    PngText,
    /// Parsed AI workflow graph.
    AiWorkflow,
    /// EXIF/IPTC; no extractor ships yet.
    Exif,
}

impl std::fmt::Display for FieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldSource::DsStore => "ds_store",
            FieldSource::Xattr => "xattr",
            FieldSource::PngText => "png_text",
            FieldSource::AiWorkflow => "ai_workflow",
            FieldSource::Exif => "exif",
        };
        f.write_str(name)
    }
}

/// Sort-ready typed view of a field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypedValue {
    Number(f64),
    Date(DateTime<Utc>),
}

/// One metadata value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataField {
    pub key: String,
    /// Raw value as extracted or stored.
    pub value: String,
    pub typed: Option<TypedValue>,
    pub display_name: String,
    pub category: String,
    pub kind: FieldKind,
    pub source: FieldSource,
    pub sortable: bool,
    /// The value is a documented default, not read from the source.
    pub defaulted: bool,
}

impl MetadataField {
    /// Build a field, typing the value according to the registry.
    ///
    /// A value that does not parse as its registered kind keeps `typed`
    /// empty and sorts as text.
    pub fn new(key: &str, value: impl Into<String>, source: FieldSource) -> Self {
        let value = value.into();
        let (display_name, category, kind) = registry::describe(key);
        let typed = type_value(kind, &value);
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            category: category.to_string(),
            kind,
            source,
            sortable: true,
            defaulted: false,
            typed,
            value,
        }
    }

    /// Mark the value as a default fill.
    pub fn defaulted(mut self) -> Self {
        self.defaulted = true;
        self
    }

    pub fn in_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.typed {
            Some(TypedValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self.typed {
            Some(TypedValue::Date(d)) => Some(d),
            _ => None,
        }
    }

    /// Display form; see [`format_field`].
    pub fn formatted(&self) -> String {
        format_field(self)
    }
}

fn type_value(kind: FieldKind, value: &str) -> Option<TypedValue> {
    let value = value.trim();
    match kind {
        FieldKind::Text => None,
        FieldKind::Date => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|d| TypedValue::Date(d.with_timezone(&Utc))),
        FieldKind::Flag => match value {
            "1" | "true" | "yes" => Some(TypedValue::Number(1.0)),
            "0" | "false" | "no" | "" => Some(TypedValue::Number(0.0)),
            _ => None,
        },
        FieldKind::Integer | FieldKind::Float | FieldKind::Rating | FieldKind::ColorLabel => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(TypedValue::Number),
    }
}

/// Every field known for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct UniversalMetadata {
    path: PathBuf,
    fields: BTreeMap<String, MetadataField>,
    categories: Vec<String>,
    extracted_at: DateTime<Utc>,
}

impl UniversalMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fields: BTreeMap::new(),
            categories: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    /// Field for `key`, if any source supplied one.
    pub fn field(&self, key: &str) -> Option<&MetadataField> {
        self.fields.get(key)
    }

    /// Raw value for `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.field(key).map(|f| f.value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = &MetadataField> {
        self.fields.values()
    }

    /// Fields in `category`, in key order.
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a MetadataField> {
        self.fields.values().filter(move |f| f.category == category)
    }

    /// Categories in the order their first field arrived.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extracted_at(&self) -> DateTime<Utc> {
        self.extracted_at
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge `field` in, replacing any existing field for its key.
    ///
    /// A defaulted field never replaces an explicit one. Returns whether the
    /// field was taken.
    pub fn merge(&mut self, field: MetadataField) -> bool {
        if field.defaulted {
            if let Some(existing) = self.fields.get(&field.key) {
                if !existing.defaulted {
                    return false;
                }
            }
        }
        if !self.categories.iter().any(|c| *c == field.category) {
            self.categories.push(field.category.clone());
        }
        self.fields.insert(field.key.clone(), field);
        true
    }

    /// Merge every field, in order.
    pub fn merge_all(&mut self, fields: impl IntoIterator<Item = MetadataField>) {
        for field in fields {
            self.merge(field);
        }
    }
}
