//! fields::format
//!
//! Display strings and sort order for field values.

use std::cmp::Ordering;

use super::registry::FieldKind;
use super::{MetadataField, TypedValue};
use crate::dsstore::color_label_name;

/// Longest text shown before truncation, in characters.
pub const MAX_DISPLAY_CHARS: usize = 100;

/// Characters kept when truncating, before the `...`.
const TRUNCATED_CHARS: usize = MAX_DISPLAY_CHARS - 3;

const FULL_STAR: char = '★';
const EMPTY_STAR: char = '☆';
const CHECK_MARK: &str = "✓";

/// Render `field` for a column cell.
pub fn format_field(field: &MetadataField) -> String {
    match (field.kind, field.typed) {
        (FieldKind::Rating, Some(TypedValue::Number(n))) => stars(n),
        (FieldKind::Flag, Some(TypedValue::Number(n))) => {
            if n != 0.0 {
                CHECK_MARK.to_string()
            } else {
                String::new()
            }
        }
        (FieldKind::ColorLabel, Some(TypedValue::Number(n))) => {
            match u8::try_from(n as i64).ok().and_then(color_label_name) {
                Some(name) => name.to_string(),
                None => truncate(&field.value),
            }
        }
        (_, Some(TypedValue::Date(d))) => d.format("%Y-%m-%d %H:%M").to_string(),
        (_, Some(TypedValue::Number(n))) => number(n),
        (_, None) => truncate(&field.value),
    }
}

fn stars(n: f64) -> String {
    let filled = n.round().clamp(0.0, 5.0) as usize;
    let mut out = String::with_capacity(5 * FULL_STAR.len_utf8());
    out.extend(std::iter::repeat(FULL_STAR).take(filled));
    out.extend(std::iter::repeat(EMPTY_STAR).take(5 - filled));
    out
}

fn number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n:.2}")
    }
}

/// Shorten text over [`MAX_DISPLAY_CHARS`] to 97 characters plus `...`.
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DISPLAY_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(TRUNCATED_CHARS).collect();
    out.push_str("...");
    out
}

/// Sort order for two optional fields of the same key.
///
/// Missing values sort first. Two numbers or two dates compare by value;
/// anything else compares as case-insensitive text.
pub fn compare_fields(a: Option<&MetadataField>, b: Option<&MetadataField>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.typed, b.typed) {
            (Some(TypedValue::Number(x)), Some(TypedValue::Number(y))) => x.total_cmp(&y),
            (Some(TypedValue::Date(x)), Some(TypedValue::Date(y))) => x.cmp(&y),
            _ => compare_text(&a.value, &b.value),
        },
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    let fold = |s: &str| s.to_lowercase();
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}
