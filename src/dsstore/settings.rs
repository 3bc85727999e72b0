//! dsstore::settings
//!
//! Turns raw records into a [`DirectoryMetadataRecord`].
//!
//! Per-file records (`Iloc`, `lclr`, `cmmt`) land in the filename maps.
//! Directory records (filename `.`) are gathered per source first and merged
//! at the end so the outcome does not depend on record order:
//!
//! - `vmod`/`vstl` beat the view code stored in `fwi0`
//! - `icvp` beats `lsvp`/`lsvP` for icon and text sizes
//! - `lsvp`/`lsvP` `sortColumn` beats `icvp` `arrangeBy`
//! - `bwsp` `WindowBounds` beats the `fwi0` rectangle
//!
//! Anything malformed is logged and skipped; the affected setting stays
//! unset and reads back as its default.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::model::{DirectoryMetadataRecord, IconPosition, ViewStyle, WindowBounds};
use super::plist::{self, PlistValue};
use super::reader::ByteReader;
use super::record::{Record, RecordValue};
use crate::core::types::FourCC;

/// Seconds from 1904-01-01 (Mac epoch) to 1970-01-01.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Record types we recognize but do not surface.
const IGNORED_CODES: &[&[u8; 4]] = &[
    b"BKGD", b"ICVO", b"LSVO", b"dscl", b"dilc", b"extn", b"fwsw", b"fwvh", b"icgo", b"icsp",
    b"info", b"logS", b"lg1S", b"lssp", b"ph1S", b"phyS", b"ptbL", b"ptbN", b"vSrn",
    b"GRP0", b"bRsV", b"clip", b"pBBk", b"pBB0",
];

/// Settings carried by one embedded view dictionary.
#[derive(Debug, Default)]
struct ViewSettings {
    icon_size: Option<u32>,
    text_size: Option<u32>,
    label_on_bottom: Option<bool>,
    show_icon_preview: Option<bool>,
    show_item_info: Option<bool>,
    sort_column: Option<String>,
    background_image: Option<String>,
}

#[derive(Debug, Default)]
struct Accumulator {
    view_mode: Option<ViewStyle>,
    window_view: Option<ViewStyle>,
    icon_view: ViewSettings,
    list_view: ViewSettings,
    browser_bounds: Option<WindowBounds>,
    window_rect: Option<WindowBounds>,
    picture_background: Option<String>,
    modified: Option<DateTime<Utc>>,
    modified_fallback: Option<DateTime<Utc>>,
}

/// Interpret `records` (already in key order) into a directory record.
pub(crate) fn interpret(records: Vec<Record>) -> DirectoryMetadataRecord {
    let mut out = DirectoryMetadataRecord {
        record_count: records.len(),
        ..Default::default()
    };
    let mut acc = Accumulator::default();

    for record in records {
        apply(&mut out, &mut acc, record);
    }
    finish(&mut out, acc);
    out
}

fn apply(out: &mut DirectoryMetadataRecord, acc: &mut Accumulator, record: Record) {
    let Record {
        filename,
        code,
        value,
    } = record;
    let is_dir = filename == ".";

    match (&code.bytes(), value) {
        (b"Iloc", RecordValue::Blob(bytes)) => match icon_location(&bytes) {
            Some(pos) => {
                out.icon_positions.insert(filename, pos);
            }
            None => skip(&filename, code, "short icon location"),
        },
        (b"lclr", value) => match value.as_int().and_then(|v| u8::try_from(v).ok()) {
            Some(label) if label <= 7 => {
                out.color_labels.insert(filename, label);
            }
            _ => skip(&filename, code, "color label out of range"),
        },
        (b"cmmt", RecordValue::Ustr(text)) => {
            out.comments.insert(filename, text);
        }
        (b"vmod" | b"vstl", value) if is_dir => match view_code(&value) {
            Some(style) => acc.view_mode = Some(style),
            None => skip(&filename, code, "unrecognized view mode"),
        },
        (b"fwi0", RecordValue::Blob(bytes)) if is_dir => match window_info(&bytes) {
            Some((rect, view)) => {
                acc.window_rect = Some(rect);
                if view.is_some() {
                    acc.window_view = view;
                }
            }
            None => skip(&filename, code, "short window info"),
        },
        (b"icvp", RecordValue::Blob(bytes)) if is_dir => {
            if let Some(dict) = dictionary(&filename, code, &bytes) {
                acc.icon_view = view_settings(&dict, true);
            }
        }
        (b"lsvp" | b"lsvP", RecordValue::Blob(bytes)) if is_dir => {
            if let Some(dict) = dictionary(&filename, code, &bytes) {
                // lsvP is the newer form; keep whichever supplied a value.
                let parsed = view_settings(&dict, false);
                merge_view(&mut acc.list_view, parsed);
            }
        }
        (b"bwsp", RecordValue::Blob(bytes)) if is_dir => {
            if let Some(dict) = dictionary(&filename, code, &bytes) {
                match dict.get("WindowBounds").and_then(PlistValue::as_str) {
                    Some(text) => match parse_bounds(text) {
                        Some(bounds) => acc.browser_bounds = Some(bounds),
                        None => skip(&filename, code, "unparseable WindowBounds"),
                    },
                    None => debug!("DS_Store bwsp has no WindowBounds"),
                }
            }
        }
        (b"pict", RecordValue::Blob(bytes)) if is_dir => match alias_filename(&bytes) {
            Some(name) => acc.picture_background = Some(name),
            None => skip(&filename, code, "unreadable picture alias"),
        },
        (b"moDD", RecordValue::Dutc(ts)) if is_dir => acc.modified = mac_time(ts),
        (b"modD", RecordValue::Dutc(ts)) if is_dir => acc.modified_fallback = mac_time(ts),
        (bytes, _) if IGNORED_CODES.contains(&bytes) => {
            debug!("DS_Store: ignoring '{}' for {:?}", code, filename);
        }
        _ => skip(&filename, code, "unhandled record type or payload shape"),
    }
}

fn finish(out: &mut DirectoryMetadataRecord, acc: Accumulator) {
    let Accumulator {
        view_mode,
        window_view,
        icon_view,
        list_view,
        browser_bounds,
        window_rect,
        picture_background,
        modified,
        modified_fallback,
    } = acc;

    out.view_style = view_mode.or(window_view);
    out.icon_size = icon_view.icon_size.or(list_view.icon_size);
    out.text_size = icon_view.text_size.or(list_view.text_size);
    out.label_on_bottom = icon_view.label_on_bottom;
    out.show_icon_preview = icon_view.show_icon_preview.or(list_view.show_icon_preview);
    out.show_item_info = icon_view.show_item_info;
    out.sort_column = list_view.sort_column.or(icon_view.sort_column);
    out.background_image = icon_view.background_image.or(picture_background);
    out.window_bounds = browser_bounds.or(window_rect);
    out.modified = modified.or(modified_fallback);
}

fn skip(filename: &str, code: FourCC, why: &str) {
    warn!("DS_Store: skipping '{}' record for {:?}: {}", code, filename, why);
}

fn dictionary(
    filename: &str,
    code: FourCC,
    bytes: &[u8],
) -> Option<BTreeMap<String, PlistValue>> {
    match plist::parse_dict(bytes) {
        Ok(dict) => Some(dict),
        Err(e) => {
            skip(filename, code, &e.to_string());
            None
        }
    }
}

fn icon_location(bytes: &[u8]) -> Option<IconPosition> {
    let mut r = ByteReader::new(bytes);
    let x = r.i32("icon x").ok()?;
    let y = r.i32("icon y").ok()?;
    Some(IconPosition { x, y })
}

fn view_code(value: &RecordValue) -> Option<ViewStyle> {
    match value {
        RecordValue::Type(code) => ViewStyle::from_code(*code),
        RecordValue::Blob(bytes) if bytes.len() == 4 => {
            ViewStyle::from_code(FourCC::new([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        _ => None,
    }
}

/// `fwi0`: u16 top, left, bottom, right, then an optional view code.
fn window_info(bytes: &[u8]) -> Option<(WindowBounds, Option<ViewStyle>)> {
    let mut r = ByteReader::new(bytes);
    let top = r.u16("window top").ok()?;
    let left = r.u16("window left").ok()?;
    let bottom = r.u16("window bottom").ok()?;
    let right = r.u16("window right").ok()?;
    let view = r.fourcc("window view").ok().and_then(ViewStyle::from_code);
    let rect = WindowBounds {
        x: i32::from(left),
        y: i32::from(top),
        width: u32::from(right.saturating_sub(left)),
        height: u32::from(bottom.saturating_sub(top)),
    };
    Some((rect, view))
}

fn view_settings(dict: &BTreeMap<String, PlistValue>, icon_view: bool) -> ViewSettings {
    let size = |key: &str, range: std::ops::RangeInclusive<u32>| {
        let v = dict.get(key)?.as_f64()?;
        if !v.is_finite() {
            return None;
        }
        let rounded = v.round();
        if rounded < 0.0 || rounded > f64::from(u32::MAX) {
            return None;
        }
        let n = rounded as u32;
        range.contains(&n).then_some(n)
    };
    let flag = |key: &str| dict.get(key).and_then(PlistValue::as_bool);

    let mut settings = ViewSettings {
        icon_size: size("iconSize", 8..=1024),
        text_size: size("textSize", 6..=64),
        show_icon_preview: flag("showIconPreview"),
        ..Default::default()
    };

    if icon_view {
        settings.label_on_bottom = flag("labelOnBottom");
        settings.show_item_info = flag("showItemInfo");
        settings.sort_column = dict
            .get("arrangeBy")
            .and_then(PlistValue::as_str)
            .filter(|s| !s.is_empty() && *s != "none")
            .map(str::to_owned);
        // backgroundType 2 means a picture.
        let picture = dict
            .get("backgroundType")
            .and_then(PlistValue::as_f64)
            .is_some_and(|t| t == 2.0);
        if picture {
            settings.background_image = dict
                .get("backgroundImageAlias")
                .and_then(PlistValue::as_data)
                .and_then(alias_filename);
        }
    } else {
        settings.sort_column = dict
            .get("sortColumn")
            .and_then(PlistValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
    }
    settings
}

fn merge_view(into: &mut ViewSettings, from: ViewSettings) {
    into.icon_size = into.icon_size.or(from.icon_size);
    into.text_size = into.text_size.or(from.text_size);
    into.show_icon_preview = into.show_icon_preview.or(from.show_icon_preview);
    into.sort_column = into.sort_column.take().or(from.sort_column);
}

/// Parse `{{x, y}, {w, h}}`.
pub(crate) fn parse_bounds(text: &str) -> Option<WindowBounds> {
    let numbers: Vec<&str> = text
        .split(|c: char| c == '{' || c == '}' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if numbers.len() != 4 {
        return None;
    }
    let int = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    let x = int(numbers[0])?;
    let y = int(numbers[1])?;
    let w = int(numbers[2])?;
    let h = int(numbers[3])?;
    if w < 0.0 || h < 0.0 {
        return None;
    }
    Some(WindowBounds {
        x: x as i32,
        y: y as i32,
        width: w as u32,
        height: h as u32,
    })
}

/// Filename stored in a version 2 alias record: a Pascal string at byte 50.
pub(crate) fn alias_filename(alias: &[u8]) -> Option<String> {
    const NAME_OFFSET: usize = 50;
    let len = *alias.get(NAME_OFFSET)? as usize;
    if len == 0 || len > 63 {
        return None;
    }
    let name = alias.get(NAME_OFFSET + 1..NAME_OFFSET + 1 + len)?;
    Some(String::from_utf8_lossy(name).into_owned())
}

/// `dutc` counts 1/65536 seconds since 1904-01-01.
fn mac_time(ticks: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(ticks >> 16).ok()? - MAC_EPOCH_OFFSET;
    let frac = ticks & 0xffff;
    let nanos = ((frac * 1_000_000_000) >> 16) as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsstore::model::Setting;

    fn rec(name: &str, code: &[u8; 4], value: RecordValue) -> Record {
        Record {
            filename: name.into(),
            code: FourCC::new(*code),
            value,
        }
    }

    fn iloc(x: i32, y: i32) -> RecordValue {
        let mut b = x.to_be_bytes().to_vec();
        b.extend_from_slice(&y.to_be_bytes());
        b.extend_from_slice(&[0xff; 8]);
        RecordValue::Blob(b)
    }

    #[test]
    fn per_file_records() {
        let out = interpret(vec![
            rec("a.png", b"Iloc", iloc(120, -40)),
            rec("a.png", b"cmmt", RecordValue::Ustr("keep".into())),
            rec("a.png", b"lclr", RecordValue::Long(6)),
            rec("b.txt", b"lclr", RecordValue::Long(9)),
            rec("c", b"Iloc", RecordValue::Blob(vec![0, 1])),
        ]);
        assert_eq!(out.icon_position("a.png"), Some(IconPosition { x: 120, y: -40 }));
        assert_eq!(out.comment("a.png"), Some("keep"));
        assert_eq!(out.color_label("a.png"), Some(6));
        assert_eq!(out.color_label("b.txt"), None);
        assert_eq!(out.icon_position("c"), None);
        assert_eq!(out.record_count(), 5);
    }

    #[test]
    fn view_mode_beats_window_info() {
        let mut fwi = Vec::new();
        for v in [10u16, 20, 410, 620] {
            fwi.extend_from_slice(&v.to_be_bytes());
        }
        fwi.extend_from_slice(b"clmv");
        let out = interpret(vec![
            rec(".", b"fwi0", RecordValue::Blob(fwi.clone())),
            rec(".", b"vmod", RecordValue::Type(FourCC::new(*b"Nlsv"))),
        ]);
        assert_eq!(out.view_style(), ViewStyle::List);
        assert_eq!(
            out.window_bounds(),
            WindowBounds {
                x: 20,
                y: 10,
                width: 600,
                height: 400
            }
        );

        let only_window = interpret(vec![rec(".", b"fwi0", RecordValue::Blob(fwi))]);
        assert_eq!(only_window.view_style(), ViewStyle::Column);
    }

    #[test]
    fn unknown_view_code_keeps_default() {
        let out = interpret(vec![rec(".", b"vmod", RecordValue::Type(FourCC::new(*b"what")))]);
        assert_eq!(out.view_style(), ViewStyle::Icon);
        assert!(!out.is_explicit(Setting::ViewStyle));
    }

    #[test]
    fn malformed_plist_is_skipped() {
        let out = interpret(vec![
            rec(".", b"icvp", RecordValue::Blob(b"bplist00garbage".to_vec())),
            rec(".", b"zzzz", RecordValue::Bool(true)),
        ]);
        assert_eq!(out.icon_size(), 64);
        assert!(!out.is_explicit(Setting::IconSize));
    }

    #[test]
    fn parses_window_bounds_strings() {
        assert_eq!(
            parse_bounds("{{100, 200}, {800, 600}}"),
            Some(WindowBounds {
                x: 100,
                y: 200,
                width: 800,
                height: 600
            })
        );
        assert_eq!(parse_bounds("{{1, 2}, {3}}"), None);
        assert_eq!(parse_bounds("{{1, 2}, {-3, 4}}"), None);
    }

    #[test]
    fn alias_name_at_fixed_offset() {
        let mut alias = vec![0u8; 50];
        alias.push(7);
        alias.extend_from_slice(b"bg.tiff");
        alias.extend_from_slice(&[0; 20]);
        assert_eq!(alias_filename(&alias).as_deref(), Some("bg.tiff"));
        assert_eq!(alias_filename(&alias[..53]), None);
        assert_eq!(alias_filename(&[0u8; 10]), None);
    }

    #[test]
    fn modification_date_from_dutc() {
        // 2001-01-01T00:00:00Z is 3_061_152_000 seconds after the Mac epoch.
        let ticks = 3_061_152_000u64 << 16;
        let out = interpret(vec![rec(".", b"moDD", RecordValue::Dutc(ticks))]);
        assert_eq!(
            out.modified().map(|d| d.to_rfc3339()),
            Some("2001-01-01T00:00:00+00:00".to_string())
        );
    }
}
