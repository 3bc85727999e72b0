//! dsstore::model
//!
//! The decoded, immutable view of one directory's `.DS_Store`.
//!
//! Settings that Finder did not record (or that failed to parse) are held as
//! absent and reported through the accessors with Finder's documented
//! defaults. [`DirectoryMetadataRecord::is_explicit`] tells the two apart so
//! callers can rank default-filled values below data from other sources.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::core::types::FourCC;

/// Default icon size in points.
pub const DEFAULT_ICON_SIZE: u32 = 64;
/// Default label text size in points.
pub const DEFAULT_TEXT_SIZE: u32 = 12;
/// Default sort column.
pub const DEFAULT_SORT_COLUMN: &str = "name";

/// Finder view style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewStyle {
    #[default]
    Icon,
    List,
    Column,
    Gallery,
}

impl ViewStyle {
    /// Map a Finder view-mode code (`vmod`, `vstl`, `fwi0`).
    ///
    /// Cover Flow (`Flwv`) was replaced by Gallery view and is reported as
    /// such.
    pub fn from_code(code: FourCC) -> Option<Self> {
        match &code.bytes() {
            b"icnv" => Some(ViewStyle::Icon),
            b"Nlsv" => Some(ViewStyle::List),
            b"clmv" => Some(ViewStyle::Column),
            b"glyv" | b"Flwv" => Some(ViewStyle::Gallery),
            _ => None,
        }
    }

    /// The code Finder writes for this style.
    pub fn code(&self) -> FourCC {
        match self {
            ViewStyle::Icon => FourCC::new(*b"icnv"),
            ViewStyle::List => FourCC::new(*b"Nlsv"),
            ViewStyle::Column => FourCC::new(*b"clmv"),
            ViewStyle::Gallery => FourCC::new(*b"glyv"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewStyle::Icon => "Icon",
            ViewStyle::List => "List",
            ViewStyle::Column => "Column",
            ViewStyle::Gallery => "Gallery",
        }
    }
}

impl std::fmt::Display for ViewStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Icon position in the folder window, in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconPosition {
    pub x: i32,
    pub y: i32,
}

/// Finder window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Finder color label names, indexed by label number.
const LABEL_NAMES: [&str; 8] = [
    "None", "Gray", "Green", "Purple", "Blue", "Yellow", "Red", "Orange",
];

/// Name of a Finder color label index, if valid.
pub fn color_label_name(index: u8) -> Option<&'static str> {
    LABEL_NAMES.get(index as usize).copied()
}

/// Directory-level settings that fall back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    ViewStyle,
    IconSize,
    TextSize,
    LabelOnBottom,
    ShowIconPreview,
    ShowItemInfo,
    SortColumn,
}

/// Everything one `.DS_Store` says about its directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryMetadataRecord {
    pub(crate) view_style: Option<ViewStyle>,
    pub(crate) icon_size: Option<u32>,
    pub(crate) text_size: Option<u32>,
    pub(crate) label_on_bottom: Option<bool>,
    pub(crate) show_icon_preview: Option<bool>,
    pub(crate) show_item_info: Option<bool>,
    pub(crate) sort_column: Option<String>,
    pub(crate) background_image: Option<String>,
    pub(crate) window_bounds: Option<WindowBounds>,
    pub(crate) modified: Option<DateTime<Utc>>,
    pub(crate) icon_positions: BTreeMap<String, IconPosition>,
    pub(crate) color_labels: BTreeMap<String, u8>,
    pub(crate) comments: BTreeMap<String, String>,
    pub(crate) record_count: usize,
}

impl DirectoryMetadataRecord {
    pub fn view_style(&self) -> ViewStyle {
        self.view_style.unwrap_or_default()
    }

    pub fn icon_size(&self) -> u32 {
        self.icon_size.unwrap_or(DEFAULT_ICON_SIZE)
    }

    pub fn text_size(&self) -> u32 {
        self.text_size.unwrap_or(DEFAULT_TEXT_SIZE)
    }

    pub fn label_on_bottom(&self) -> bool {
        self.label_on_bottom.unwrap_or(true)
    }

    pub fn show_icon_preview(&self) -> bool {
        self.show_icon_preview.unwrap_or(true)
    }

    pub fn show_item_info(&self) -> bool {
        self.show_item_info.unwrap_or(false)
    }

    pub fn sort_column(&self) -> &str {
        self.sort_column.as_deref().unwrap_or(DEFAULT_SORT_COLUMN)
    }

    /// Name of the folder background picture, when one is set.
    pub fn background_image(&self) -> Option<&str> {
        self.background_image.as_deref()
    }

    pub fn window_bounds(&self) -> WindowBounds {
        self.window_bounds.unwrap_or_default()
    }

    /// Folder modification time recorded by Finder.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    /// Whether `setting` came from the file rather than a default.
    pub fn is_explicit(&self, setting: Setting) -> bool {
        match setting {
            Setting::ViewStyle => self.view_style.is_some(),
            Setting::IconSize => self.icon_size.is_some(),
            Setting::TextSize => self.text_size.is_some(),
            Setting::LabelOnBottom => self.label_on_bottom.is_some(),
            Setting::ShowIconPreview => self.show_icon_preview.is_some(),
            Setting::ShowItemInfo => self.show_item_info.is_some(),
            Setting::SortColumn => self.sort_column.is_some(),
        }
    }

    pub fn icon_position(&self, filename: &str) -> Option<IconPosition> {
        self.icon_positions.get(filename).copied()
    }

    pub fn color_label(&self, filename: &str) -> Option<u8> {
        self.color_labels.get(filename).copied()
    }

    /// Spotlight comment set in Finder's Get Info window.
    pub fn comment(&self, filename: &str) -> Option<&str> {
        self.comments.get(filename).map(String::as_str)
    }

    pub fn icon_positions(&self) -> &BTreeMap<String, IconPosition> {
        &self.icon_positions
    }

    pub fn color_labels(&self) -> &BTreeMap<String, u8> {
        &self.color_labels
    }

    pub fn comments(&self) -> &BTreeMap<String, String> {
        &self.comments
    }

    /// Number of raw records the B-tree held.
    pub fn record_count(&self) -> usize {
        self.record_count
    }
}
