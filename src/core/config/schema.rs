//! core::config::schema
//!
//! Configuration schema types.
//!
//! Every table and key is optional; missing values take the defaults
//! documented on each field. Unknown keys are rejected so typos surface
//! instead of being silently ignored.
//!
//! # Validation
//!
//! Values are validated after parsing (e.g., the attribute namespace must
//! end with a `.` separator).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::attributes::DEFAULT_NAMESPACE;
use crate::dsstore::{DEFAULT_DIRECTORY_CAPACITY, DEFAULT_MAX_FILE_SIZE};
use crate::engine::DEFAULT_CAPACITY;
use crate::png::DEFAULT_MAX_TEXT_CHUNK;

/// Library configuration.
///
/// # Example
///
/// ```toml
/// [attributes]
/// namespace = "user.finderz."
/// write_back = true
///
/// [cache]
/// capacity = 4096
/// directories = 512
///
/// [ds_store]
/// enabled = true
///
/// [png]
/// enabled = true
/// max_text_chunk = 16777216
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Extended attribute cache settings
    pub attributes: AttributesConfig,

    /// In-memory cache sizes
    pub cache: CacheConfig,

    /// `.DS_Store` source settings
    pub ds_store: DsStoreConfig,

    /// PNG source settings
    pub png: PngConfig,
}

impl Config {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.attributes.validate()?;
        self.cache.validate()?;
        self.ds_store.validate()?;
        self.png.validate()
    }
}

/// Extended attribute cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AttributesConfig {
    /// Prefix for every cached attribute name (default: "user.finderz.")
    pub namespace: String,

    /// Persist freshly extracted AI fields (default: true)
    pub write_back: bool,
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            write_back: true,
        }
    }
}

impl AttributesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.len() < 2 || !self.namespace.ends_with('.') {
            return Err(ConfigError::InvalidValue(format!(
                "attribute namespace '{}' must be non-empty and end with '.'",
                self.namespace
            )));
        }
        if self.namespace.contains('\0') {
            return Err(ConfigError::InvalidValue(
                "attribute namespace cannot contain NUL".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory cache sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Aggregated entries kept by the engine (default: 4096)
    pub capacity: usize,

    /// Decoded `.DS_Store` records kept (default: 512)
    pub directories: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            directories: DEFAULT_DIRECTORY_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "cache.capacity must be greater than 0".to_string(),
            ));
        }
        if self.directories == 0 {
            return Err(ConfigError::InvalidValue(
                "cache.directories must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// `.DS_Store` source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DsStoreConfig {
    /// Read Finder metadata (default: true)
    pub enabled: bool,

    /// Larger files are rejected unread (default: 64 MiB)
    pub max_file_size: u64,
}

impl Default for DsStoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DsStoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::InvalidValue(
                "ds_store.max_file_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// PNG source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PngConfig {
    /// Read PNG text chunks (default: true)
    pub enabled: bool,

    /// Largest text chunk read, compressed or inflated (default: 16 MiB)
    pub max_text_chunk: usize,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_text_chunk: DEFAULT_MAX_TEXT_CHUNK,
        }
    }
}

impl PngConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_text_chunk == 0 {
            return Err(ConfigError::InvalidValue(
                "png.max_text_chunk must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
