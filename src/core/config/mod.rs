//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. The first config file found
//! 3. Programmatic changes by the host (not handled here)
//!
//! # Locations
//!
//! Searched in order:
//! 1. `$FINDERZ_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/finderz/config.toml`
//! 3. `~/.finderz/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use finderz::core::config::Config;
//!
//! let result = Config::load().unwrap();
//! for warning in &result.warnings {
//!     eprintln!("{}: {}", warning.path.display(), warning.message);
//! }
//! println!("Cache capacity: {}", result.config.cache.capacity);
//! ```

pub mod schema;

pub use schema::{AttributesConfig, CacheConfig, Config, DsStoreConfig, PngConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "FINDERZ_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// The file it was read from, if any.
    pub path: Option<PathBuf>,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// holds invalid values. Missing config files are not an error
    /// (defaults are used).
    pub fn load() -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        // 1. Check $FINDERZ_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::finish(Self::load_from(&path)?, Some(path), warnings);
            }
            warnings.push(ConfigWarning {
                message: format!("{CONFIG_ENV} points to a missing file, ignoring it"),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/finderz/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("finderz/config.toml");
            if path.exists() {
                return Self::finish(Self::load_from(&path)?, Some(path), warnings);
            }
        }

        // 3. Check ~/.finderz/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".finderz/config.toml");
            if path.exists() {
                return Self::finish(Self::load_from(&path)?, Some(path), warnings);
            }
        }

        // No config found, use defaults
        Self::finish(Config::default(), None, warnings)
    }

    fn finish(
        config: Config,
        path: Option<PathBuf>,
        warnings: Vec<ConfigWarning>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        match &path {
            Some(p) => debug!("config loaded from {}", p.display()),
            None => debug!("no config file found, using defaults"),
        }
        Ok(ConfigLoadResult {
            config,
            path,
            warnings,
        })
    }

    /// Read, parse and validate a single config file.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the canonical path for the config file.
    ///
    /// Returns `~/.finderz/config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".finderz/config.toml"))
    }

    /// Write this config to the canonical location atomically.
    pub fn write(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        self.write_to(&path)?;
        Ok(path)
    }

    /// Write this config to `path` atomically.
    ///
    /// Creates parent directories if needed. Writes to a temp file and
    /// renames it over `path` so readers never see a partial file.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        // Write to temp file in same directory (for atomic rename)
        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests touching process environment must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn load_from_env() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");

        fs::write(
            &config_path,
            r#"
            [cache]
            capacity = 32

            [attributes]
            write_back = false
            "#,
        )
        .unwrap();

        std::env::set_var(CONFIG_ENV, config_path.to_str().unwrap());
        let result = Config::load();
        std::env::remove_var(CONFIG_ENV);

        let result = result.unwrap();
        assert_eq!(result.path.as_deref(), Some(config_path.as_path()));
        assert_eq!(result.config.cache.capacity, 32);
        assert!(!result.config.attributes.write_back);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn missing_env_file_warns() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");

        std::env::set_var(CONFIG_ENV, missing.to_str().unwrap());
        let result = Config::load();
        std::env::remove_var(CONFIG_ENV);

        let result = result.unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, missing);
    }

    #[test]
    fn xdg_location() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("finderz");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "[png]\nenabled = false\n").unwrap();

        std::env::remove_var(CONFIG_ENV);
        let old = std::env::var_os("XDG_CONFIG_HOME");
        std::env::set_var("XDG_CONFIG_HOME", temp.path());
        let result = Config::load();
        match old {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }

        let result = result.unwrap();
        assert!(!result.config.png.enabled);
        assert_eq!(result.path, Some(dir.join("config.toml")));
    }

    #[test]
    fn invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[attributes]\nnamespace = \"nodot\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[cache]\ncapacity = 8\nbogus = 1\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn write_atomic_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/config.toml");

        let mut config = Config::default();
        config.cache.directories = 7;
        config.write_to(&path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn write_refuses_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(config.write_to(&path).is_err());
        assert!(!path.exists());
    }
}
