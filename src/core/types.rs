//! core::types
//!
//! Strong types shared by the decoders and the attribute layer.
//!
//! # Types
//!
//! - [`FourCC`] - Four-character code used by `.DS_Store` records
//! - [`AttrKey`] - Validated attribute cache key (without namespace)
//!
//! # Examples
//!
//! ```
//! use finderz::core::types::{AttrKey, FourCC};
//!
//! let code = FourCC::new(*b"Iloc");
//! assert_eq!(code.to_string(), "Iloc");
//!
//! let key = AttrKey::new("ai.prompt").unwrap();
//! assert_eq!(key.as_str(), "ai.prompt");
//! assert!(AttrKey::new("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid attribute key: {0}")]
    InvalidAttrKey(String),
}

/// A four-character code such as `Iloc` or `blob`.
///
/// Stored as raw bytes; codes are compared byte-wise, which matches how
/// Finder orders record types inside a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC([u8; 4]);

impl FourCC {
    /// Wrap four raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

/// A validated attribute cache key, relative to the namespace.
///
/// Keys are dotted lower-level names such as `rating` or `ai.prompt`:
/// - Cannot be empty
/// - Cannot start or end with `.`
/// - Cannot contain NUL, `/`, or whitespace
///
/// # Example
///
/// ```
/// use finderz::core::types::AttrKey;
///
/// assert!(AttrKey::new("ai.model").is_ok());
/// assert!(AttrKey::new(".hidden").is_err());
/// assert!(AttrKey::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttrKey(String);

impl AttrKey {
    /// Create a new validated key.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidAttrKey` if the key violates the rules above.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    fn validate(key: &str) -> Result<(), TypeError> {
        if key.is_empty() {
            return Err(TypeError::InvalidAttrKey("key cannot be empty".into()));
        }
        if key.starts_with('.') || key.ends_with('.') {
            return Err(TypeError::InvalidAttrKey(format!(
                "key cannot start or end with '.': {key}"
            )));
        }
        if key
            .chars()
            .any(|c| c == '\0' || c == '/' || c.is_whitespace())
        {
            return Err(TypeError::InvalidAttrKey(format!(
                "key contains a forbidden character: {key:?}"
            )));
        }
        Ok(())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AttrKey {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for AttrKey {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AttrKey> for String {
    fn from(key: AttrKey) -> Self {
        key.0
    }
}

impl AsRef<str> for AttrKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AttrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_display_escapes_binary() {
        assert_eq!(FourCC::new(*b"icvp").to_string(), "icvp");
        assert_eq!(FourCC::new([0, b'a', b'b', b'c']).to_string(), "\\x00abc");
    }

    #[test]
    fn fourcc_orders_bytewise() {
        // Uppercase sorts before lowercase, as in Finder-written nodes.
        assert!(FourCC::new(*b"Iloc") < FourCC::new(*b"bwsp"));
    }

    #[test]
    fn attr_key_validation() {
        assert!(AttrKey::new("rating").is_ok());
        assert!(AttrKey::new("ai.prompt").is_ok());
        assert!(AttrKey::new("").is_err());
        assert!(AttrKey::new("trailing.").is_err());
        assert!(AttrKey::new("a/b").is_err());
        assert!(AttrKey::new("nul\0").is_err());
    }

    #[test]
    fn attr_key_serde_uses_plain_string() {
        let key = AttrKey::new("ai.model").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"ai.model\"");
        let back: AttrKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<AttrKey>("\"\"").is_err());
    }
}
