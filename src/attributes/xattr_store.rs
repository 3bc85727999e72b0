//! attributes::xattr_store
//!
//! Extended attributes on the real filesystem via the `xattr` crate.
//!
//! Linux reports a missing attribute as `ENODATA`, macOS and the BSDs as
//! `ENOATTR`. `ENOTSUP`/`EOPNOTSUPP` mean the filesystem cannot hold
//! attributes at all (FAT, some network mounts, tmpfs on older kernels).
//! Off unix every operation is `Unsupported`.

use std::path::Path;

use super::traits::{AttrError, AttributeStore};

#[cfg(unix)]
const SCRATCH_ATTR: &str = "user.finderz.supported";

/// Attribute store backed by the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct XattrStore;

impl XattrStore {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
mod imp {
    use std::io;
    use std::path::Path;

    use super::AttrError;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const ENOATTR: i32 = libc::ENODATA;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const ENOATTR: i32 = libc::ENOATTR;

    fn is_unsupported(e: &io::Error) -> bool {
        matches!(e.raw_os_error(), Some(code) if code == libc::ENOTSUP || code == libc::EOPNOTSUPP)
    }

    fn is_absent(e: &io::Error) -> bool {
        e.raw_os_error() == Some(ENOATTR)
    }

    pub(super) fn map_err(path: &Path, name: &str, e: io::Error) -> AttrError {
        if is_unsupported(&e) {
            AttrError::Unsupported {
                path: path.to_path_buf(),
            }
        } else {
            AttrError::io(path, name, e)
        }
    }

    pub(super) fn get(path: &Path, name: &str) -> Result<Option<Vec<u8>>, AttrError> {
        match xattr::get(path, name) {
            Ok(value) => Ok(value),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(map_err(path, name, e)),
        }
    }

    pub(super) fn set(path: &Path, name: &str, value: &[u8]) -> Result<(), AttrError> {
        xattr::set(path, name, value).map_err(|e| map_err(path, name, e))
    }

    pub(super) fn remove(path: &Path, name: &str) -> Result<(), AttrError> {
        match xattr::remove(path, name) {
            Ok(()) => Ok(()),
            Err(e) if is_absent(&e) => Ok(()),
            Err(e) => Err(map_err(path, name, e)),
        }
    }

    /// Write and remove a scratch attribute. Some filesystems list
    /// attributes but refuse `user.*` writes.
    pub(super) fn writable(path: &Path) -> bool {
        if let Ok(Some(_)) = get(path, super::SCRATCH_ATTR) {
            return true;
        }
        set(path, super::SCRATCH_ATTR, b"").is_ok() && remove(path, super::SCRATCH_ATTR).is_ok()
    }

    pub(super) fn list(path: &Path) -> Result<Vec<String>, AttrError> {
        let names = xattr::list(path).map_err(|e| map_err(path, "*", e))?;
        // Names that are not UTF-8 cannot be ours.
        Ok(names
            .filter_map(|name| name.into_string().ok())
            .collect())
    }
}

#[cfg(unix)]
impl AttributeStore for XattrStore {
    fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>, AttrError> {
        imp::get(path, name)
    }

    fn set(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), AttrError> {
        imp::set(path, name, value)
    }

    fn remove(&self, path: &Path, name: &str) -> Result<(), AttrError> {
        imp::remove(path, name)
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, AttrError> {
        imp::list(path)
    }

    fn supported(&self, path: &Path) -> bool {
        xattr::SUPPORTED_PLATFORM && imp::list(path).is_ok() && imp::writable(path)
    }
}

#[cfg(not(unix))]
impl AttributeStore for XattrStore {
    fn get(&self, path: &Path, _name: &str) -> Result<Option<Vec<u8>>, AttrError> {
        Err(unsupported(path))
    }

    fn set(&self, path: &Path, _name: &str, _value: &[u8]) -> Result<(), AttrError> {
        Err(unsupported(path))
    }

    fn remove(&self, path: &Path, _name: &str) -> Result<(), AttrError> {
        Err(unsupported(path))
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, AttrError> {
        Err(unsupported(path))
    }

    fn supported(&self, _path: &Path) -> bool {
        false
    }
}

#[cfg(not(unix))]
fn unsupported(path: &Path) -> AttrError {
    AttrError::Unsupported {
        path: path.to_path_buf(),
    }
}
