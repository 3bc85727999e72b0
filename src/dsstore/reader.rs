//! dsstore::reader
//!
//! Bounds-checked big-endian cursor over an in-memory byte slice.
//!
//! Every read fails closed: running past the end of the slice is a
//! [`DsStoreError::Format`] naming what was being read, never a panic.

use super::DsStoreError;
use crate::core::types::FourCC;

/// Forward-only reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], DsStoreError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                DsStoreError::Format(format!(
                    "truncated {what}: need {len} bytes at offset {}, {} available",
                    self.pos,
                    self.remaining()
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize, what: &str) -> Result<(), DsStoreError> {
        self.take(len, what).map(|_| ())
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8, DsStoreError> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &str) -> Result<u16, DsStoreError> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32, DsStoreError> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32(&mut self, what: &str) -> Result<i32, DsStoreError> {
        self.u32(what).map(|v| v as i32)
    }

    pub(crate) fn u64(&mut self, what: &str) -> Result<u64, DsStoreError> {
        let b = self.take(8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    pub(crate) fn fourcc(&mut self, what: &str) -> Result<FourCC, DsStoreError> {
        let b = self.take(4, what)?;
        Ok(FourCC::new([b[0], b[1], b[2], b[3]]))
    }

    /// Read `units` UTF-16BE code units and decode them.
    ///
    /// Unpaired surrogates are replaced rather than rejected; Finder has been
    /// seen writing truncated names.
    pub(crate) fn utf16(&mut self, units: usize, what: &str) -> Result<String, DsStoreError> {
        let len = units.checked_mul(2).ok_or_else(|| {
            DsStoreError::Format(format!("{what} length overflows: {units} code units"))
        })?;
        let bytes = self.take(len, what)?;
        let code_units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&code_units))
    }
}

/// Read a big-endian integer of `width` bytes (1, 2, 4 or 8) from `bytes`.
///
/// Used by the property-list reader whose offset and ref widths are
/// variable.
pub(crate) fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}
