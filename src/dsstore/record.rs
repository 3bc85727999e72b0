//! dsstore::record
//!
//! Raw B-tree records: a filename, a type code and a typed payload.
//!
//! ```text
//! u32       filename length in UTF-16 code units
//! [u16; n]  filename, UTF-16BE
//! [4]       type code      (e.g. "Iloc", "icvp", "vmod")
//! [4]       structure code (e.g. "blob", "long", "bool")
//! ...       payload shaped by the structure code
//! ```

use super::reader::ByteReader;
use super::DsStoreError;
use crate::core::types::FourCC;

/// Upper bound on a single blob or ustr payload; larger values mean the
/// length word is garbage.
const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// A record payload, shaped by its structure code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    /// `long`: 32-bit integer.
    Long(u32),
    /// `shor`: 16-bit integer stored in a 32-bit slot.
    Short(u32),
    /// `bool`: one byte.
    Bool(bool),
    /// `type`: a four-character code.
    Type(FourCC),
    /// `blob`: length-prefixed bytes interpreted by the type code.
    Blob(Vec<u8>),
    /// `ustr`: length-prefixed UTF-16 string.
    Ustr(String),
    /// `comp`: 64-bit integer.
    Comp(u64),
    /// `dutc`: 64-bit timestamp in 1/65536 seconds since 1904-01-01.
    Dutc(u64),
}

impl RecordValue {
    /// Integer view of `long`, `shor` and `comp` payloads.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RecordValue::Long(v) | RecordValue::Short(v) => Some(*v as i64),
            RecordValue::Comp(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// A single decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Name relative to the directory; `.` for the directory itself.
    pub filename: String,
    pub code: FourCC,
    pub value: RecordValue,
}

impl Record {
    /// Parse one record at the reader's position.
    ///
    /// An unknown structure code is `Unsupported`: without knowing the
    /// payload size the rest of the node cannot be located.
    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, DsStoreError> {
        let name_len = r.u32("filename length")? as usize;
        let filename = r.utf16(name_len, "filename")?;
        let code = r.fourcc("record type")?;
        let structure = r.fourcc("structure type")?;

        let value = match &structure.bytes() {
            b"long" => RecordValue::Long(r.u32("long payload")?),
            b"shor" => RecordValue::Short(r.u32("shor payload")?),
            b"bool" => RecordValue::Bool(r.u8("bool payload")? != 0),
            b"type" => RecordValue::Type(r.fourcc("type payload")?),
            b"comp" => RecordValue::Comp(r.u64("comp payload")?),
            b"dutc" => RecordValue::Dutc(r.u64("dutc payload")?),
            b"blob" => {
                let len = bounded_len(r.u32("blob length")?, "blob")?;
                RecordValue::Blob(r.take(len, "blob payload")?.to_vec())
            }
            b"ustr" => {
                let units = bounded_len(r.u32("ustr length")?, "ustr")?;
                RecordValue::Ustr(r.utf16(units, "ustr payload")?)
            }
            _ => {
                return Err(DsStoreError::Unsupported(format!(
                    "record '{}' for {:?} has unknown structure type '{}'",
                    code, filename, structure
                )))
            }
        };

        Ok(Self {
            filename,
            code,
            value,
        })
    }
}

fn bounded_len(len: u32, what: &str) -> Result<usize, DsStoreError> {
    let len = len as usize;
    if len > MAX_PAYLOAD {
        return Err(DsStoreError::Format(format!(
            "{what} length {len} exceeds the {MAX_PAYLOAD}-byte limit"
        )));
    }
    Ok(len)
}
