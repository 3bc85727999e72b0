//! dsstore::plist
//!
//! Just enough of the binary property list format (`bplist00`) to read the
//! view-settings dictionaries Finder embeds in `bwsp`, `lsvp` and `icvp`
//! blobs.
//!
//! # Format
//!
//! A bplist is an 8-byte header, a run of tagged objects, an offset table
//! and a 32-byte trailer giving the offset and reference widths, the object
//! count, the top object and where the offset table starts. Containers refer
//! to their members by index into the offset table.
//!
//! Nesting depth and the total number of objects visited are capped, so a
//! self-referencing or exponentially shared object graph fails instead of
//! looping.

use std::collections::BTreeMap;

use super::reader::be_uint;
use super::DsStoreError;

const HEADER: &[u8; 8] = b"bplist00";
const TRAILER_LEN: usize = 32;
const MAX_DEPTH: usize = 16;
const MAX_VISITS: usize = 10_000;

/// A decoded property list value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Seconds since 2001-01-01T00:00:00Z.
    Date(f64),
    Data(Vec<u8>),
    String(String),
    Array(Vec<PlistValue>),
    Dict(BTreeMap<String, PlistValue>),
}

impl PlistValue {
    /// Numeric view of ints and reals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PlistValue::Int(v) => Some(*v as f64),
            PlistValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Booleans, also accepting 0/1 integers as older Finder versions wrote.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Bool(v) => Some(*v),
            PlistValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            PlistValue::Data(d) => Some(d),
            _ => None,
        }
    }
}

/// Parse a bplist whose top object must be a dictionary.
pub fn parse_dict(bytes: &[u8]) -> Result<BTreeMap<String, PlistValue>, DsStoreError> {
    match parse(bytes)? {
        PlistValue::Dict(map) => Ok(map),
        other => Err(DsStoreError::Format(format!(
            "property list top object is not a dictionary: {}",
            kind_name(&other)
        ))),
    }
}

/// Parse a complete bplist.
pub fn parse(bytes: &[u8]) -> Result<PlistValue, DsStoreError> {
    if bytes.len() < HEADER.len() + TRAILER_LEN || &bytes[..HEADER.len()] != HEADER {
        return Err(format_err("missing bplist00 header"));
    }
    let trailer = &bytes[bytes.len() - TRAILER_LEN..];
    let offset_size = trailer[6] as usize;
    let ref_size = trailer[7] as usize;
    let object_count = be_uint(&trailer[8..16]);
    let top_object = be_uint(&trailer[16..24]);
    let table_offset = be_uint(&trailer[24..32]);

    if !(1..=8).contains(&offset_size) || !(1..=8).contains(&ref_size) {
        return Err(format_err("invalid offset or reference width"));
    }
    let table_end = (object_count as u128) * (offset_size as u128) + table_offset as u128;
    if table_end > (bytes.len() - TRAILER_LEN) as u128 {
        return Err(format_err("offset table runs past the trailer"));
    }
    if top_object >= object_count {
        return Err(format_err("top object index out of range"));
    }

    let mut doc = Document {
        bytes,
        offset_size,
        ref_size,
        object_count: object_count as usize,
        table_offset: table_offset as usize,
        visits: 0,
    };
    doc.object(top_object as usize, 0)
}

struct Document<'a> {
    bytes: &'a [u8],
    offset_size: usize,
    ref_size: usize,
    object_count: usize,
    table_offset: usize,
    visits: usize,
}

impl<'a> Document<'a> {
    fn object_offset(&self, index: usize) -> Result<usize, DsStoreError> {
        if index >= self.object_count {
            return Err(format_err("object reference out of range"));
        }
        let at = self.table_offset + index * self.offset_size;
        let offset = be_uint(&self.bytes[at..at + self.offset_size]) as usize;
        if offset < HEADER.len() || offset >= self.table_offset {
            return Err(format_err("object offset outside the object area"));
        }
        Ok(offset)
    }

    fn slice(&self, start: usize, len: usize) -> Result<&'a [u8], DsStoreError> {
        start
            .checked_add(len)
            .filter(|&end| end <= self.table_offset)
            .map(|end| &self.bytes[start..end])
            .ok_or_else(|| format_err("object runs past the object area"))
    }

    /// Read the length nibble, following the 0xF escape to an int object.
    fn length(&self, info: u8, pos: usize) -> Result<(usize, usize), DsStoreError> {
        if info != 0x0f {
            return Ok((info as usize, pos));
        }
        let marker = self.slice(pos, 1)?[0];
        if marker & 0xf0 != 0x10 {
            return Err(format_err("extended length is not an integer"));
        }
        let width = 1usize << (marker & 0x0f);
        if width > 8 {
            return Err(format_err("extended length too wide"));
        }
        let len = be_uint(self.slice(pos + 1, width)?) as usize;
        Ok((len, pos + 1 + width))
    }

    fn refs(&self, start: usize, count: usize) -> Result<Vec<usize>, DsStoreError> {
        let len = count
            .checked_mul(self.ref_size)
            .ok_or_else(|| format_err("container too large"))?;
        let raw = self.slice(start, len)?;
        Ok(raw
            .chunks_exact(self.ref_size)
            .map(|c| be_uint(c) as usize)
            .collect())
    }

    fn object(&mut self, index: usize, depth: usize) -> Result<PlistValue, DsStoreError> {
        if depth > MAX_DEPTH {
            return Err(format_err("nesting too deep"));
        }
        self.visits += 1;
        if self.visits > MAX_VISITS {
            return Err(format_err("too many objects"));
        }

        let offset = self.object_offset(index)?;
        let marker = self.slice(offset, 1)?[0];
        let info = marker & 0x0f;
        let body = offset + 1;

        match marker >> 4 {
            0x0 => match info {
                0x0 => Ok(PlistValue::Null),
                0x8 => Ok(PlistValue::Bool(false)),
                0x9 => Ok(PlistValue::Bool(true)),
                _ => Err(format_err("unknown simple object")),
            },
            0x1 => {
                let width = 1usize << info;
                let raw = self.slice(body, width)?;
                let value = match width {
                    1 | 2 | 4 => be_uint(raw) as i64,
                    8 => be_uint(raw) as i64,
                    // 128-bit ints: keep the low 64 bits.
                    16 => be_uint(&raw[8..]) as i64,
                    _ => return Err(format_err("unsupported integer width")),
                };
                Ok(PlistValue::Int(value))
            }
            0x2 => {
                let raw = self.slice(body, 1usize << info)?;
                match raw.len() {
                    4 => Ok(PlistValue::Real(f32::from_bits(be_uint(raw) as u32) as f64)),
                    8 => Ok(PlistValue::Real(f64::from_bits(be_uint(raw)))),
                    _ => Err(format_err("unsupported real width")),
                }
            }
            0x3 if info == 0x3 => {
                let raw = self.slice(body, 8)?;
                Ok(PlistValue::Date(f64::from_bits(be_uint(raw))))
            }
            0x4 => {
                let (len, start) = self.length(info, body)?;
                Ok(PlistValue::Data(self.slice(start, len)?.to_vec()))
            }
            0x5 => {
                let (len, start) = self.length(info, body)?;
                let raw = self.slice(start, len)?;
                Ok(PlistValue::String(raw.iter().map(|&b| b as char).collect()))
            }
            0x6 => {
                let (units, start) = self.length(info, body)?;
                let len = units
                    .checked_mul(2)
                    .ok_or_else(|| format_err("string too long"))?;
                let raw = self.slice(start, len)?;
                let code_units: Vec<u16> = raw
                    .chunks_exact(2)
                    .map(|p| u16::from_be_bytes([p[0], p[1]]))
                    .collect();
                Ok(PlistValue::String(String::from_utf16_lossy(&code_units)))
            }
            0xa => {
                let (count, start) = self.length(info, body)?;
                let refs = self.refs(start, count)?;
                let mut items = Vec::with_capacity(refs.len());
                for r in refs {
                    items.push(self.object(r, depth + 1)?);
                }
                Ok(PlistValue::Array(items))
            }
            0xd => {
                let (count, start) = self.length(info, body)?;
                let keys = self.refs(start, count)?;
                let values = self.refs(start + count * self.ref_size, count)?;
                let mut map = BTreeMap::new();
                for (k, v) in keys.into_iter().zip(values) {
                    let key = match self.object(k, depth + 1)? {
                        PlistValue::String(s) => s,
                        _ => return Err(format_err("dictionary key is not a string")),
                    };
                    let value = self.object(v, depth + 1)?;
                    map.insert(key, value);
                }
                Ok(PlistValue::Dict(map))
            }
            _ => Err(format_err(&format!("unsupported object marker 0x{marker:02x}"))),
        }
    }
}

fn format_err(msg: &str) -> DsStoreError {
    DsStoreError::Format(format!("property list: {msg}"))
}

fn kind_name(value: &PlistValue) -> &'static str {
    match value {
        PlistValue::Null => "null",
        PlistValue::Bool(_) => "bool",
        PlistValue::Int(_) => "integer",
        PlistValue::Real(_) => "real",
        PlistValue::Date(_) => "date",
        PlistValue::Data(_) => "data",
        PlistValue::String(_) => "string",
        PlistValue::Array(_) => "array",
        PlistValue::Dict(_) => "dictionary",
    }
}
