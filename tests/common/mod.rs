//! Shared fixture builders for integration tests.
//!
//! Writes `.DS_Store` containers, binary property lists and PNG files
//! byte for byte so the decoders can be exercised without real Finder
//! output.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// One raw record: filename, type code, structure code, payload.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub filename: String,
    pub code: [u8; 4],
    pub structure: [u8; 4],
    pub payload: Vec<u8>,
}

impl RawRecord {
    pub fn new(filename: &str, code: &[u8; 4], structure: &[u8; 4], payload: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            code: *code,
            structure: *structure,
            payload,
        }
    }

    pub fn blob(filename: &str, code: &[u8; 4], bytes: &[u8]) -> Self {
        let mut payload = (bytes.len() as u32).to_be_bytes().to_vec();
        payload.extend_from_slice(bytes);
        Self::new(filename, code, b"blob", payload)
    }

    pub fn long(filename: &str, code: &[u8; 4], value: u32) -> Self {
        Self::new(filename, code, b"long", value.to_be_bytes().to_vec())
    }

    pub fn type_code(filename: &str, code: &[u8; 4], value: &[u8; 4]) -> Self {
        Self::new(filename, code, b"type", value.to_vec())
    }

    pub fn boolean(filename: &str, code: &[u8; 4], value: bool) -> Self {
        Self::new(filename, code, b"bool", vec![u8::from(value)])
    }

    pub fn ustr(filename: &str, code: &[u8; 4], text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut payload = (units.len() as u32).to_be_bytes().to_vec();
        for u in units {
            payload.extend_from_slice(&u.to_be_bytes());
        }
        Self::new(filename, code, b"ustr", payload)
    }

    pub fn dutc(filename: &str, code: &[u8; 4], ticks: u64) -> Self {
        Self::new(filename, code, b"dutc", ticks.to_be_bytes().to_vec())
    }

    /// Icon position at (`x`, `y`) with the usual trailing padding.
    pub fn iloc(filename: &str, x: i32, y: i32) -> Self {
        let mut bytes = x.to_be_bytes().to_vec();
        bytes.extend_from_slice(&y.to_be_bytes());
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00]);
        Self::blob(filename, b"Iloc", &bytes)
    }

    pub fn encode(&self) -> Vec<u8> {
        let units: Vec<u16> = self.filename.encode_utf16().collect();
        let mut out = (units.len() as u32).to_be_bytes().to_vec();
        for u in units {
            out.extend_from_slice(&u.to_be_bytes());
        }
        out.extend_from_slice(&self.code);
        out.extend_from_slice(&self.structure);
        out.extend_from_slice(&self.payload);
        out
    }

    fn sort_key(&self) -> (String, String, [u8; 4]) {
        (self.filename.to_lowercase(), self.filename.clone(), self.code)
    }
}

/// Sort records into B-tree key order.
pub fn sorted(mut records: Vec<RawRecord>) -> Vec<RawRecord> {
    records.sort_by_key(RawRecord::sort_key);
    records
}

/// `DSDB` master block contents.
pub fn master_block(root: u32, levels: u32, records: u32, nodes: u32) -> Vec<u8> {
    let mut out = Vec::new();
    for v in [root, levels, records, nodes, 0x1000] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out
}

/// Leaf node holding `records` in the given order.
pub fn leaf_node(records: &[RawRecord]) -> Vec<u8> {
    let mut out = 0u32.to_be_bytes().to_vec();
    out.extend_from_slice(&(records.len() as u32).to_be_bytes());
    for r in records {
        out.extend_from_slice(&r.encode());
    }
    out
}

/// Internal node: `(child, separator)` pairs then the rightmost child.
pub fn internal_node(entries: &[(u32, RawRecord)], rightmost: u32) -> Vec<u8> {
    let mut out = rightmost.to_be_bytes().to_vec();
    out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (child, r) in entries {
        out.extend_from_slice(&child.to_be_bytes());
        out.extend_from_slice(&r.encode());
    }
    out
}

/// Assemble a buddy-allocator container from raw blocks.
///
/// Block ids are indices into `blocks`; the table of contents maps `DSDB`
/// to `dsdb_block`.
pub fn container(blocks: &[Vec<u8>], dsdb_block: u32) -> Vec<u8> {
    // Offsets are relative to byte 4; the first 32 bytes are the header.
    let mut data = vec![0u8; 32];
    let mut addresses = Vec::new();
    for block in blocks {
        let mut log2 = 5u32;
        while (1usize << log2) < block.len() {
            log2 += 1;
        }
        let offset = data.len();
        addresses.push(offset as u32 | log2);
        data.extend_from_slice(block);
        data.resize(offset + (1usize << log2), 0);
    }

    let mut info = (addresses.len() as u32).to_be_bytes().to_vec();
    info.extend_from_slice(&0u32.to_be_bytes());
    let padded = addresses.len().div_ceil(256).max(1) * 256;
    for i in 0..padded {
        let addr = addresses.get(i).copied().unwrap_or(0);
        info.extend_from_slice(&addr.to_be_bytes());
    }
    info.extend_from_slice(&1u32.to_be_bytes());
    info.push(4);
    info.extend_from_slice(b"DSDB");
    info.extend_from_slice(&dsdb_block.to_be_bytes());
    // Empty free lists.
    info.extend(std::iter::repeat(0u8).take(32 * 4));

    let info_offset = data.len() as u32;
    let info_size = info.len() as u32;
    data.extend_from_slice(&info);

    let mut file = 1u32.to_be_bytes().to_vec();
    file.extend_from_slice(b"Bud1");
    file.extend_from_slice(&info_offset.to_be_bytes());
    file.extend_from_slice(&info_size.to_be_bytes());
    file.extend_from_slice(&info_offset.to_be_bytes());
    file.extend_from_slice(&[0u8; 16]);
    file.extend_from_slice(&data[32..]);
    file
}

/// A complete `.DS_Store` with every record in one leaf.
pub fn ds_store(records: Vec<RawRecord>) -> Vec<u8> {
    let records = sorted(records);
    let count = records.len() as u32;
    container(
        &[master_block(1, 0, count, 1), leaf_node(&records)],
        0,
    )
}

/// A two-level `.DS_Store`: an internal root over leaves of `per_leaf`
/// records, with one separator record between neighbouring leaves.
pub fn ds_store_two_level(records: Vec<RawRecord>, per_leaf: usize) -> Vec<u8> {
    let records = sorted(records);
    let count = records.len() as u32;

    let mut leaves: Vec<Vec<RawRecord>> = Vec::new();
    let mut separators = Vec::new();
    let mut rest = records.into_iter();
    loop {
        leaves.push(rest.by_ref().take(per_leaf.max(1)).collect());
        match rest.len() {
            0 => break,
            // A lone trailing record joins the last leaf.
            1 => {
                leaves.last_mut().unwrap().extend(rest.by_ref());
                break;
            }
            _ => separators.push(rest.next().unwrap()),
        }
    }

    // Block 0 master, block 1 root, blocks 2.. leaves.
    let leaf_ids: Vec<u32> = (0..leaves.len() as u32).map(|i| i + 2).collect();
    let entries: Vec<(u32, RawRecord)> = leaf_ids
        .iter()
        .copied()
        .zip(separators)
        .collect();
    let rightmost = *leaf_ids.last().unwrap();

    let mut blocks = vec![
        master_block(1, 1, count, 1 + leaves.len() as u32),
        internal_node(&entries, rightmost),
    ];
    for leaf in &leaves {
        blocks.push(leaf_node(leaf));
    }
    container(&blocks, 0)
}

/// Values the property list writer understands.
#[derive(Debug, Clone)]
pub enum Plist {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Data(Vec<u8>),
}

/// Binary property list holding one flat dictionary.
pub fn bplist(entries: &[(&str, Plist)]) -> Vec<u8> {
    let mut objects: Vec<Vec<u8>> = Vec::new();
    let n = entries.len();

    let mut dict = sized_marker(0xd0, n);
    for i in 0..n {
        dict.push((1 + i) as u8);
    }
    for i in 0..n {
        dict.push((1 + n + i) as u8);
    }
    objects.push(dict);
    for (key, _) in entries {
        objects.push(ascii(key));
    }
    for (_, value) in entries {
        objects.push(match value {
            Plist::Bool(false) => vec![0x08],
            Plist::Bool(true) => vec![0x09],
            Plist::Int(v) => {
                let mut o = vec![0x13];
                o.extend_from_slice(&v.to_be_bytes());
                o
            }
            Plist::Real(v) => {
                let mut o = vec![0x23];
                o.extend_from_slice(&v.to_bits().to_be_bytes());
                o
            }
            Plist::Str(s) => ascii(s),
            Plist::Data(d) => {
                let mut o = sized_marker(0x40, d.len());
                o.extend_from_slice(d);
                o
            }
        });
    }
    assert!(objects.len() < 256, "writer uses one-byte references");

    let mut out = b"bplist00".to_vec();
    let mut offsets = Vec::new();
    for obj in &objects {
        offsets.push(out.len() as u16);
        out.extend_from_slice(obj);
    }
    let table_offset = out.len() as u64;
    for o in offsets {
        out.extend_from_slice(&o.to_be_bytes());
    }
    let mut trailer = [0u8; 32];
    trailer[6] = 2;
    trailer[7] = 1;
    trailer[8..16].copy_from_slice(&(objects.len() as u64).to_be_bytes());
    trailer[24..32].copy_from_slice(&table_offset.to_be_bytes());
    out.extend_from_slice(&trailer);
    out
}

fn sized_marker(kind: u8, len: usize) -> Vec<u8> {
    if len < 15 {
        vec![kind | len as u8]
    } else {
        let mut v = vec![kind | 0x0f, 0x11];
        v.extend_from_slice(&(len as u16).to_be_bytes());
        v
    }
}

fn ascii(s: &str) -> Vec<u8> {
    let mut v = sized_marker(0x50, s.len());
    v.extend_from_slice(s.as_bytes());
    v
}

/// Version 2 alias record whose target filename is `name`.
pub fn alias(name: &str) -> Vec<u8> {
    let mut bytes = vec![0u8; 150];
    bytes[50] = name.len() as u8;
    bytes[51..51 + name.len()].copy_from_slice(name.as_bytes());
    bytes
}

/// A PNG chunk with a valid CRC.
pub fn png_chunk(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut crc = flate2::Crc::new();
    crc.update(kind);
    crc.update(payload);

    let mut out = (payload.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc.sum().to_be_bytes());
    out
}

/// A 1x1 PNG with a `tEXt` chunk per `(keyword, text)` pair.
pub fn png_with_text(texts: &[(&str, &str)]) -> Vec<u8> {
    let mut out = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    out.extend_from_slice(&png_chunk(b"IHDR", &ihdr));
    for (keyword, text) in texts {
        let mut payload = keyword.as_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(text.as_bytes());
        out.extend_from_slice(&png_chunk(b"tEXt", &payload));
    }
    out.extend_from_slice(&png_chunk(b"IDAT", &[0x78, 0x9c, 0x63, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01]));
    out.extend_from_slice(&png_chunk(b"IEND", &[]));
    out
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
