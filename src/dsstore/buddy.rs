//! dsstore::buddy
//!
//! The buddy allocator that carves a `.DS_Store` file into blocks.
//!
//! # Layout
//!
//! ```text
//! 0x00  u32   alignment marker, always 1
//! 0x04  [4]   "Bud1"
//! 0x08  u32   offset of the allocator info block
//! 0x0c  u32   size of the allocator info block
//! 0x10  u32   copy of the offset (must match)
//! 0x14  [16]  reserved
//! ```
//!
//! All offsets are relative to byte 4. The info block holds the block
//! address table (padded to a multiple of 256 entries), a table of contents
//! mapping names such as `DSDB` to block ids, and free lists we ignore.
//! A block address packs the offset in its upper 27 bits and log2 of the
//! block size in its low 5 bits.

use std::collections::BTreeMap;

use super::reader::ByteReader;
use super::DsStoreError;

/// Expected value of the leading alignment marker.
pub const ALIGNMENT_MARKER: u32 = 1;

/// Magic bytes following the alignment marker.
pub const MAGIC: &[u8; 4] = b"Bud1";

/// Length of the fixed file header, including the alignment marker.
pub const HEADER_LEN: usize = 36;

/// Block address table entries are stored in pages of this many entries.
const ADDRESS_PAGE: usize = 256;

/// Parsed allocator state over a borrowed file image.
#[derive(Debug)]
pub(crate) struct BuddyAllocator<'a> {
    /// File contents after the 4-byte alignment marker.
    data: &'a [u8],
    addresses: Vec<u32>,
    toc: BTreeMap<String, u32>,
}

impl<'a> BuddyAllocator<'a> {
    /// Validate the header and load the block table and table of contents.
    pub(crate) fn open(file: &'a [u8]) -> Result<Self, DsStoreError> {
        let mut header = ByteReader::new(file);
        let marker = header.u32("alignment marker")?;
        let magic = header.take(4, "magic")?;
        if marker != ALIGNMENT_MARKER || magic != MAGIC {
            return Err(DsStoreError::Format(format!(
                "bad magic: expected 00000001 'Bud1', found {:08x} {:?}",
                marker,
                String::from_utf8_lossy(magic)
            )));
        }
        let info_offset = header.u32("info block offset")? as usize;
        let info_size = header.u32("info block size")? as usize;
        let info_offset_copy = header.u32("info block offset copy")? as usize;
        header.skip(16, "reserved header bytes")?;

        if info_offset != info_offset_copy {
            return Err(DsStoreError::Format(format!(
                "info block offsets disagree: {info_offset} vs {info_offset_copy}"
            )));
        }

        let data = &file[4..];
        let info = slice_block(data, info_offset, info_size, "allocator info block")?;
        let mut r = ByteReader::new(info);

        let count = r.u32("block count")? as usize;
        r.skip(4, "reserved block table word")?;
        // Bound the table by what the info block can actually hold before
        // allocating for it.
        let padded = count.div_ceil(ADDRESS_PAGE) * ADDRESS_PAGE;
        if padded.saturating_mul(4) > r.remaining() {
            return Err(DsStoreError::Format(format!(
                "block table of {count} entries does not fit in a {info_size}-byte info block"
            )));
        }
        let mut addresses = Vec::with_capacity(count);
        for _ in 0..count {
            addresses.push(r.u32("block address")?);
        }
        r.skip((padded - count) * 4, "block table padding")?;

        let toc_count = r.u32("table of contents size")?;
        let mut toc = BTreeMap::new();
        for _ in 0..toc_count {
            let name_len = r.u8("toc name length")? as usize;
            let name = r.take(name_len, "toc name")?;
            let block = r.u32("toc block id")?;
            toc.insert(String::from_utf8_lossy(name).into_owned(), block);
        }

        Ok(Self {
            data,
            addresses,
            toc,
        })
    }

    /// Look up a named entry in the table of contents.
    pub(crate) fn toc_entry(&self, name: &str) -> Option<u32> {
        self.toc.get(name).copied()
    }

    /// Number of entries in the block address table.
    pub(crate) fn block_count(&self) -> usize {
        self.addresses.len()
    }

    /// Open a reader over block `id`.
    pub(crate) fn block(&self, id: u32) -> Result<ByteReader<'a>, DsStoreError> {
        let addr = *self.addresses.get(id as usize).ok_or_else(|| {
            DsStoreError::Format(format!(
                "block id {id} out of range ({} blocks)",
                self.addresses.len()
            ))
        })?;
        let offset = (addr & !0x1f) as usize;
        let size = 1usize << (addr & 0x1f);
        let bytes = slice_block(self.data, offset, size, &format!("block {id}"))?;
        Ok(ByteReader::new(bytes))
    }
}

/// Slice `size` bytes at `offset`, clamping a block that runs past the end
/// of the file. A block that starts past the end is an error; reads that run
/// off a clamped block fail later as truncation.
fn slice_block<'a>(
    data: &'a [u8],
    offset: usize,
    size: usize,
    what: &str,
) -> Result<&'a [u8], DsStoreError> {
    if offset >= data.len() {
        return Err(DsStoreError::Format(format!(
            "{what} at offset {offset} lies outside the {}-byte file",
            data.len()
        )));
    }
    let end = offset.saturating_add(size).min(data.len());
    Ok(&data[offset..end])
}
