//! png::chunks
//!
//! Streaming walk over PNG chunks, decoding the three text chunk kinds.
//!
//! ```text
//! [8]  signature 89 50 4E 47 0D 0A 1A 0A
//! then repeated until IEND:
//! u32  payload length (big-endian)
//! [4]  chunk type
//! ...  payload
//! u32  CRC (not verified)
//! ```
//!
//! Non-text chunks are seeked over without being read, so image data is
//! never loaded.

use std::io::{self, BufRead, Read, Seek};

use flate2::read::ZlibDecoder;
use log::{debug, warn};

/// PNG file signature.
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// One decoded text chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub keyword: String,
    pub text: String,
}

/// Walk the chunks of `input`, returning every text chunk that decodes.
///
/// Returns `Ok(None)` when the signature does not match. I/O errors after
/// the signature end the walk and keep what was already read.
pub fn read_text_chunks<R: BufRead + Seek>(
    input: &mut R,
    max_text_chunk: usize,
) -> io::Result<Option<Vec<TextChunk>>> {
    let mut signature = [0u8; 8];
    input.read_exact(&mut signature)?;
    if signature != SIGNATURE {
        return Ok(None);
    }

    let mut found = Vec::new();
    loop {
        let (len, kind) = match chunk_header(input) {
            Ok(header) => header,
            Err(e) => {
                debug!("PNG chunk walk stopped: {e}");
                break;
            }
        };
        if &kind == b"IEND" {
            break;
        }

        let is_text = matches!(&kind, b"tEXt" | b"zTXt" | b"iTXt");
        if !is_text || len > max_text_chunk {
            if is_text {
                warn!(
                    "skipping {}-byte {} chunk over the {max_text_chunk}-byte limit",
                    len,
                    String::from_utf8_lossy(&kind)
                );
            }
            // Payload plus CRC.
            if let Err(e) = input.seek_relative(len as i64 + 4) {
                debug!("PNG chunk walk stopped: {e}");
                break;
            }
            continue;
        }

        let mut payload = vec![0u8; len];
        if let Err(e) = input.read_exact(&mut payload) {
            debug!("truncated PNG text chunk: {e}");
            break;
        }
        let decoded = match &kind {
            b"tEXt" => decode_text(&payload),
            b"zTXt" => decode_compressed_text(&payload, max_text_chunk),
            _ => decode_international_text(&payload, max_text_chunk),
        };
        match decoded {
            Some(chunk) => found.push(chunk),
            None => warn!(
                "skipping malformed {} chunk",
                String::from_utf8_lossy(&kind)
            ),
        }
        if let Err(e) = input.seek_relative(4) {
            debug!("PNG chunk walk stopped: {e}");
            break;
        }
    }
    Ok(Some(found))
}

fn chunk_header<R: Read>(input: &mut R) -> io::Result<(usize, [u8; 4])> {
    let mut header = [0u8; 8];
    input.read_exact(&mut header)?;
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let kind = [header[4], header[5], header[6], header[7]];
    Ok((len as usize, kind))
}

/// Split at the first NUL: keyword, rest.
fn split_keyword(payload: &[u8]) -> Option<(String, &[u8])> {
    let nul = payload.iter().position(|&b| b == 0)?;
    if nul == 0 || nul > 79 {
        return None;
    }
    Some((latin1(&payload[..nul]), &payload[nul + 1..]))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// `tEXt`: keyword NUL Latin-1 text.
fn decode_text(payload: &[u8]) -> Option<TextChunk> {
    let (keyword, rest) = split_keyword(payload)?;
    Some(TextChunk {
        keyword,
        text: latin1(rest),
    })
}

/// `zTXt`: keyword NUL method(0) zlib(Latin-1 text).
fn decode_compressed_text(payload: &[u8], limit: usize) -> Option<TextChunk> {
    let (keyword, rest) = split_keyword(payload)?;
    let (&method, data) = rest.split_first()?;
    if method != 0 {
        return None;
    }
    let text = inflate(data, limit)?;
    Some(TextChunk {
        keyword,
        text: latin1(&text),
    })
}

/// `iTXt`: keyword NUL flag method language NUL translated NUL UTF-8 text.
fn decode_international_text(payload: &[u8], limit: usize) -> Option<TextChunk> {
    let (keyword, rest) = split_keyword(payload)?;
    let (&flag, rest) = rest.split_first()?;
    let (&method, rest) = rest.split_first()?;
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest.iter().position(|&b| b == 0)?;
    let data = &rest[translated_end + 1..];

    let bytes = match (flag, method) {
        (0, _) => data.to_vec(),
        (1, 0) => inflate(data, limit)?,
        _ => return None,
    };
    let text = String::from_utf8(bytes).ok()?;
    Some(TextChunk { keyword, text })
}

/// Inflate zlib data, refusing output larger than `limit`.
fn inflate(data: &[u8], limit: usize) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    ZlibDecoder::new(data).take(cap).read_to_end(&mut out).ok()?;
    if out.len() > limit {
        warn!("compressed PNG text inflates past the {limit}-byte limit");
        return None;
    }
    Some(out)
}
