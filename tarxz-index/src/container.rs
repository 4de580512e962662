//! XZ container framing: stream header/footer, block headers, and the
//! stream-level index.
//!
//! `lzma-rust2` owns the LZMA2 entropy coding itself ([`crate::lzma::compress_block`]
//! calls into it), but the multi-block, parallel-friendly container shape
//! this crate builds around that codec is not something any off-the-shelf
//! writer exposes as public API, so the framing lives here, hand-rolled
//! against the XZ format's own grammar.

use std::io::{self, Write};

use crc32fast::Hasher as Crc32;

pub const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];
pub const XZ_FOOTER_MAGIC: [u8; 2] = [b'Y', b'Z'];

/// The per-block content checksum. Header, index and footer CRCs are always
/// CRC32 regardless of this choice; only the block payload checksum varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    None = 0x00,
    Crc32 = 0x01,
}

impl CheckType {
    pub fn checksum_size(self) -> u64 {
        match self {
            CheckType::None => 0,
            CheckType::Crc32 => 4,
        }
    }
}

/// One entry in the stream-level index: a block's framed size (header +
/// payload + padding + checksum) and its uncompressed size.
#[derive(Debug, Clone, Copy)]
pub struct IndexRecord {
    pub unpadded_size: u64,
    pub uncompressed_size: u64,
}

/// Encodes `value` as an XZ multibyte integer (little-endian base-128,
/// continuation bit set on every byte but the last). Returns the number of
/// bytes written.
pub fn encode_multibyte_integer(mut value: u64, out: &mut [u8; 10]) -> usize {
    let mut i = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out[i] = byte;
            i += 1;
            break;
        }
        out[i] = byte | 0x80;
        i += 1;
    }
    i
}

/// Decodes an XZ multibyte integer from the front of `buf`. Returns the
/// value and the number of bytes consumed.
pub fn decode_multibyte_integer(buf: &[u8]) -> io::Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().enumerate().take(9) {
        value |= ((byte & 0x7f) as u64) << (i * 7);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "multibyte integer did not terminate within 9 bytes",
    ))
}

fn multibyte_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

fn write_padding<W: Write>(w: &mut W, needed: usize) -> io::Result<()> {
    const ZEROES: [u8; 3] = [0, 0, 0];
    if needed > 0 {
        w.write_all(&ZEROES[..needed])?;
    }
    Ok(())
}

/// Maps a dictionary size to the single-byte LZMA2 property the block
/// header encodes it as. Mirrors the closed-form table used by every XZ
/// encoder: the smallest `2|3 << n` that is `>= dict_size`.
pub fn encode_lzma2_dict_size(dict_size: u32) -> io::Result<u8> {
    if dict_size < 4096 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "lzma2 dictionary size too small",
        ));
    }
    if dict_size == u32::MAX {
        return Ok(40);
    }
    for prop in 0u8..40 {
        let base = 2 | (prop as u32 & 1);
        let size = base << (prop / 2 + 11);
        if size >= dict_size {
            return Ok(prop);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "lzma2 dictionary size too large",
    ))
}

/// Writes the 12-byte XZ stream header.
pub fn write_stream_header<W: Write>(w: &mut W, check: CheckType) -> io::Result<()> {
    w.write_all(&XZ_MAGIC)?;
    let flags = [0u8, check as u8];
    w.write_all(&flags)?;
    let mut crc = Crc32::new();
    crc.update(&flags);
    w.write_all(&crc.finalize().to_le_bytes())?;
    Ok(())
}

/// Computes the size a block header for this dictionary size will occupy,
/// without writing anything. Every block in a run shares the same filter
/// chain and dictionary size, so this is computed once up front.
pub fn block_header_size(dict_size: u32) -> io::Result<u64> {
    let mut scratch = Vec::new();
    write_block_header(&mut scratch, dict_size)
}

/// Writes a block header for a single-filter (LZMA2-only) block and returns
/// its encoded size in bytes (always a multiple of four).
pub fn write_block_header<W: Write>(w: &mut W, dict_size: u32) -> io::Result<u64> {
    let mut header_data = Vec::with_capacity(8);

    // One filter (LZMA2): block flags byte encodes (num_filters - 1).
    header_data.push(0u8);

    let mut scratch = [0u8; 10];
    let n = encode_multibyte_integer(0x21, &mut scratch); // LZMA2 filter id
    header_data.extend_from_slice(&scratch[..n]);
    let n = encode_multibyte_integer(1, &mut scratch); // filter properties size
    header_data.extend_from_slice(&scratch[..n]);
    header_data.push(encode_lzma2_dict_size(dict_size)?);

    let total_size_needed = 1 + header_data.len() + 4;
    let header_size = total_size_needed.div_ceil(4) * 4;
    let header_size_encoded = ((header_size / 4) - 1) as u8;

    w.write_all(&[header_size_encoded])?;
    w.write_all(&header_data)?;
    let padding_needed = header_size - 1 - header_data.len() - 4;
    write_padding(w, padding_needed)?;

    let mut crc = Crc32::new();
    crc.update(&[header_size_encoded]);
    crc.update(&header_data);
    if padding_needed > 0 {
        crc.update(&[0u8; 3][..padding_needed]);
    }
    w.write_all(&crc.finalize().to_le_bytes())?;

    Ok(header_size as u64)
}

/// Writes a block's compressed payload, padding to a 4-byte boundary and
/// appending its content checksum. Returns the block's `unpadded_size`
/// (header + payload + checksum; padding is, per the format's own naming,
/// excluded).
pub fn write_block_payload<W: Write>(
    w: &mut W,
    header_size: u64,
    compressed: &[u8],
    check: CheckType,
) -> io::Result<u64> {
    w.write_all(compressed)?;
    let padding_needed = (4 - (compressed.len() % 4)) % 4;
    write_padding(w, padding_needed)?;

    let checksum = match check {
        CheckType::None => Vec::new(),
        CheckType::Crc32 => {
            let mut crc = Crc32::new();
            crc.update(compressed);
            crc.finalize().to_le_bytes().to_vec()
        }
    };
    w.write_all(&checksum)?;

    Ok(header_size + compressed.len() as u64 + checksum.len() as u64)
}

/// Writes the stream-level index record and returns its total size in bytes
/// (indicator + payload + padding + CRC32), needed for `backward_size`.
pub fn write_index<W: Write>(w: &mut W, records: &[IndexRecord]) -> io::Result<u64> {
    w.write_all(&[0x00])?;

    let mut index_data = Vec::new();
    let mut scratch = [0u8; 10];
    let n = encode_multibyte_integer(records.len() as u64, &mut scratch);
    index_data.extend_from_slice(&scratch[..n]);
    for record in records {
        let n = encode_multibyte_integer(record.unpadded_size, &mut scratch);
        index_data.extend_from_slice(&scratch[..n]);
        let n = encode_multibyte_integer(record.uncompressed_size, &mut scratch);
        index_data.extend_from_slice(&scratch[..n]);
    }
    w.write_all(&index_data)?;

    let bytes_written = 1 + index_data.len();
    let padding_needed = (4 - (bytes_written % 4)) % 4;
    write_padding(w, padding_needed)?;

    let mut crc = Crc32::new();
    crc.update(&[0x00]);
    crc.update(&index_data);
    if padding_needed > 0 {
        crc.update(&[0u8; 3][..padding_needed]);
    }
    w.write_all(&crc.finalize().to_le_bytes())?;

    Ok((bytes_written + padding_needed + 4) as u64)
}

/// Returns the size the index record for `records` will occupy, without
/// writing anything -- the footer's `backward_size` must be known before
/// the index bytes are framed.
pub fn index_size(records: &[IndexRecord]) -> u64 {
    let mut size = 1 + multibyte_len(records.len() as u64);
    for record in records {
        size += multibyte_len(record.unpadded_size);
        size += multibyte_len(record.uncompressed_size);
    }
    let padding = (4 - (size % 4)) % 4;
    (size + padding + 4) as u64
}

/// Writes the 12-byte XZ stream footer. `index_size_bytes` must be the
/// exact byte size of the index record just written.
pub fn write_stream_footer<W: Write>(
    w: &mut W,
    index_size_bytes: u64,
    check: CheckType,
) -> io::Result<()> {
    let backward_size = ((index_size_bytes / 4) - 1) as u32;
    let flags = [0u8, check as u8];

    let mut crc = Crc32::new();
    crc.update(&backward_size.to_le_bytes());
    crc.update(&flags);

    w.write_all(&crc.finalize().to_le_bytes())?;
    w.write_all(&backward_size.to_le_bytes())?;
    w.write_all(&flags)?;
    w.write_all(&XZ_FOOTER_MAGIC)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multibyte_integer_round_trips() {
        for value in [0u64, 1, 127, 128, 300, 1 << 20, u64::MAX] {
            let mut buf = [0u8; 10];
            let n = encode_multibyte_integer(value, &mut buf);
            let (decoded, consumed) = decode_multibyte_integer(&buf[..n]).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, n);
        }
    }

    #[test]
    fn dict_size_encoding_is_monotonic_and_covers_the_request() {
        let prop = encode_lzma2_dict_size(1 << 20).unwrap();
        let base = 2 | (prop as u32 & 1);
        let size = base << (prop / 2 + 11);
        assert!(size >= 1 << 20);
    }

    #[test]
    fn index_size_matches_actual_written_bytes() {
        let records = vec![
            IndexRecord { unpadded_size: 100, uncompressed_size: 4096 },
            IndexRecord { unpadded_size: 4200, uncompressed_size: 200_000 },
        ];
        let mut buf = Vec::new();
        let written = write_index(&mut buf, &records).unwrap();
        assert_eq!(written, buf.len() as u64);
        assert_eq!(written, index_size(&records));
    }

    #[test]
    fn stream_header_is_twelve_bytes() {
        let mut buf = Vec::new();
        write_stream_header(&mut buf, CheckType::Crc32).unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[0..6], &XZ_MAGIC);
    }

    #[test]
    fn stream_footer_is_twelve_bytes() {
        let mut buf = Vec::new();
        write_stream_footer(&mut buf, 12, CheckType::Crc32).unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[10..12], &XZ_FOOTER_MAGIC);
    }
}
