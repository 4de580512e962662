//! Reads back the structures [`crate::writer`] built: the stream-level
//! index (for the per-block listing) and, on request, the embedded file
//! index. Both require seeking, since the index lives at the tail of the
//! stream; callers without a seekable source spool to a temp file first.

use std::io::{Read, Seek, SeekFrom};

use crate::container::{decode_multibyte_integer, IndexRecord, XZ_FOOTER_MAGIC, XZ_MAGIC};
use crate::error::{Result, TarXzError};
use crate::fileindex::FileIndexEntry;

/// A stream's block list plus enough bookkeeping to locate and decode the
/// trailing file-index block.
pub struct StreamSummary {
    pub records: Vec<IndexRecord>,
    file_index_block_offset: u64,
}

fn container_err(msg: impl Into<String>) -> TarXzError {
    TarXzError::Container(msg.into())
}

/// Parses the stream footer and index from the tail of `src`, returning the
/// block list in stream order. The last record always corresponds to the
/// embedded file-index block.
pub fn read_summary<S: Read + Seek>(src: &mut S) -> Result<StreamSummary> {
    let end = src.seek(SeekFrom::End(0))?;
    if end < 24 {
        return Err(container_err("stream too short to contain a header and footer"));
    }

    src.seek(SeekFrom::End(-12))?;
    let mut footer = [0u8; 12];
    src.read_exact(&mut footer)?;
    if &footer[10..12] != XZ_FOOTER_MAGIC {
        return Err(container_err("missing stream footer magic"));
    }
    let backward_size = u32::from_le_bytes(footer[4..8].try_into().unwrap());
    let index_size = (backward_size as u64 + 1) * 4;

    let index_start = end - 12 - index_size;
    src.seek(SeekFrom::Start(index_start))?;
    let mut index_bytes = vec![0u8; index_size as usize];
    src.read_exact(&mut index_bytes)?;

    if index_bytes[0] != 0x00 {
        return Err(container_err("missing index indicator"));
    }
    let (count, mut pos) = decode_multibyte_integer(&index_bytes[1..])
        .map_err(|e| container_err(e.to_string()))?;
    pos += 1;

    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (unpadded_size, n) = decode_multibyte_integer(&index_bytes[pos..])
            .map_err(|e| container_err(e.to_string()))?;
        pos += n;
        let (uncompressed_size, n) = decode_multibyte_integer(&index_bytes[pos..])
            .map_err(|e| container_err(e.to_string()))?;
        pos += n;
        records.push(IndexRecord { unpadded_size, uncompressed_size });
    }

    let mut header = [0u8; 12];
    src.seek(SeekFrom::Start(0))?;
    src.read_exact(&mut header)?;
    if header[0..6] != XZ_MAGIC {
        return Err(container_err("missing stream header magic"));
    }

    let file_index_block_offset = records
        .iter()
        .rev()
        .skip(1)
        .map(|r| round_up4(r.unpadded_size))
        .sum::<u64>()
        + 12;

    Ok(StreamSummary { records, file_index_block_offset })
}

fn round_up4(size: u64) -> u64 {
    size.div_ceil(4) * 4
}

/// Decodes the embedded file index. `src` must be the same stream
/// `read_summary` was called on, left at an arbitrary position.
pub fn read_file_index<S: Read + Seek>(
    src: &mut S,
    summary: &StreamSummary,
) -> Result<Vec<FileIndexEntry>> {
    let Some(record) = summary.records.last() else {
        return Ok(Vec::new());
    };

    src.seek(SeekFrom::Start(summary.file_index_block_offset))?;

    // Block header: one size byte tells us how much more header to skip.
    let mut size_byte = [0u8; 1];
    src.read_exact(&mut size_byte)?;
    let header_size = (size_byte[0] as u64 + 1) * 4;
    src.seek(SeekFrom::Current(header_size as i64 - 1))?;

    let checksum_size = 4u64; // CRC32, the only check type this crate writes.
    let payload_size = record.unpadded_size - header_size - checksum_size;
    let mut payload = vec![0u8; payload_size as usize];
    src.read_exact(&mut payload)?;

    let decompressed = crate::lzma::decompress_block(&payload, record.uncompressed_size as usize)?;
    crate::fileindex::parse_payload(&decompressed).map_err(TarXzError::Io)
}
