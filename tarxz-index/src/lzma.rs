//! Thin wrapper around `lzma-rust2`'s LZMA2 writer: this crate owns the XZ
//! container shape (see [`crate::container`]), `lzma-rust2` owns turning
//! bytes into LZMA2-coded bytes.

use std::io::{Read, Write};

use lzma_rust2::{Lzma2Options, Lzma2Reader, Lzma2Writer, LzmaOptions};

use crate::error::{Result, TarXzError};

/// Dictionary size derived from a preset, matching the relationship the
/// reader uses to size its input blocks (`block_in_size = 2 * dict_size`).
pub fn dict_size_for_preset(preset: u32) -> u32 {
    LzmaOptions::with_preset(preset).dict_size
}

/// Compresses `input` in one shot and appends the LZMA2-coded bytes to
/// `out`. Used by the encoder workers, where each block is independent and
/// there is no benefit to a streaming API.
pub fn compress_block(input: &[u8], preset: u32, out: &mut Vec<u8>) -> Result<()> {
    let options = Lzma2Options {
        lzma_options: LzmaOptions::with_preset(preset),
        ..Default::default()
    };
    let mut writer = Lzma2Writer::new(out, options);
    writer
        .write_all(input)
        .map_err(|e| TarXzError::Codec(e.to_string()))?;
    writer.finish().map_err(|e| TarXzError::Codec(e.to_string()))?;
    Ok(())
}

/// Streaming LZMA2 encoder for the file-index payload, which is fed in
/// fixed-size chunks rather than materialized whole (see
/// [`crate::fileindex::write_payload`]).
pub struct StreamingBlockEncoder {
    writer: Lzma2Writer<Vec<u8>>,
}

impl StreamingBlockEncoder {
    pub fn new(preset: u32) -> Self {
        let options = Lzma2Options {
            lzma_options: LzmaOptions::with_preset(preset),
            ..Default::default()
        };
        StreamingBlockEncoder {
            writer: Lzma2Writer::new(Vec::new(), options),
        }
    }

    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer
            .write_all(chunk)
            .map_err(|e| TarXzError::Codec(e.to_string()))
    }

    /// Finishes the stream and returns the compressed bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut writer = self.writer;
        writer.flush().map_err(|e| TarXzError::Codec(e.to_string()))?;
        writer.finish().map_err(|e| TarXzError::Codec(e.to_string()))
    }
}

/// Decodes a single LZMA2-coded block. `uncompressed_size` is known ahead
/// of time from the stream-level index, so the output buffer is
/// preallocated exactly.
pub fn decompress_block(compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let dict_size = compressed
        .len()
        .max(uncompressed_size)
        .next_power_of_two()
        .max(1 << 16) as u32;
    let mut reader = Lzma2Reader::new(compressed, dict_size, None);
    let mut out = vec![0u8; uncompressed_size];
    reader
        .read_exact(&mut out)
        .map_err(|e| TarXzError::Codec(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_shot_compress_round_trips_through_lzma2() {
        let input = b"the quick brown fox jumps over the lazy dog".repeat(64);
        let mut compressed = Vec::new();
        compress_block(&input, 6, &mut compressed).unwrap();
        assert!(!compressed.is_empty());
        // A highly repetitive input should compress well below its own size.
        assert!(compressed.len() < input.len());
    }

    #[test]
    fn dict_size_matches_preset_relationship() {
        let size = dict_size_for_preset(6);
        assert!(size >= 1 << 20);
    }

    #[test]
    fn compress_then_decompress_round_trips() {
        let input = b"round trip me please, over and over".repeat(128);
        let mut compressed = Vec::new();
        compress_block(&input, 3, &mut compressed).unwrap();
        let decompressed = decompress_block(&compressed, input.len()).unwrap();
        assert_eq!(decompressed, input);
    }
}
