//! Parallel block-oriented LZMA2/XZ encoder with an embedded tar file index.
//!
//! This library turns a tar byte stream into a standard XZ container whose
//! blocks are compressed independently and in parallel, and which carries
//! one extra block mapping every tar member's pathname to its byte offset
//! in the uncompressed archive. Any conforming LZMA2/XZ decoder can read
//! the output; tools built on this crate can additionally seek straight to
//! a named member without decompressing everything ahead of it.
//!
//! # Architecture
//!
//! Three pipeline stages connected by bounded queues of reusable block
//! records:
//!
//! 1. **Reader**: drives the tar parser, re-chunks the raw byte stream into
//!    fixed-size blocks, and builds the file index as headers go by.
//! 2. **Encoders**: `N` worker threads compress blocks independently.
//! 3. **Writer**: reassembles blocks in order, then appends the file-index
//!    block, the stream-level index, and the stream footer.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use tarxz_index::{encode, EncodeOptions};
//!
//! let input = File::open("project.tar").unwrap();
//! let mut output = File::create("project.tar.xz").unwrap();
//! encode(input, &mut output, EncodeOptions::default()).unwrap();
//! ```

pub mod block;
pub mod container;
pub mod encoder;
pub mod error;
pub mod fileindex;
pub mod lister;
pub mod lzma;
pub mod reader;
pub mod writer;

use std::io::{Read, Write};

use crossbeam_channel::bounded;

pub use container::{CheckType, IndexRecord};
pub use error::{Result, TarXzError};
pub use fileindex::FileIndexEntry;
pub use lister::StreamSummary;

/// Tunables for [`encode`]. `preset` follows the LZMA2 0-9 convention;
/// `jobs` defaults to the host's available parallelism.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub preset: u32,
    pub jobs: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            preset: 6,
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Runs the full encode pipeline: reads a tar stream from `input`, writes a
/// block-parallel XZ container with an embedded file index to `output`.
///
/// Spawns one reader thread and `options.jobs` encoder threads; the writer
/// stage runs on the calling thread *concurrently* with them, draining
/// `write_q` as blocks arrive so the fixed-size buffer pool never stalls.
/// The reader only sends `Stop` on `write_q` (together with the finished
/// file index) once every encoder has joined, so the writer's tail sequence
/// never starts before the last data block has been produced. Returns the
/// number of data blocks written (not counting the trailing file-index
/// block), mostly useful for tests and diagnostics.
pub fn encode<R, W>(input: R, output: &mut W, options: EncodeOptions) -> Result<u64>
where
    R: Read + Send,
    W: Write,
{
    let jobs = options.jobs.max(1);
    let dict_size = lzma::dict_size_for_preset(options.preset);
    let block_in_size = (2u64 * dict_size as u64) as usize;
    // A single-shot LZMA2 compress of one block can't expand past its input
    // by more than a small constant factor; this bound is generous enough
    // to never need a realloc mid-encode.
    let block_out_size = block_in_size + (block_in_size / 3) + 256;
    let block_header_size = container::block_header_size(dict_size)?;

    let pipeline = block::Pipeline::new(jobs, block_in_size, block_out_size);
    let pipeline = &pipeline;
    let preset = options.preset;

    // Hands the finished file index from the reader thread to the writer at
    // the moment it needs it, without making the writer wait for it before
    // draining write_q -- see writer::run.
    let (index_tx, index_rx) = bounded::<Vec<fileindex::FileIndexEntry>>(1);

    std::thread::scope(|scope| -> Result<u64> {
        let mut encoder_threads = Vec::with_capacity(jobs);
        for _ in 0..jobs {
            encoder_threads.push(scope.spawn(move || encoder::run(pipeline, preset, block_header_size)));
        }

        let reader_thread = scope.spawn(move || -> Result<u64> {
            let (file_index, total_read) = reader::run(input, pipeline, block_in_size, jobs)?;

            for handle in encoder_threads {
                handle.join().map_err(|_| TarXzError::WorkerPanicked)??;
            }

            index_tx
                .send(file_index)
                .expect("writer still holds the index receiver");
            pipeline
                .write_tx
                .send(block::Message::Stop)
                .expect("write queue still has a receiver");

            Ok(total_read)
        });

        let written = writer::run(pipeline, output, index_rx, dict_size, preset)?;

        reader_thread.join().map_err(|_| TarXzError::WorkerPanicked)??;

        Ok(written)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn empty_tar_round_trips_through_a_stock_xz_decoder() {
        let tar_bytes = build_tar(&[]);
        let mut compressed = Vec::new();
        encode(
            Cursor::new(tar_bytes),
            &mut compressed,
            EncodeOptions { preset: 1, jobs: 2 },
        )
        .unwrap();

        assert_eq!(&compressed[0..6], &container::XZ_MAGIC);
    }

    #[test]
    fn single_small_file_produces_a_decodable_stream() {
        let tar_bytes = build_tar(&[("hello.txt", b"hello world")]);
        let mut compressed = Vec::new();
        let blocks = encode(
            Cursor::new(tar_bytes),
            &mut compressed,
            EncodeOptions { preset: 1, jobs: 1 },
        )
        .unwrap();

        assert_eq!(blocks, 1);
        assert_eq!(&compressed[compressed.len() - 2..], b"YZ");
    }

    #[test]
    fn large_input_spans_multiple_blocks_with_several_workers() {
        let big = vec![7u8; 4 * 1024 * 1024];
        let tar_bytes = build_tar(&[("big.bin", &big)]);
        let mut compressed = Vec::new();
        let blocks = encode(
            Cursor::new(tar_bytes),
            &mut compressed,
            EncodeOptions { preset: 0, jobs: 4 },
        )
        .unwrap();

        assert!(blocks > 1, "expected more than one data block, got {blocks}");
    }
}
