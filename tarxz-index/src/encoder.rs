//! Encoder worker loop: pulls filled blocks off the encode queue,
//! compresses them independently of sequence order, and hands the result to
//! the writer queue. `seq` passes through untouched.

use crate::block::{Message, Pipeline};
use crate::container::{CheckType, IndexRecord};
use crate::error::Result;

/// Runs one encoder worker to completion (until it sees `Stop`).
///
/// `block_header_size` is the same for every block in a run (it depends
/// only on the fixed filter chain and dictionary size), so it's computed
/// once by the pipeline setup and threaded through rather than recomputed
/// per block.
pub fn run(pipeline: &Pipeline, preset: u32, block_header_size: u64) -> Result<()> {
    loop {
        let mut block = match pipeline
            .enc_rx
            .recv()
            .expect("encode queue outlives every worker")
        {
            Message::Stop => return Ok(()),
            Message::Data(block) => block,
        };

        crate::lzma::compress_block(&block.input, preset, &mut block.output)?;

        block.index_record = Some(IndexRecord {
            unpadded_size: block_header_size
                + block.output.len() as u64
                + CheckType::Crc32.checksum_size(),
            uncompressed_size: block.input.len() as u64,
        });

        pipeline
            .write_tx
            .send(Message::Data(block))
            .expect("write queue outlives every worker");
    }
}
