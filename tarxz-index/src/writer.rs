//! The writer stage: reassembles encoded blocks in ascending sequence
//! order, appends each to the output file, and builds the stream-level
//! index. Runs on the caller's thread (normally the process's main thread).

use std::io::Write;

use crossbeam_channel::Receiver;

use crate::block::{Message, Pipeline};
use crate::container::{self, CheckType, IndexRecord};
use crate::error::Result;
use crate::fileindex::FileIndexEntry;

/// Drains the write queue until `Stop`, then appends the file-index block,
/// the stream-level index, and the stream footer. Returns the recorded
/// sequence count purely for tests/diagnostics.
///
/// Runs concurrently with the reader and encoder threads: the main loop
/// below must keep pulling from `write_q` as blocks arrive, since blocks are
/// only returned to the buffer pool's free queue from here. `index_rx`
/// yields the finished file index once, sent by the reader only after it
/// has joined every encoder and is about to stop the write queue, so the
/// `recv()` after the loop never has to wait for work this stage hasn't
/// already observed via `Stop`.
pub fn run<W: Write>(
    pipeline: &Pipeline,
    out: &mut W,
    index_rx: Receiver<Vec<FileIndexEntry>>,
    dict_size: u32,
    preset: u32,
) -> Result<u64> {
    container::write_stream_header(out, CheckType::Crc32)?;

    let mut records: Vec<IndexRecord> = Vec::new();
    let mut pending: Vec<Box<crate::block::Block>> = Vec::new();
    let mut next_seq = 0u64;

    loop {
        let block = match pipeline
            .write_rx
            .recv()
            .expect("write queue outlives the writer")
        {
            Message::Stop => break,
            Message::Data(block) => block,
        };
        pending.push(block);

        while let Some(pos) = pending.iter().position(|b| b.seq == next_seq) {
            let block = pending.swap_remove(pos);
            append_block(out, &block.output, dict_size)?;
            records.push(block.index_record.expect("encoder always sets this"));
            pipeline
                .free_tx
                .send(Message::Data(block))
                .expect("free queue outlives the writer");
            next_seq += 1;
        }
    }

    debug_assert!(
        pending.is_empty(),
        "writer stopped with {} blocks still out of order",
        pending.len()
    );

    let file_index = index_rx
        .recv()
        .expect("reader sends the file index before stopping the write queue");
    let index_payload = crate::fileindex::compress_payload(&file_index, preset)?;
    append_block(out, &index_payload, dict_size)?;
    records.push(IndexRecord {
        unpadded_size: container::block_header_size(dict_size)?
            + index_payload.len() as u64
            + CheckType::Crc32.checksum_size(),
        uncompressed_size: index_payload_uncompressed_size(&file_index),
    });

    let index_size = container::write_index(out, &records)?;
    container::write_stream_footer(out, index_size, CheckType::Crc32)?;

    Ok(next_seq)
}

fn append_block<W: Write>(out: &mut W, compressed: &[u8], dict_size: u32) -> Result<()> {
    let header_size = container::write_block_header(out, dict_size)?;
    container::write_block_payload(out, header_size, compressed, CheckType::Crc32)?;
    Ok(())
}

fn index_payload_uncompressed_size(entries: &[FileIndexEntry]) -> u64 {
    entries
        .iter()
        .map(|e| e.name.as_ref().map_or(0, |n| n.len()) as u64 + 1 + 8)
        .sum()
}
