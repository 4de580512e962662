//! The reader stage: drives the tar parser over the input file while
//! re-chunking the exact same bytes into fixed-size blocks for the encoder
//! stage, and builds the file index as tar headers go by.
//!
//! The tar crate's own cursor is the only thing that reads the input file;
//! a tee wrapped around that cursor mirrors every byte it consumes into the
//! block currently being filled. This keeps the file index (needs header
//! offsets) and the block chunker (needs a plain byte stream) fed from a
//! single pass, rather than reading the input twice. Every tar header is
//! exactly 512 bytes, so the offset of a header just consumed is simply the
//! tee's running count from before that read.

use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;

use crate::block::{Message, Pipeline};
use crate::fileindex::{FileIndexBuilder, FileIndexEntry};

const TAR_HEADER_SIZE: u64 = 512;

/// Rotates filled blocks onto the encode queue and pulls fresh ones from
/// the free queue as they're needed.
struct BlockFeeder<'a> {
    pipeline: &'a Pipeline,
    block_in_size: usize,
    next_seq: u64,
    current: Box<crate::block::Block>,
}

impl<'a> BlockFeeder<'a> {
    fn new(pipeline: &'a Pipeline, block_in_size: usize) -> Self {
        BlockFeeder {
            pipeline,
            block_in_size,
            next_seq: 0,
            current: pipeline.take_free(),
        }
    }

    fn feed(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let room = self.block_in_size - self.current.input.len();
            let take = room.min(bytes.len());
            self.current.input.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];

            if self.current.input.len() == self.block_in_size {
                self.rotate();
            }
        }
    }

    fn rotate(&mut self) {
        let mut next = self.pipeline.take_free();
        std::mem::swap(&mut self.current, &mut next);
        next.seq = self.next_seq;
        self.next_seq += 1;
        self.pipeline
            .enc_tx
            .send(Message::Data(next))
            .expect("encode queue outlives the reader");
    }

    /// Flushes a final partial block, or returns an empty one to the free
    /// queue untouched.
    fn finish(mut self) {
        if self.current.input.is_empty() {
            self.pipeline
                .free_tx
                .send(Message::Data(self.current))
                .expect("free queue outlives the reader");
        } else {
            self.current.seq = self.next_seq;
            self.pipeline
                .enc_tx
                .send(Message::Data(self.current))
                .expect("encode queue outlives the reader");
        }
    }
}

/// Wraps a reader, forwarding every byte read into a [`BlockFeeder`] and
/// publishing the running total through a shared cell so code outside the
/// tar parser's borrow of this reader can still observe progress.
struct TeeReader<'a, R> {
    inner: R,
    feeder: BlockFeeder<'a>,
    total_read: Rc<Cell<u64>>,
}

impl<'a, R: Read> Read for TeeReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.feeder.feed(&buf[..n]);
            self.total_read.set(self.total_read.get() + n as u64);
        }
        Ok(n)
    }
}

/// Runs the reader stage to completion: parses `input` as a tar stream,
/// re-chunks its bytes onto the encode queue, and returns the file index
/// plus the total uncompressed tar byte count (the sentinel's offset).
pub fn run<R: Read>(
    input: R,
    pipeline: &Pipeline,
    block_in_size: usize,
    jobs: usize,
) -> crate::error::Result<(Vec<FileIndexEntry>, u64)> {
    let feeder = BlockFeeder::new(pipeline, block_in_size);
    let total_read = Rc::new(Cell::new(0u64));

    let tee = TeeReader {
        inner: input,
        feeder,
        total_read: Rc::clone(&total_read),
    };

    let mut index = FileIndexBuilder::new();
    let mut archive = tar::Archive::new(tee);
    {
        let mut entries = archive
            .entries()
            .map_err(|e| crate::error::TarXzError::Tar(e.to_string()))?;

        while let Some(entry) = entries.next() {
            let entry = entry.map_err(|e| crate::error::TarXzError::Tar(e.to_string()))?;
            let header_offset = total_read.get().saturating_sub(TAR_HEADER_SIZE);

            let path = entry
                .path()
                .map_err(|e| crate::error::TarXzError::Tar(e.to_string()))?
                .to_string_lossy()
                .into_owned();
            index.add_header(&path, header_offset);

            // Drain the entry's content so the tee observes every byte of
            // this member; the archive iterator skips any trailing padding
            // itself on the next call regardless of how much we read here.
            let mut entry = entry;
            io::copy(&mut entry, &mut io::sink())?;
        }
    }

    let total_read_final = total_read.get();
    archive.into_inner().feeder.finish();

    for _ in 0..jobs {
        pipeline
            .enc_tx
            .send(Message::Stop)
            .expect("encode queue outlives the reader");
    }

    Ok((index.finish(total_read_final), total_read_final))
}
