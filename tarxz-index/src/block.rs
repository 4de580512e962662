//! The block record that circulates between the reader, the encoder workers
//! and the writer, plus the bounded queues that hand it between them.
//!
//! A block record is never shared: it moves by value across a channel, so
//! the type system (not a runtime discipline) guarantees only one stage
//! touches it at a time.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::container::IndexRecord;

/// One pipeline unit of work: a chunk of raw tar bytes on the way in, its
/// compressed form on the way out.
pub struct Block {
    /// Strictly increasing, assigned once by the reader.
    pub seq: u64,
    /// Raw bytes read from the input, `0..insize` is populated.
    pub input: Vec<u8>,
    /// Compressed bytes written by the encoder worker, `0..outsize` is populated.
    pub output: Vec<u8>,
    /// Set once the encoder has compressed this block.
    pub index_record: Option<IndexRecord>,
}

impl Block {
    fn new(in_capacity: usize, out_capacity: usize) -> Self {
        Block {
            seq: 0,
            input: Vec::with_capacity(in_capacity),
            output: Vec::with_capacity(out_capacity),
            index_record: None,
        }
    }

    fn reset(&mut self) {
        self.seq = 0;
        self.input.clear();
        self.output.clear();
        self.index_record = None;
    }
}

/// A tagged message carried on every pipeline queue.
///
/// `Stop` is delivered like any other message: consumers see every `Data`
/// message that precedes it before they see the `Stop` itself.
pub enum Message {
    Data(Box<Block>),
    Stop,
}

/// The three bounded channels connecting reader, encoders and writer, plus
/// the fixed pool of block records that circulates through them.
///
/// Sized at `2 * jobs + 4`: enough for every encoder to have one block in
/// hand and one queued, plus a few in flight between the reader and the
/// writer. See the design notes for why a tighter bound risks reader stalls.
pub struct Pipeline {
    pub free_rx: Receiver<Message>,
    pub free_tx: Sender<Message>,
    pub enc_rx: Receiver<Message>,
    pub enc_tx: Sender<Message>,
    pub write_rx: Receiver<Message>,
    pub write_tx: Sender<Message>,
}

impl Pipeline {
    pub fn new(jobs: usize, block_in_size: usize, block_out_size: usize) -> Self {
        let pool_size = 2 * jobs + 4;
        let (free_tx, free_rx) = bounded(pool_size);
        let (enc_tx, enc_rx) = bounded(pool_size);
        let (write_tx, write_rx) = bounded(pool_size);

        for _ in 0..pool_size {
            let block = Block::new(block_in_size, block_out_size);
            free_tx
                .send(Message::Data(Box::new(block)))
                .expect("free queue has room for every pooled block at startup");
        }

        Pipeline {
            free_rx,
            free_tx,
            enc_rx,
            enc_tx,
            write_rx,
            write_tx,
        }
    }

    /// Pulls one recycled block off the free queue, clearing it for reuse.
    pub fn take_free(&self) -> Box<Block> {
        match self
            .free_rx
            .recv()
            .expect("free queue outlives every stage that pulls from it")
        {
            Message::Data(mut block) => {
                block.reset();
                block
            }
            Message::Stop => unreachable!("free queue never carries Stop"),
        }
    }
}
