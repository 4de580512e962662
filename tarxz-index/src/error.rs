//! Fatal error taxonomy for the encode/list pipeline.
//!
//! Every error this crate returns is, by design, a reason to stop: there is no
//! retry path and no partial-success mode, because a half-written block
//! stream leaves the trailing index inconsistent with the bytes already on
//! disk. Callers are expected to print the error and exit.

use std::io;

/// Errors that can terminate an encode or list run.
#[derive(Debug, thiserror::Error)]
pub enum TarXzError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("lzma2/xz codec error: {0}")]
    Codec(String),

    #[error("malformed tar stream: {0}")]
    Tar(String),

    #[error("malformed xz container: {0}")]
    Container(String),

    #[error("worker thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, TarXzError>;
