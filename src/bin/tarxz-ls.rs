//! tarxz-ls - lists the blocks and embedded file index of a tarxz stream.
//!
//! # Usage
//!
//! ```bash
//! # List block sizes and the file index
//! tarxz-ls archive.tar.xz
//!
//! # Block sizes only, no file-index dump
//! tarxz-ls -t archive.tar.xz
//!
//! # Read from standard input (spooled to a temp file, since the index
//! # lives at the tail of the stream and stdin isn't seekable)
//! cat archive.tar.xz | tarxz-ls
//! ```

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use tarxz_index::lister::{read_file_index, read_summary};

/// Command-line arguments for tarxz-ls.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Stream to list (defaults to standard input)
    file: Option<PathBuf>,

    /// Suppress the file-index dump; print only block sizes
    #[arg(short = 't', long)]
    no_index: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut source = open_seekable(args.file.as_deref())?;
    let summary = read_summary(&mut source).context("failed to read stream index")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in &summary.records {
        writeln!(out, "{:9} / {:9}", record.unpadded_size, record.uncompressed_size)?;
    }

    if !args.no_index {
        let entries = read_file_index(&mut source, &summary).context("failed to read file index")?;
        writeln!(out)?;
        for entry in entries {
            writeln!(out, "{} {}", entry.name.as_deref().unwrap_or(""), entry.offset)?;
        }
    }

    Ok(())
}

/// Returns a seekable handle to `path`, or spools standard input to a temp
/// file when no path is given.
fn open_seekable(path: Option<&std::path::Path>) -> Result<File> {
    match path {
        Some(path) => File::open(path).context("failed to open input file"),
        None => {
            let mut spool = tempfile::tempfile().context("failed to create temp file for stdin spool")?;
            io::copy(&mut io::stdin().lock(), &mut spool).context("failed to spool stdin")?;
            Ok(spool)
        }
    }
}
