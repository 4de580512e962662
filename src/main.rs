//! tarxz - parallel block-oriented tar-to-XZ encoder with an embedded file index.
//!
//! Reads a tar stream and writes a standard XZ container whose blocks are
//! compressed independently across several threads, plus one trailing block
//! mapping every tar member's pathname to its offset in the uncompressed
//! archive.
//!
//! # Usage
//!
//! ```bash
//! # Compress with default settings (parallelism = available cores)
//! tarxz project.tar project.tar.xz
//!
//! # Limit worker thread count
//! tarxz project.tar project.tar.xz -j 4
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use tarxz_index::{encode, EncodeOptions};

/// Command-line arguments for tarxz.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input tar file
    input: PathBuf,

    /// Output XZ file
    output: PathBuf,

    /// Number of encoder worker threads (default = number of logical cores,
    /// or the TARXZ_JOBS environment variable if set)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

fn resolve_jobs(cli_jobs: Option<usize>) -> usize {
    if let Some(jobs) = cli_jobs {
        return jobs;
    }
    if let Ok(value) = std::env::var("TARXZ_JOBS") {
        if let Ok(jobs) = value.parse::<usize>() {
            return jobs;
        }
    }
    EncodeOptions::default().jobs
}

fn main() -> Result<()> {
    let args = Args::parse();

    let input = File::open(&args.input).context("failed to open input file")?;
    let output_file = File::create(&args.output).context("failed to create output file")?;
    let mut output = BufWriter::new(output_file);

    let options = EncodeOptions {
        preset: 6,
        jobs: resolve_jobs(args.jobs).max(1),
    };

    encode(input, &mut output, options).context("encoding failed")?;

    Ok(())
}
