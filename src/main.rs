//! # gcms-align
//!
//! Command-line front end for GC-MS peak detection and alignment.
//!
//! ## Usage
//!
//! ```bash
//! # Locate the configured compounds in every file
//! gcms-align detect runs/*.mzXML --config gcms.toml --output peaks.csv
//!
//! # Detect, then align every file onto the first one
//! gcms-align align runs/*.mzXML --config gcms.toml --output-dir aligned/
//!
//! # Print the mass spectrum of one scan
//! gcms-align spectrum runs/sample.mzXML --scan 1520
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
