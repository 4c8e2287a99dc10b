use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod align;
mod config;
mod detect;
mod spectrum;

pub use config::Config;

/// gcms-align - GC-MS diagnostic-ion peak detection and retention-time alignment
#[derive(Parser)]
#[command(name = "gcms-align")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate every configured compound in every input file
    Detect {
        /// Input mzXML files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Load compounds and search settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Peak table output path
        #[arg(short, long, default_value = "peaks.csv")]
        output: PathBuf,
    },

    /// Align every input file onto a reference file
    Align {
        /// Input mzXML files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Load compounds, search and alignment settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Reference file (defaults to the config's reference, then the first input)
        #[arg(long, value_name = "FILE")]
        reference: Option<PathBuf>,

        /// Reuse a peak table written by `detect` instead of detecting again
        #[arg(long, value_name = "FILE")]
        peaks: Option<PathBuf>,

        /// Directory for peaks.csv, regressions.csv and traces.csv
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Print the mass spectrum of a scan, or of a scan range, as CSV
    Spectrum {
        /// Input mzXML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Scan number to show
        #[arg(long, conflicts_with = "time", required_unless_present = "time")]
        scan: Option<u32>,

        /// Show the scan closest to this retention time (minutes)
        #[arg(long)]
        time: Option<f64>,

        /// Concatenate every scan up to this scan number
        #[arg(long, value_name = "SCAN")]
        until: Option<u32>,

        /// Ignore scans at or before this retention time (minutes)
        #[arg(long, value_name = "MINUTES")]
        start_time: Option<f64>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Detect {
            files,
            config,
            output,
        } => detect::run(files, config, output),
        Commands::Align {
            files,
            config,
            reference,
            peaks,
            output_dir,
        } => align::run(files, config, reference, peaks, output_dir),
        Commands::Spectrum {
            file,
            scan,
            time,
            until,
            start_time,
        } => spectrum::run(file, scan, time, until, start_time),
    }
}

/// Input paths as the source ids used in every output table.
fn source_ids(files: &[PathBuf]) -> Vec<String> {
    files.iter().map(|f| f.display().to_string()).collect()
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}
