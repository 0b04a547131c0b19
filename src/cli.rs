//! CLI argument parsing for returnscan.
//!
//! This module defines the command-line interface using `clap`. Every
//! option can also be set through a `RETURNSCAN_*` environment variable.
//!
//! # Examples
//!
//! ```no_run
//! use returnscan::cli::Cli;
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! println!("Watching {}", cli.watch_dir.display());
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{
    Config, DEFAULT_ARCHIVE_DIR_NAME, DisposalMode, MERGED_PREFIX, OsdSettings, PairingRules,
};
use crate::error::{Result, ReturnScanError};

/// Merge duplex scans made with a simplex feeder.
///
/// returnscan watches a directory for pairs of PDFs: the front sides of a
/// stack, then the back sides scanned after flipping the stack. It
/// interleaves them into one document, corrects the orientation of every
/// page, and archives the inputs.
#[derive(Parser, Debug)]
#[command(name = "returnscan")]
#[command(version)]
#[command(about = "Merge front and back scans into one duplex PDF", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Directory the scanner writes into
    ///
    /// Polled for new front/back pairs until the process is stopped.
    #[arg(value_name = "DIR", env = "RETURNSCAN_WATCH_DIR")]
    pub watch_dir: PathBuf,

    /// Directory receiving merged documents
    ///
    /// Defaults to the watched directory. Merged files are named
    /// merged_<timestamp>_<front>_and_<back>.pdf and never picked up again.
    #[arg(long, value_name = "DIR", env = "RETURNSCAN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Seconds between two directory polls
    #[arg(long, value_name = "SECS", default_value_t = 60, env = "RETURNSCAN_INTERVAL")]
    pub interval: u64,

    /// Maximum gap in seconds between the front and back scans
    #[arg(long, value_name = "SECS", default_value_t = 300, env = "RETURNSCAN_PAIR_WINDOW")]
    pub pair_window: u64,

    /// Only pair if the newest scan is at most this many seconds old
    ///
    /// Keeps an old lone scan from pairing with something much later.
    /// Use 0 to disable the check.
    #[arg(long, value_name = "SECS", default_value_t = 120, env = "RETURNSCAN_RECENT_WINDOW")]
    pub recent_window: u64,

    /// Minimum age in seconds of the newest scan before it is read
    ///
    /// Gives the scanner time to finish writing the file.
    #[arg(long, value_name = "SECS", default_value_t = 5, env = "RETURNSCAN_SETTLE")]
    pub settle: u64,

    /// What to do with the two inputs after a successful merge
    ///
    /// - archive: move them into the archive directory (default)
    /// - delete: remove them
    /// - keep: leave them in place
    #[arg(long, value_name = "MODE", default_value = "archive", env = "RETURNSCAN_DISPOSE")]
    #[arg(value_parser = ["archive", "delete", "keep"])]
    pub dispose: String,

    /// Archive directory for consumed inputs
    ///
    /// Defaults to <DIR>/processed.
    #[arg(long, value_name = "DIR", env = "RETURNSCAN_ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Timeout in seconds for one render or orientation detection call
    #[arg(long, value_name = "SECS", default_value_t = 30, env = "RETURNSCAN_OSD_TIMEOUT")]
    pub osd_timeout: u64,

    /// Resolution used to render pages for orientation detection
    #[arg(long, value_name = "DPI", default_value_t = 150, env = "RETURNSCAN_DPI")]
    pub dpi: u32,

    /// Skip orientation detection and keep every page as scanned
    #[arg(long, env = "RETURNSCAN_NO_OSD")]
    pub no_osd: bool,

    /// Path of the tesseract binary
    #[arg(long, value_name = "PATH", env = "RETURNSCAN_TESSERACT")]
    pub tesseract: Option<PathBuf>,

    /// Path of the pdftoppm binary
    #[arg(long, value_name = "PATH", env = "RETURNSCAN_PDFTOPPM")]
    pub pdftoppm: Option<PathBuf>,

    /// Directory for rendered page images
    ///
    /// A temporary subdirectory is created here for every merge and removed
    /// afterwards. Defaults to the system temporary directory.
    #[arg(long, value_name = "DIR", env = "RETURNSCAN_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Number of pages rendered and analysed concurrently
    ///
    /// Default is number of CPU cores. Use 1 for sequential processing.
    #[arg(short, long, value_name = "N", env = "RETURNSCAN_JOBS")]
    pub jobs: Option<usize>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Write a JSON report with per-page rotation decisions next to each
    /// merged document
    #[arg(long, env = "RETURNSCAN_REPORT")]
    pub report: bool,

    /// Verbose output - also log why pairs were rejected
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// Returns [`ReturnScanError::InvalidConfig`] if the disposal mode is
    /// unknown or the resulting configuration fails validation.
    pub fn to_config(&self) -> Result<Config> {
        let disposal = DisposalMode::from_str(&self.dispose)?;

        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| self.watch_dir.clone());
        let archive_dir = self
            .archive_dir
            .clone()
            .unwrap_or_else(|| self.watch_dir.join(DEFAULT_ARCHIVE_DIR_NAME));

        let pairing = PairingRules {
            pair_window: Duration::from_secs(self.pair_window),
            recent_window: (self.recent_window > 0)
                .then(|| Duration::from_secs(self.recent_window)),
            settle_time: Duration::from_secs(self.settle),
            merged_prefix: MERGED_PREFIX.to_string(),
        };

        let defaults = OsdSettings::default();
        let osd = OsdSettings {
            enabled: !self.no_osd,
            timeout: Duration::from_secs(self.osd_timeout),
            dpi: self.dpi,
            tesseract: self.tesseract.clone().unwrap_or(defaults.tesseract),
            pdftoppm: self.pdftoppm.clone().unwrap_or(defaults.pdftoppm),
            scratch_dir: self.scratch_dir.clone(),
        };

        let config = Config {
            watch_dir: self.watch_dir.clone(),
            output_dir,
            archive_dir,
            poll_interval: Duration::from_secs(self.interval),
            pairing,
            disposal,
            osd,
            jobs: self.jobs,
            write_report: self.report,
            once: self.once,
            verbose: self.verbose,
            quiet: self.quiet,
        };

        config.validate().map_err(|e| {
            ReturnScanError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;

        Ok(config)
    }

    /// Validate CLI arguments before processing.
    ///
    /// Performs the checks that need no file I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<()> {
        if self.watch_dir.as_os_str().is_empty() {
            return Err(ReturnScanError::invalid_config(
                "No directory to watch specified",
            ));
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            return Err(ReturnScanError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }

        if self.interval == 0 {
            return Err(ReturnScanError::invalid_config(
                "Poll interval must be at least one second",
            ));
        }

        if !["archive", "delete", "keep"].contains(&self.dispose.as_str()) {
            return Err(ReturnScanError::invalid_config(format!(
                "Invalid disposal mode: {}",
                self.dispose
            )));
        }

        Ok(())
    }
}
