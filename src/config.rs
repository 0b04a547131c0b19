//! Configuration module for returnscan.
//!
//! This module turns CLI arguments into a validated, normalized configuration
//! that drives the watch loop. It handles:
//! - Validation of argument combinations
//! - Application of defaults
//! - Resolution of derived paths (output and archive directories)

use anyhow::{Result, bail};

use crate::ReturnScanError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default time between two poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default maximum gap between the modification times of a front/back pair.
pub const DEFAULT_PAIR_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default window in which the newest file must have been modified for a
/// cycle to consider it a fresh scan (twice the poll interval).
pub const DEFAULT_RECENT_WINDOW: Duration = Duration::from_secs(120);

/// Default minimum age of the newest file before it is considered complete.
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_secs(5);

/// Default bound on a single orientation detection call.
pub const DEFAULT_OSD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default rendering resolution for orientation detection.
pub const DEFAULT_RENDER_DPI: u32 = 150;

/// File name prefix of merged output documents.
pub const MERGED_PREFIX: &str = "merged_";

/// Name of the archive directory created inside the watched directory.
pub const DEFAULT_ARCHIVE_DIR_NAME: &str = "processed";

/// What happens to the two input scans after a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMode {
    /// Move both inputs into the archive directory (default).
    #[default]
    Archive,
    /// Delete both inputs.
    Delete,
    /// Leave inputs in place; the pair is only remembered in memory.
    Keep,
}

impl FromStr for DisposalMode {
    type Err = ReturnScanError;

    /// Parse disposal mode from `archive`, `delete` or `keep`.
    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "archive" => Ok(Self::Archive),
            "delete" => Ok(Self::Delete),
            "keep" => Ok(Self::Keep),
            _ => Err(ReturnScanError::InvalidConfig {
                message: format!(
                    "Invalid disposal mode: {s}. Must be one of: archive, delete, keep"
                ),
            }),
        }
    }
}

/// Rules the pair finder applies to a directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRules {
    /// Maximum distance between the modification times of front and back.
    pub pair_window: Duration,

    /// The newest file must be at most this old; `None` disables the check.
    pub recent_window: Option<Duration>,

    /// The newest file must be at least this old to count as fully written.
    pub settle_time: Duration,

    /// Files whose name starts with this prefix are never candidates.
    pub merged_prefix: String,
}

impl Default for PairingRules {
    fn default() -> Self {
        Self {
            pair_window: DEFAULT_PAIR_WINDOW,
            recent_window: Some(DEFAULT_RECENT_WINDOW),
            settle_time: DEFAULT_SETTLE_TIME,
            merged_prefix: MERGED_PREFIX.to_string(),
        }
    }
}

/// Settings for page rendering and orientation detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdSettings {
    /// Run orientation detection at all.
    pub enabled: bool,

    /// Upper bound for one external command invocation.
    pub timeout: Duration,

    /// Rendering resolution in dots per inch.
    pub dpi: u32,

    /// Name or path of the tesseract binary.
    pub tesseract: PathBuf,

    /// Name or path of the pdftoppm binary.
    pub pdftoppm: PathBuf,

    /// Parent directory for rendered page images (None = system temp dir).
    pub scratch_dir: Option<PathBuf>,
}

impl Default for OsdSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: DEFAULT_OSD_TIMEOUT,
            dpi: DEFAULT_RENDER_DPI,
            tesseract: PathBuf::from("tesseract"),
            pdftoppm: PathBuf::from("pdftoppm"),
            scratch_dir: None,
        }
    }
}

/// Complete configuration for the watch service.
///
/// Derived and validated from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for new front/back pairs.
    pub watch_dir: PathBuf,

    /// Directory that receives merged documents.
    pub output_dir: PathBuf,

    /// Directory receiving consumed inputs in [`DisposalMode::Archive`].
    pub archive_dir: PathBuf,

    /// Time between two poll cycles.
    pub poll_interval: Duration,

    /// Pair detection rules.
    pub pairing: PairingRules,

    /// Disposal of consumed inputs.
    pub disposal: DisposalMode,

    /// Rendering and orientation detection.
    pub osd: OsdSettings,

    /// Number of pages rendered and analysed concurrently (None = auto-detect).
    pub jobs: Option<usize>,

    /// Write a JSON report next to every merged document.
    pub write_report: bool,

    /// Run a single poll cycle and exit.
    pub once: bool,

    /// Verbose logging.
    pub verbose: bool,

    /// Only log warnings and errors.
    pub quiet: bool,
}

impl Config {
    /// Create a configuration with default settings for a watched directory.
    ///
    /// Output goes to the watched directory itself and consumed inputs are
    /// archived to `<watch_dir>/processed`.
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        let watch_dir = watch_dir.into();
        Self {
            output_dir: watch_dir.clone(),
            archive_dir: watch_dir.join(DEFAULT_ARCHIVE_DIR_NAME),
            watch_dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
            pairing: PairingRules::default(),
            disposal: DisposalMode::default(),
            osd: OsdSettings::default(),
            jobs: None,
            write_report: false,
            once: false,
            verbose: false,
            quiet: false,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Verbose and quiet modes are both enabled
    /// - The poll interval or pair window is zero
    /// - Jobs count or rendering resolution is zero
    /// - The archive directory is the watched directory itself
    pub fn validate(&self) -> Result<()> {
        if self.verbose && self.quiet {
            bail!("Cannot use both --verbose and --quiet");
        }

        if self.poll_interval.is_zero() {
            bail!("Poll interval must be at least one second");
        }

        if self.pairing.pair_window.is_zero() {
            bail!("Pair window must be at least one second");
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            bail!("Number of jobs must be at least 1");
        }

        if self.osd.dpi == 0 {
            bail!("Rendering resolution must be a positive number of dpi");
        }

        if self.osd.enabled && self.osd.timeout.is_zero() {
            bail!("OSD timeout must be at least one second");
        }

        if self.disposal == DisposalMode::Archive && self.archive_dir == self.watch_dir {
            bail!(
                "Archive directory cannot be the watched directory: {}",
                self.archive_dir.display()
            );
        }

        Ok(())
    }

    /// Check that the watched directory exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`ReturnScanError::DirectoryNotFound`] or
    /// [`ReturnScanError::NotADirectory`].
    pub fn check_watch_dir(&self) -> crate::Result<()> {
        if !self.watch_dir.try_exists()? {
            return Err(ReturnScanError::directory_not_found(self.watch_dir.clone()));
        }

        if !self.watch_dir.is_dir() {
            return Err(ReturnScanError::not_a_directory(self.watch_dir.clone()));
        }

        Ok(())
    }

    /// Get the effective number of parallel page jobs.
    ///
    /// Returns the configured job count, or the number of CPU cores if auto-detect.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
