//! Orientation detection for scanned pages.
//!
//! A page is rendered to an image by a [`PageRenderer`] and handed to an
//! [`OrientationDetector`]. Both run external programs in production. Every
//! failure is captured as an [`OsdError`] and turned into
//! [`RotationDecision::Unknown`] by the [`RotationDetector`], so a missing or
//! broken OCR installation never stops a merge.

pub mod command;
pub mod detector;
pub mod render;
pub mod tesseract;

pub use detector::RotationDetector;
pub use render::{PageRenderer, PdftoppmRenderer};
pub use tesseract::TesseractDetector;

use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::merge::pages::PageRotation;

/// Failure of a single render or orientation detection call.
#[derive(Debug, thiserror::Error)]
pub enum OsdError {
    /// The external program could not be found.
    #[error("{program} is not installed or not on PATH")]
    NotInstalled { program: String },

    /// The external program did not finish in time and was killed.
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    /// The external program exited unsuccessfully.
    #[error("{program} failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The detector output carries no `Rotate:` line.
    #[error("no Rotate field in orientation output")]
    MissingRotation,

    /// The `Rotate:` value is not a number.
    #[error("unparsable rotation value: {value}")]
    UnparsableRotation { value: String },

    /// The `Rotate:` value is not one of 0, 90, 180 or 270.
    #[error("rotation angle out of range: {angle}")]
    InvalidAngle { angle: i64 },

    /// The renderer reported success but produced no image.
    #[error("rendered image missing: {}", .path.display())]
    ImageMissing { path: PathBuf },

    /// Orientation detection is switched off.
    #[error("orientation detection disabled")]
    Disabled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of orientation detection for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RotationDecision {
    /// The detector reported an angle; it is applied as-is.
    Detected { angle: PageRotation },

    /// Detection was skipped or failed; the page stays unrotated.
    Unknown { reason: String },
}

impl RotationDecision {
    pub fn unknown(reason: impl ToString) -> Self {
        Self::Unknown {
            reason: reason.to_string(),
        }
    }

    /// Rotation that will be applied to the page.
    pub fn applied_rotation(&self) -> PageRotation {
        match self {
            Self::Detected { angle } => *angle,
            Self::Unknown { .. } => PageRotation::None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

/// Determines how far a rendered page image is rotated.
pub trait OrientationDetector: Send + Sync {
    /// Detect the rotation needed to turn `image` upright.
    fn detect(&self, image: &Path) -> impl Future<Output = Result<PageRotation, OsdError>> + Send;
}

/// Extract the rotation from OSD output.
///
/// Looks for the first `Rotate: <degrees>` line, as printed by
/// `tesseract --psm 0`.
///
/// # Errors
///
/// Returns an error when the line is missing, not numeric, or not a
/// cardinal angle.
pub fn parse_osd_output(output: &str) -> Result<PageRotation, OsdError> {
    let value = output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Rotate:"))
        .map(str::trim)
        .ok_or(OsdError::MissingRotation)?;

    let angle: i64 = value.parse().map_err(|_| OsdError::UnparsableRotation {
        value: value.to_string(),
    })?;

    PageRotation::from_degrees(angle).ok_or(OsdError::InvalidAngle { angle })
}
