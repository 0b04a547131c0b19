//! Orientation detection through the tesseract OSD mode.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::command::run_with_timeout;
use super::{OrientationDetector, OsdError, parse_osd_output};
use crate::config::DEFAULT_OSD_TIMEOUT;
use crate::merge::pages::PageRotation;

/// Runs `tesseract <image> stdout --psm 0 -l osd` and reads its `Rotate:` line.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    program: PathBuf,
    timeout: Duration,
}

impl TesseractDetector {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, image: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(image)
            .arg("stdout")
            .args(["--psm", "0", "-l", "osd"]);
        command
    }
}

impl Default for TesseractDetector {
    fn default() -> Self {
        Self::new("tesseract", DEFAULT_OSD_TIMEOUT)
    }
}

impl OrientationDetector for TesseractDetector {
    async fn detect(&self, image: &Path) -> Result<PageRotation, OsdError> {
        let output = run_with_timeout(self.command(image), self.timeout).await?;
        parse_osd_output(&String::from_utf8_lossy(&output.stdout))
    }
}
