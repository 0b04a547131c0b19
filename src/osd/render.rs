//! Rendering PDF pages to images.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::OsdError;
use super::command::run_with_timeout;
use crate::config::DEFAULT_OSD_TIMEOUT;

/// Renders a single PDF page to an image file.
pub trait PageRenderer: Send + Sync {
    /// Render 1-based `page` of `pdf` at `dpi` into `out_dir`, returning the
    /// path of the produced image. `stem` names the output file.
    fn render_page(
        &self,
        pdf: &Path,
        page: u32,
        dpi: u32,
        out_dir: &Path,
        stem: &str,
    ) -> impl Future<Output = Result<PathBuf, OsdError>> + Send;
}

/// Renders through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    program: PathBuf,
    timeout: Duration,
}

impl PdftoppmRenderer {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, pdf: &Path, page: u32, dpi: u32, prefix: &Path) -> Command {
        let page = page.to_string();
        let mut command = Command::new(&self.program);
        command
            .args(["-r", &dpi.to_string()])
            .args(["-f", &page, "-l", &page])
            .args(["-png", "-singlefile"])
            .arg(pdf)
            .arg(prefix);
        command
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new("pdftoppm", DEFAULT_OSD_TIMEOUT)
    }
}

impl PageRenderer for PdftoppmRenderer {
    async fn render_page(
        &self,
        pdf: &Path,
        page: u32,
        dpi: u32,
        out_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, OsdError> {
        let prefix = out_dir.join(stem);
        run_with_timeout(self.command(pdf, page, dpi, &prefix), self.timeout).await?;

        // With -singlefile pdftoppm appends only the extension to the prefix.
        let image = prefix.with_extension("png");
        if !tokio::fs::try_exists(&image).await.unwrap_or(false) {
            return Err(OsdError::ImageMissing { path: image });
        }

        Ok(image)
    }
}
