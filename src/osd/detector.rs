//! Per-page rotation decisions.

use std::path::Path;
use tracing::{debug, warn};

use super::{OrientationDetector, OsdError, PageRenderer, RotationDecision};
use super::{PdftoppmRenderer, TesseractDetector};
use crate::config::{DEFAULT_RENDER_DPI, OsdSettings};

/// Renders a page and asks the orientation detector about it.
///
/// Never fails: every error is logged and reported as
/// [`RotationDecision::Unknown`].
#[derive(Debug, Clone)]
pub struct RotationDetector<R, D> {
    renderer: R,
    detector: D,
    dpi: u32,
    enabled: bool,
}

impl RotationDetector<PdftoppmRenderer, TesseractDetector> {
    /// Build the production detector from configuration.
    pub fn from_settings(settings: &OsdSettings) -> Self {
        let detector = Self::new(
            PdftoppmRenderer::new(&settings.pdftoppm, settings.timeout),
            TesseractDetector::new(&settings.tesseract, settings.timeout),
        )
        .with_dpi(settings.dpi);

        if settings.enabled {
            detector
        } else {
            detector.disabled()
        }
    }
}

impl<R, D> RotationDetector<R, D>
where
    R: PageRenderer,
    D: OrientationDetector,
{
    pub fn new(renderer: R, detector: D) -> Self {
        Self {
            renderer,
            detector,
            dpi: DEFAULT_RENDER_DPI,
            enabled: true,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Switch detection off; every page is reported as unknown.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decide the rotation of 1-based `page` of `pdf`.
    ///
    /// The rendered image is written to `scratch_dir` under `stem` and
    /// removed again once detection finished.
    pub async fn detect_rotation(
        &self,
        pdf: &Path,
        page: u32,
        scratch_dir: &Path,
        stem: &str,
    ) -> RotationDecision {
        if !self.enabled {
            return RotationDecision::unknown(OsdError::Disabled);
        }

        let image = match self
            .renderer
            .render_page(pdf, page, self.dpi, scratch_dir, stem)
            .await
        {
            Ok(image) => image,
            Err(err) => {
                warn!(pdf = %pdf.display(), page, error = %err, "Page rendering failed, leaving page unrotated");
                return RotationDecision::unknown(err);
            }
        };

        let decision = match self.detector.detect(&image).await {
            Ok(angle) => {
                debug!(pdf = %pdf.display(), page, degrees = angle.as_degrees(), "Orientation detected");
                RotationDecision::Detected { angle }
            }
            Err(err) => {
                warn!(pdf = %pdf.display(), page, error = %err, "Orientation detection failed, leaving page unrotated");
                RotationDecision::unknown(err)
            }
        };

        if let Err(err) = tokio::fs::remove_file(&image).await {
            debug!(image = %image.display(), error = %err, "Could not remove rendered page");
        }

        decision
    }
}
