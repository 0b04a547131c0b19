//! The polling job driver.
//!
//! Every poll interval the watcher lists the watched directory, asks the
//! pair finder for an eligible pair and, on a hit, merges it, writes the
//! result and disposes of the inputs. Cycles run strictly one after the
//! other. A failing merge is logged and leaves its inputs untouched; the
//! next cycle runs as usual.

pub mod disposal;
pub mod ledger;

pub use disposal::{Disposal, Disposer};
pub use ledger::ConsumedLedger;

use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::task;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, ReturnScanError};
use crate::io::{PdfReader, PdfWriter};
use crate::merge::{MergeReport, Merger};
use crate::osd::{OrientationDetector, PageRenderer, PdftoppmRenderer, TesseractDetector};
use crate::pairing::{
    DirectoryListing, PageCountCache, PairFinder, PairOutcome, ScanPair, list_directory,
};
use crate::utils::file_stem_lossy;

/// Summary of a successful merge job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub front: PathBuf,
    pub back: PathBuf,
    pub output: PathBuf,
    pub total_pages: usize,
    /// Both inputs were archived or deleted.
    pub inputs_disposed: bool,
}

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No pair was merged; the finder's explanation.
    Idle(PairOutcome),
    /// A pair was merged.
    Merged(MergeSummary),
}

/// Watches a directory and merges scan pairs as they appear.
pub struct Watcher<R, D> {
    config: Config,
    finder: PairFinder,
    page_counts: PageCountCache,
    merger: Merger<R, D>,
    writer: PdfWriter,
    disposer: Disposer,
    ledger: ConsumedLedger,
}

impl Watcher<PdftoppmRenderer, TesseractDetector> {
    /// Build the production watcher from configuration.
    pub fn from_config(config: Config) -> Self {
        let merger = Merger::from_config(&config);
        Self::new(config, merger)
    }
}

impl<R, D> Watcher<R, D>
where
    R: PageRenderer,
    D: OrientationDetector,
{
    pub fn new(config: Config, merger: Merger<R, D>) -> Self {
        Self {
            finder: PairFinder::new(config.pairing.clone()),
            page_counts: PageCountCache::new(PdfReader::new()),
            merger,
            writer: PdfWriter::new(),
            disposer: Disposer::new(config.disposal, config.archive_dir.clone()),
            ledger: ConsumedLedger::new(),
            config,
        }
    }

    pub fn ledger(&self) -> &ConsumedLedger {
        &self.ledger
    }

    /// Page counts cached across poll cycles.
    pub fn page_counts(&self) -> &PageCountCache {
        &self.page_counts
    }

    /// Poll until Ctrl-C is received, or once with `--once`.
    ///
    /// Ctrl-C is only observed between cycles; a running merge completes
    /// first.
    ///
    /// Failed cycles are logged and polling continues.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            dir = %self.config.watch_dir.display(),
            interval_secs = self.config.poll_interval.as_secs(),
            "Watching for scan pairs"
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut listen_for_shutdown = true;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                signal = &mut shutdown, if listen_for_shutdown => match signal {
                    Ok(()) => {
                        info!("Shutdown requested, stopping");
                        return Ok(());
                    }
                    Err(err) => {
                        warn!(error = %err, "Cannot listen for Ctrl-C");
                        listen_for_shutdown = false;
                        continue;
                    }
                },
            }

            if let Err(err) = self.poll_once().await {
                if err.is_recoverable() {
                    error!(error = %err, "Merge job failed, inputs left in place");
                } else {
                    error!(error = %err, "Poll cycle failed");
                }
            }

            if self.config.once {
                return Ok(());
            }
        }
    }

    /// Run a single poll cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or the merge job
    /// fails. Pairing rejections are not errors.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome> {
        let mut listing = list_directory(&self.config.watch_dir, self.finder.rules())?;

        self.ledger.retain_listed(&listing);
        listing.retain(|document| !self.ledger.contains(document));
        self.page_counts.retain_listed(&listing);

        debug!(candidates = listing.len(), "Directory listed");

        let pair = match self.evaluate(listing).await? {
            PairOutcome::Ready(pair) => pair,
            outcome @ PairOutcome::Ambiguous { .. } => {
                warn!(%outcome, "Not merging");
                return Ok(CycleOutcome::Idle(outcome));
            }
            outcome => {
                debug!(%outcome, "No pair this cycle");
                return Ok(CycleOutcome::Idle(outcome));
            }
        };

        info!(
            front = %pair.front().name(),
            back = %pair.back().name(),
            pages_per_side = pair.pages_per_side(),
            "Scan pair detected"
        );

        self.process(pair).await.map(CycleOutcome::Merged)
    }

    /// Run the pair finder on a blocking thread; page counting parses PDFs.
    async fn evaluate(&mut self, listing: DirectoryListing) -> Result<PairOutcome> {
        let finder = self.finder.clone();
        let mut page_counts = std::mem::take(&mut self.page_counts);

        let (outcome, page_counts) = task::spawn_blocking(move || {
            let outcome = finder.evaluate(&listing, &mut page_counts);
            (outcome, page_counts)
        })
        .await
        .map_err(|e| ReturnScanError::other(format!("Pairing task failed: {e}")))?;

        self.page_counts = page_counts;
        Ok(outcome)
    }

    async fn process(&mut self, pair: ScanPair) -> Result<MergeSummary> {
        let result = self.merger.merge(&pair).await?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| ReturnScanError::FailedToCreateOutput {
                path: self.config.output_dir.clone(),
                source: e,
            })?;

        let output = self
            .config
            .output_dir
            .join(output_file_name(&self.finder.rules().merged_prefix, &pair, Local::now()));

        let report = self
            .config
            .write_report
            .then(|| MergeReport::new(&result, &output));
        let statistics = result.statistics.clone();

        let written = self.writer.save_with_stats(result.document, &output).await?;

        info!(
            output = %output.display(),
            pages = statistics.total_pages,
            rotated = statistics.rotated_pages,
            unknown = statistics.unknown_pages,
            input_size = %statistics.format_input_size(),
            size = %written.format_file_size(),
            elapsed_ms = statistics.merge_time.as_millis() as u64,
            "Merged scan pair"
        );

        if let Some(report) = report {
            let path = MergeReport::path_for(&output);
            if let Err(err) = report.write(&path).await {
                warn!(error = %err, "Failed to write merge report");
            }
        }

        let inputs_disposed = self.dispose_inputs(&pair).await;

        Ok(MergeSummary {
            front: pair.front().path().to_path_buf(),
            back: pair.back().path().to_path_buf(),
            output,
            total_pages: statistics.total_pages,
            inputs_disposed,
        })
    }

    /// Dispose of both inputs; anything left in place goes into the ledger.
    async fn dispose_inputs(&mut self, pair: &ScanPair) -> bool {
        let mut all_disposed = true;

        for document in [pair.front(), pair.back()] {
            match self.disposer.dispose(document.path()).await {
                Ok(Disposal::Kept) => {
                    self.ledger.record(document);
                    all_disposed = false;
                }
                Ok(disposal) => {
                    debug!(
                        input = %document.path().display(),
                        mode = ?self.disposer.mode(),
                        ?disposal,
                        "Input disposed"
                    );
                }
                Err(err) => {
                    warn!(error = %err, "Input stays in place and will be ignored");
                    self.ledger.record(document);
                    all_disposed = false;
                }
            }
        }

        all_disposed
    }
}

/// File name of a merged document:
/// `<prefix><YYYYmmdd_HHMMSS>_<front stem>_and_<back stem>.pdf`.
pub fn output_file_name(prefix: &str, pair: &ScanPair, timestamp: DateTime<Local>) -> String {
    format!(
        "{prefix}{}_{}_and_{}.pdf",
        timestamp.format("%Y%m%d_%H%M%S"),
        file_stem_lossy(pair.front().path()),
        file_stem_lossy(pair.back().path())
    )
}
