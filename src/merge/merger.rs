//! Front/back merge implementation.
//!
//! This module combines the two single-sided scans of a [`ScanPair`] into
//! one document, interleaving the pages and correcting the rotation of
//! each page on the way.

use futures::stream::{self, StreamExt};
use lopdf::{Document, Object, ObjectId, dictionary};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, ReturnScanError};
use crate::io::PdfReader;
use crate::merge::order::{PageSlot, Side, interleave};
use crate::merge::pages::{apply_rotation, materialize_inherited_attributes};
use crate::osd::{
    OrientationDetector, PageRenderer, PdftoppmRenderer, RotationDecision, RotationDetector,
    TesseractDetector,
};
use crate::pairing::ScanPair;
use crate::utils::format_file_size;

/// Statistics about a merge operation.
#[derive(Debug, Clone)]
pub struct MergeStatistics {
    /// Pages in each input.
    pub pages_per_side: usize,

    /// Total number of pages in merged document.
    pub total_pages: usize,

    /// Pages whose rotation was changed.
    pub rotated_pages: usize,

    /// Pages for which orientation detection was skipped or failed.
    pub unknown_pages: usize,

    /// Total time taken for merge.
    pub merge_time: Duration,

    /// Total size of input files.
    pub input_size: u64,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }
}

/// Result of a merge operation.
#[derive(Debug)]
pub struct MergeResult {
    /// The merged PDF document.
    pub document: Document,

    /// Output pages in order, each with its rotation decision.
    pub slots: Vec<PageSlot>,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,

    /// Front-side input.
    pub front: PathBuf,

    /// Back-side input.
    pub back: PathBuf,
}

/// Merges a front/back pair into one document.
pub struct Merger<R, D> {
    reader: PdfReader,
    detector: RotationDetector<R, D>,
    jobs: usize,
    scratch_root: Option<PathBuf>,
}

impl Merger<PdftoppmRenderer, TesseractDetector> {
    /// Build the production merger from configuration.
    pub fn from_config(config: &Config) -> Self {
        let merger = Self::new(RotationDetector::from_settings(&config.osd))
            .with_jobs(config.effective_jobs());

        match &config.osd.scratch_dir {
            Some(root) => merger.with_scratch_root(root),
            None => merger,
        }
    }
}

impl<R, D> Merger<R, D>
where
    R: PageRenderer,
    D: OrientationDetector,
{
    pub fn new(detector: RotationDetector<R, D>) -> Self {
        Self {
            reader: PdfReader::new(),
            detector,
            jobs: 1,
            scratch_root: None,
        }
    }

    /// Number of pages rendered and analysed concurrently.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Directory under which rendered page images are kept during a merge.
    /// Defaults to the system temporary directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Merge `pair` into a single document.
    ///
    /// Output position `2k - 1` holds front page `k` and position `2k` holds
    /// back page `N - k + 1`. Every page is rotated according to its
    /// detected orientation; pages whose orientation is unknown keep their
    /// original rotation. Nothing is written to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either input can no longer be loaded
    /// - The inputs' page counts differ
    /// - The page tree cannot be rebuilt
    pub async fn merge(&self, pair: &ScanPair) -> Result<MergeResult> {
        let merge_start = Instant::now();

        let front = self.reader.load(pair.front().path()).await?;
        let back = self.reader.load(pair.back().path()).await?;

        if front.page_count != back.page_count {
            return Err(ReturnScanError::PageCountMismatch {
                front: front.path,
                front_pages: front.page_count,
                back: back.path,
                back_pages: back.page_count,
            });
        }

        if front.page_count != pair.pages_per_side() {
            debug!(
                discovered = pair.pages_per_side(),
                current = front.page_count,
                "Page count changed since discovery"
            );
        }

        let pages_per_side = u32::try_from(front.page_count)
            .map_err(|_| ReturnScanError::merge_failed("Too many pages"))?;
        let mut slots = interleave(pages_per_side);

        self.resolve_rotations(&front.path, &back.path, &mut slots)
            .await;

        let input_size = front.file_size + back.file_size;
        let document = assemble(front.document, back.document, &slots)?;

        let statistics = MergeStatistics {
            pages_per_side: front.page_count,
            total_pages: document.get_pages().len(),
            rotated_pages: slots
                .iter()
                .filter(|slot| !slot.applied_rotation().is_none())
                .count(),
            unknown_pages: slots
                .iter()
                .filter(|slot| slot.rotation.as_ref().is_none_or(RotationDecision::is_unknown))
                .count(),
            merge_time: merge_start.elapsed(),
            input_size,
        };

        Ok(MergeResult {
            document,
            slots,
            statistics,
            front: front.path,
            back: back.path,
        })
    }

    /// Resolve the rotation of every slot, `jobs` pages at a time.
    ///
    /// Decisions are stored by slot index, not completion order. Without a
    /// scratch directory every page is left unrotated.
    async fn resolve_rotations(
        &self,
        front: &Path,
        back: &Path,
        slots: &mut [PageSlot],
    ) {
        if !self.detector.is_enabled() {
            info!("Orientation detection disabled, pages keep their scanned rotation");
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("returnscan-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        let scratch = match scratch {
            Ok(scratch) => scratch,
            Err(err) => {
                warn!(error = %err, "Cannot create scratch directory, leaving pages unrotated");
                for slot in slots.iter_mut() {
                    slot.rotation = Some(RotationDecision::unknown(format!(
                        "scratch directory unavailable: {err}"
                    )));
                }
                return;
            }
        };
        let scratch_dir = scratch.path();

        let pages: Vec<(usize, &Path, u32, String)> = slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| {
                let pdf = match slot.side {
                    Side::Front => front,
                    Side::Back => back,
                };
                (idx, pdf, slot.source_page, slot.image_stem())
            })
            .collect();

        let tasks = pages.into_iter().map(|(idx, pdf, page, stem)| async move {
            let decision = self
                .detector
                .detect_rotation(pdf, page, scratch_dir, &stem)
                .await;
            (idx, decision)
        });

        let mut decisions: Vec<(usize, RotationDecision)> = stream::iter(tasks)
            .buffer_unordered(self.jobs)
            .collect()
            .await;

        decisions.sort_by_key(|(idx, _)| *idx);
        for (idx, decision) in decisions {
            slots[idx].rotation = Some(decision);
        }
    }
}

/// Build the interleaved document from the two inputs.
fn assemble(mut front: Document, mut back: Document, slots: &[PageSlot]) -> Result<Document> {
    materialize_inherited_attributes(&mut front)?;
    materialize_inherited_attributes(&mut back)?;

    // Renumber objects to avoid ID conflicts
    back.renumber_objects_with(front.max_id + 1);

    let front_pages = front.get_pages();
    let back_pages = back.get_pages();

    let version = if front.version >= back.version {
        front.version.clone()
    } else {
        back.version.clone()
    };

    let mut merged = Document::with_version(version);
    merged.max_id = front.max_id.max(back.max_id);
    merged.objects.extend(front.objects);
    merged.objects.extend(back.objects);

    let pages_id = merged.new_object_id();
    let mut kids = Vec::with_capacity(slots.len());

    for slot in slots {
        let page_id = lookup_page(&front_pages, &back_pages, slot)?;

        let page = merged
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| ReturnScanError::merge_failed(format!("Failed to get page: {e}")))?;

        page.set("Parent", Object::Reference(pages_id));
        apply_rotation(page, slot.applied_rotation());
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    // Drops the old catalogs, page trees and outlines.
    merged.prune_objects();
    merged.renumber_objects();

    Ok(merged)
}

fn lookup_page(
    front_pages: &BTreeMap<u32, ObjectId>,
    back_pages: &BTreeMap<u32, ObjectId>,
    slot: &PageSlot,
) -> Result<ObjectId> {
    let pages = match slot.side {
        Side::Front => front_pages,
        Side::Back => back_pages,
    };

    pages.get(&slot.source_page).copied().ok_or_else(|| {
        ReturnScanError::merge_failed(format!(
            "{} page {} missing",
            slot.side.as_str(),
            slot.source_page
        ))
    })
}
