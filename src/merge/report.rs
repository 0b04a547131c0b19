//! JSON report written next to a merged document.

use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, ReturnScanError};
use crate::merge::merger::MergeResult;
use crate::merge::order::PageSlot;

/// Per-merge record of inputs, output and rotation decisions.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub front: PathBuf,
    pub back: PathBuf,
    pub output: PathBuf,
    pub pages_per_side: usize,
    pub rotated_pages: usize,
    pub unknown_pages: usize,
    pub pages: Vec<PageSlot>,
}

impl MergeReport {
    pub fn new(result: &MergeResult, output: &Path) -> Self {
        Self {
            created_at: Local::now().to_rfc3339(),
            front: result.front.clone(),
            back: result.back.clone(),
            output: output.to_path_buf(),
            pages_per_side: result.statistics.pages_per_side,
            rotated_pages: result.statistics.rotated_pages,
            unknown_pages: result.statistics.unknown_pages,
            pages: result.slots.clone(),
        }
    }

    /// Path of the report for a merged document: `<output>.json`.
    pub fn path_for(output: &Path) -> PathBuf {
        output.with_extension("json")
    }

    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| ReturnScanError::other(format!("Failed to serialize report: {e}")))?;

        tokio::fs::write(path, json)
            .await
            .map_err(|e| ReturnScanError::FailedToWrite {
                path: path.to_path_buf(),
                source: e,
            })
    }
}
