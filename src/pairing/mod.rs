//! Scan pair discovery.
//!
//! A poll cycle takes a [`DirectoryListing`] snapshot of the watched
//! directory and hands it to the [`PairFinder`], which decides whether the
//! newest scan has a partner ready to be merged.

pub mod finder;

pub use finder::{PageCountCache, PageCountSource, PairFinder, PairOutcome, ScanPair};

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::config::PairingRules;
use crate::error::{Result, ReturnScanError};

/// A candidate PDF found in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanDocument {
    path: PathBuf,
    modified: SystemTime,
}

impl ScanDocument {
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// File name for log output.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Snapshot of the candidate documents in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    taken_at: SystemTime,
    documents: Vec<ScanDocument>,
}

impl DirectoryListing {
    pub fn new(taken_at: SystemTime, documents: Vec<ScanDocument>) -> Self {
        Self {
            taken_at,
            documents,
        }
    }

    /// Time the snapshot was taken.
    pub fn taken_at(&self) -> SystemTime {
        self.taken_at
    }

    pub fn documents(&self) -> &[ScanDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop documents for which `keep` returns false.
    pub fn retain(&mut self, keep: impl FnMut(&ScanDocument) -> bool) {
        self.documents.retain(keep);
    }
}

/// List the candidate PDFs directly inside `dir`.
///
/// Matches `*.pdf` case-insensitively, skips hidden files and anything
/// carrying the merged-output prefix. Entries that vanish while listing are
/// skipped.
///
/// # Errors
///
/// Returns [`ReturnScanError::ListingFailed`] when the directory is missing
/// or cannot be read.
pub fn list_directory(dir: &Path, rules: &PairingRules) -> Result<DirectoryListing> {
    let listing_failed = |reason: String| ReturnScanError::ListingFailed {
        path: dir.to_path_buf(),
        reason,
    };

    if !dir.is_dir() {
        return Err(listing_failed("directory is missing".to_string()));
    }

    let dir_str = dir
        .to_str()
        .ok_or_else(|| listing_failed("path is not valid UTF-8".to_string()))?;
    let pattern = format!("{}/*.pdf", Pattern::escape(dir_str.trim_end_matches('/')));

    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let entries = glob::glob_with(&pattern, options).map_err(|e| listing_failed(e.to_string()))?;

    let mut documents = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(path = %err.path().display(), error = %err.error(), "Skipping unreadable entry");
                continue;
            }
        };

        if !is_candidate(&path, rules) {
            continue;
        }

        let modified = match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata.modified()?,
            Ok(_) => continue,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Entry vanished while listing");
                continue;
            }
        };

        documents.push(ScanDocument::new(path, modified));
    }

    Ok(DirectoryListing::new(SystemTime::now(), documents))
}

fn is_candidate(path: &Path, rules: &PairingRules) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    !name.starts_with('.') && !name.starts_with(rules.merged_prefix.as_str())
}
