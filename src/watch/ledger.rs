//! In-memory record of consumed scans.
//!
//! The filesystem is the primary record of what has been merged: consumed
//! inputs are moved or deleted. When they stay in place (keep mode, or a
//! failed disposal) the ledger stops them from being paired again.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::pairing::{DirectoryListing, ScanDocument};

/// File identities (path and modification time) already merged.
#[derive(Debug, Default)]
pub struct ConsumedLedger {
    entries: HashSet<(PathBuf, SystemTime)>,
}

impl ConsumedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, document: &ScanDocument) {
        self.entries
            .insert((document.path().to_path_buf(), document.modified()));
    }

    /// A rewritten file (new modification time) is not considered consumed.
    pub fn contains(&self, document: &ScanDocument) -> bool {
        self.entries
            .contains(&(document.path().to_path_buf(), document.modified()))
    }

    /// Drop entries whose file no longer appears in `listing`.
    pub fn retain_listed(&mut self, listing: &DirectoryListing) {
        self.entries
            .retain(|(path, modified)| {
                listing
                    .documents()
                    .iter()
                    .any(|doc| doc.path() == path && doc.modified() == *modified)
            });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
