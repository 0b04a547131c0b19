//! Front/back pair selection.
//!
//! The finder looks at the newest document in a listing (the anchor) and
//! tries to find exactly one partner scanned shortly before or after it.
//! It never touches the filesystem itself; page counts come from a
//! [`PageCountSource`] so that tests can supply fixed values.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

use super::{DirectoryListing, ScanDocument};
use crate::config::PairingRules;
use crate::error::Result;
use crate::io::PdfReader;
use crate::utils::time_gap;

/// Supplies page counts for candidate documents.
pub trait PageCountSource {
    /// Count the pages of `document`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be parsed, typically because it
    /// is still being written.
    fn page_count(&mut self, document: &ScanDocument) -> Result<usize>;
}

/// Page counts read from disk, cached by path and modification time.
///
/// A document whose modification time changes is read again. Failed reads
/// are not cached so that a file that was still being written is retried on
/// the next cycle.
#[derive(Debug, Default)]
pub struct PageCountCache {
    reader: PdfReader,
    entries: HashMap<PathBuf, (SystemTime, usize)>,
}

impl PageCountCache {
    pub fn new(reader: PdfReader) -> Self {
        Self {
            reader,
            entries: HashMap::new(),
        }
    }

    /// Forget documents that are no longer part of the listing.
    pub fn retain_listed(&mut self, listing: &DirectoryListing) {
        self.entries.retain(|path, _| {
            listing
                .documents()
                .iter()
                .any(|document| document.path() == path)
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PageCountSource for PageCountCache {
    fn page_count(&mut self, document: &ScanDocument) -> Result<usize> {
        if let Some(&(modified, count)) = self.entries.get(document.path())
            && modified == document.modified()
        {
            return Ok(count);
        }

        let count = self.reader.page_count(document.path())?;
        self.entries.insert(
            document.path().to_path_buf(),
            (document.modified(), count),
        );
        Ok(count)
    }
}

/// A confirmed front/back pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPair {
    front: ScanDocument,
    back: ScanDocument,
    pages_per_side: usize,
}

impl ScanPair {
    /// Order two documents into a pair: the earlier scan is the front side.
    /// Equal modification times fall back to path order.
    pub fn from_documents(a: ScanDocument, b: ScanDocument, pages_per_side: usize) -> Self {
        let (front, back) = if (a.modified(), a.path()) <= (b.modified(), b.path()) {
            (a, b)
        } else {
            (b, a)
        };

        Self {
            front,
            back,
            pages_per_side,
        }
    }

    pub fn front(&self) -> &ScanDocument {
        &self.front
    }

    pub fn back(&self) -> &ScanDocument {
        &self.back
    }

    /// Page count of each side at discovery time.
    pub fn pages_per_side(&self) -> usize {
        self.pages_per_side
    }
}

/// Result of evaluating one directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// A pair is ready to be merged.
    Ready(ScanPair),

    /// No readable candidate documents.
    NoCandidates,

    /// The newest document may still be written.
    Unsettled { anchor: PathBuf, age: Duration },

    /// The newest document is older than the recent-activity window.
    Stale { anchor: PathBuf, age: Duration },

    /// Nothing else was scanned within the pair window of the newest document.
    NoPartner { anchor: PathBuf },

    /// More than one document lies within the pair window.
    Ambiguous {
        anchor: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// Both documents are in the window but their page counts differ.
    PageCountMismatch {
        anchor: PathBuf,
        anchor_pages: usize,
        partner: PathBuf,
        partner_pages: usize,
    },
}

impl PairOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn into_pair(self) -> Option<ScanPair> {
        match self {
            Self::Ready(pair) => Some(pair),
            _ => None,
        }
    }
}

impl fmt::Display for PairOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(pair) => write!(
                f,
                "pair ready: front {} / back {} ({} page(s) each)",
                pair.front().name(),
                pair.back().name(),
                pair.pages_per_side()
            ),
            Self::NoCandidates => write!(f, "no candidate documents"),
            Self::Unsettled { anchor, age } => write!(
                f,
                "{} modified {}s ago, waiting for it to settle",
                anchor.display(),
                age.as_secs()
            ),
            Self::Stale { anchor, age } => write!(
                f,
                "no recent scans (newest {} is {}s old)",
                anchor.display(),
                age.as_secs()
            ),
            Self::NoPartner { anchor } => {
                write!(f, "no partner within pair window for {}", anchor.display())
            }
            Self::Ambiguous { anchor, candidates } => write!(
                f,
                "{} candidate(s) within pair window of {}, refusing to guess",
                candidates.len(),
                anchor.display()
            ),
            Self::PageCountMismatch {
                anchor,
                anchor_pages,
                partner,
                partner_pages,
            } => write!(
                f,
                "page count mismatch: {} has {anchor_pages}, {} has {partner_pages}",
                anchor.display(),
                partner.display()
            ),
        }
    }
}

/// Selects at most one eligible pair per directory snapshot.
#[derive(Debug, Clone, Default)]
pub struct PairFinder {
    rules: PairingRules,
}

impl PairFinder {
    pub fn new(rules: PairingRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PairingRules {
        &self.rules
    }

    /// Return the eligible pair in `listing`, if there is one.
    pub fn find_eligible_pair<S: PageCountSource>(
        &self,
        listing: &DirectoryListing,
        source: &mut S,
    ) -> Option<ScanPair> {
        self.evaluate(listing, source).into_pair()
    }

    /// Evaluate `listing` and explain the decision.
    ///
    /// Documents whose page count cannot be read are dropped for this
    /// evaluation and the selection is repeated without them.
    pub fn evaluate<S: PageCountSource>(
        &self,
        listing: &DirectoryListing,
        source: &mut S,
    ) -> PairOutcome {
        let mut candidates: Vec<&ScanDocument> = listing.documents().iter().collect();
        candidates.sort_by(|a, b| {
            b.modified()
                .cmp(&a.modified())
                .then_with(|| a.path().cmp(b.path()))
        });

        loop {
            let Some((&anchor, rest)) = candidates.split_first() else {
                return PairOutcome::NoCandidates;
            };

            let age = listing
                .taken_at()
                .duration_since(anchor.modified())
                .unwrap_or(Duration::ZERO);

            if age < self.rules.settle_time {
                return PairOutcome::Unsettled {
                    anchor: anchor.path().to_path_buf(),
                    age,
                };
            }

            if let Some(recent) = self.rules.recent_window
                && age > recent
            {
                return PairOutcome::Stale {
                    anchor: anchor.path().to_path_buf(),
                    age,
                };
            }

            let in_window: Vec<&ScanDocument> = rest
                .iter()
                .copied()
                .filter(|other| {
                    time_gap(anchor.modified(), other.modified()) <= self.rules.pair_window
                })
                .collect();

            if in_window.is_empty() {
                return PairOutcome::NoPartner {
                    anchor: anchor.path().to_path_buf(),
                };
            }

            let Some(anchor_pages) = read_page_count(source, anchor) else {
                exclude(&mut candidates, anchor.path());
                continue;
            };

            // Unreadable neighbours never count towards ambiguity.
            let mut readable = Vec::with_capacity(in_window.len());
            let mut unreadable = Vec::new();
            for document in in_window {
                match read_page_count(source, document) {
                    Some(pages) => readable.push((document, pages)),
                    None => unreadable.push(document.path()),
                }
            }

            if !unreadable.is_empty() {
                for path in unreadable {
                    exclude(&mut candidates, path);
                }
                continue;
            }

            let (partner, partner_pages) = match readable.as_slice() {
                [(partner, pages)] => (*partner, *pages),
                _ => {
                    return PairOutcome::Ambiguous {
                        anchor: anchor.path().to_path_buf(),
                        candidates: readable
                            .iter()
                            .map(|(document, _)| document.path().to_path_buf())
                            .collect(),
                    };
                }
            };

            if anchor_pages != partner_pages {
                return PairOutcome::PageCountMismatch {
                    anchor: anchor.path().to_path_buf(),
                    anchor_pages,
                    partner: partner.path().to_path_buf(),
                    partner_pages,
                };
            }

            return PairOutcome::Ready(ScanPair::from_documents(
                anchor.clone(),
                partner.clone(),
                anchor_pages,
            ));
        }
    }
}

fn read_page_count<S: PageCountSource>(source: &mut S, document: &ScanDocument) -> Option<usize> {
    match source.page_count(document) {
        Ok(count) => Some(count),
        Err(err) => {
            warn!(
                path = %document.path().display(),
                error = %err,
                "Cannot read page count, skipping document this cycle"
            );
            None
        }
    }
}

fn exclude(candidates: &mut Vec<&ScanDocument>, path: &Path) {
    candidates.retain(|document| document.path() != path);
}
