//! PDF reading and loading operations.
//!
//! Async loading goes through lopdf on a blocking thread so that the watch
//! loop stays responsive while a large scan is parsed. The blocking variants
//! back the page counting done by the pair finder, which itself runs on a
//! blocking thread.
//!
//! # Examples
//!
//! ```no_run
//! use returnscan::io::reader::PdfReader;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let loaded = reader.load(Path::new("scan_front.pdf")).await?;
//! println!("{} pages", loaded.page_count);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::{Result, ReturnScanError};

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// File size in bytes.
    pub file_size: u64,
}

impl LoadedPdf {
    fn new(document: Document, path: PathBuf) -> Self {
        let page_count = document.get_pages().len();
        let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        Self {
            document,
            path,
            page_count,
            file_size,
        }
    }
}

/// PDF reader rejecting documents without pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReader;

impl PdfReader {
    pub fn new() -> Self {
        Self
    }

    /// Load a PDF document on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - File is not a valid PDF (including a file still being written)
    /// - PDF has no pages
    pub fn load_blocking(&self, path: &Path) -> Result<LoadedPdf> {
        let doc = Document::load(path)
            .map_err(|e| ReturnScanError::failed_to_load_pdf(path.to_path_buf(), e.to_string()))?;

        if doc.get_pages().is_empty() {
            return Err(ReturnScanError::corrupted_pdf(
                path.to_path_buf(),
                "PDF has no pages",
            ));
        }

        Ok(LoadedPdf::new(doc, path.to_path_buf()))
    }

    /// Load a single PDF document without blocking the async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`PdfReader::load_blocking`].
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let reader = *self;
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || reader.load_blocking(&path_buf))
            .await
            .map_err(|e| {
                ReturnScanError::failed_to_load_pdf(path.to_path_buf(), format!("Task join error: {e}"))
            })?
    }

    /// Count the pages of a PDF file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be parsed as a PDF.
    pub fn page_count(&self, path: &Path) -> Result<usize> {
        self.load_blocking(path).map(|loaded| loaded.page_count)
    }
}
