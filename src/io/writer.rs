//! PDF writing and saving operations.
//!
//! Output is always written atomically: the document is serialized into a
//! hidden temporary file next to the destination and renamed into place only
//! after the last byte has been flushed. A failed write leaves nothing behind,
//! and the temporary name never matches the scan pattern of the watch loop.
//!
//! # Examples
//!
//! ```no_run
//! use returnscan::io::writer::PdfWriter;
//! use lopdf::Document;
//! use std::path::Path;
//!
//! # async fn example(doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! let stats = writer.save_with_stats(doc, Path::new("merged.pdf")).await?;
//! println!("wrote {}", stats.format_file_size());
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::{Result, ReturnScanError};
use crate::utils::format_file_size;

/// Size of the write buffer in bytes.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Statistics about a completed write.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    pub file_size: u64,

    pub output_path: PathBuf,
}

impl WriteStatistics {
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Writer for merged documents. Never replaces an existing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfWriter;

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Compress `doc` and serialize it to `path` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ReturnScanError::FailedToCreateOutput`] when the temporary
    /// file cannot be created and [`ReturnScanError::FailedToWrite`] when
    /// serialization or the final rename fails (including an existing
    /// destination).
    pub async fn save_with_stats(&self, doc: Document, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || write_atomically(doc, path_buf))
            .await
            .map_err(|e| ReturnScanError::other(format!("Write task failed: {e}")))?
    }
}

fn write_atomically(mut doc: Document, path: PathBuf) -> Result<WriteStatistics> {
    doc.compress();

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".returnscan-")
        .suffix(".part")
        .tempfile_in(&parent)
        .map_err(|e| ReturnScanError::FailedToCreateOutput {
            path: path.clone(),
            source: e,
        })?;

    {
        let mut writer = std::io::BufWriter::with_capacity(WRITE_BUFFER_SIZE, temp.as_file_mut());

        doc.save_to(&mut writer)
            .map_err(|e| ReturnScanError::FailedToWrite {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;

        writer.flush().map_err(|e| ReturnScanError::FailedToWrite {
            path: path.clone(),
            source: e,
        })?;
    }

    temp.as_file()
        .sync_all()
        .map_err(|e| ReturnScanError::FailedToWrite {
            path: path.clone(),
            source: e,
        })?;

    // Dropping the temp file on error removes it again.
    temp.persist_noclobber(&path)
        .map_err(|e| ReturnScanError::FailedToWrite {
            path: path.clone(),
            source: e.error,
        })?;

    let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    Ok(WriteStatistics {
        file_size,
        output_path: path,
    })
}
