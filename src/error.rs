//! Error types for returnscan.
//!
//! This module defines the errors that can occur while watching a scan
//! directory, reading candidate PDFs and merging a front/back pair.
//!
//! # Error Categories
//!
//! - **I/O Errors**: missing directories, permission problems, failed moves
//! - **PDF Errors**: unreadable or structurally broken input files
//! - **Merge Errors**: page counts diverging between discovery and merge
//! - **Configuration Errors**: invalid command-line or environment settings
//!
//! Orientation detection failures live in [`crate::osd::OsdError`] and never
//! escape the detector.

use std::io;
use std::path::PathBuf;

/// Result type alias for returnscan operations.
pub type Result<T> = std::result::Result<T, ReturnScanError>;

/// Main error type for returnscan operations.
#[derive(Debug, thiserror::Error)]
pub enum ReturnScanError {
    /// Watched directory does not exist.
    #[error("Watch directory not found: {}", .path.display())]
    DirectoryNotFound {
        /// Path that was expected to be a directory.
        path: PathBuf,
    },

    /// Path exists but is not a directory.
    #[error("Not a directory: {}", .path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// Failed to list the watched directory.
    #[error("Failed to list directory: {}\n  Reason: {reason}", .path.display())]
    ListingFailed {
        /// Directory being listed.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Failed to load PDF file.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", .path.display())]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// PDF file is corrupted or has invalid structure.
    #[error("Corrupted or invalid PDF: {}\n  Details: {details}", .path.display())]
    CorruptedPdf {
        /// Path to the corrupted PDF.
        path: PathBuf,
        /// Details about the corruption.
        details: String,
    },

    /// Front and back page counts no longer agree at merge time.
    #[error(
        "Page count mismatch: front {} has {front_pages} page(s), back {} has {back_pages} page(s)",
        .front.display(),
        .back.display()
    )]
    PageCountMismatch {
        /// Front-side scan.
        front: PathBuf,
        /// Pages in the front-side scan.
        front_pages: usize,
        /// Back-side scan.
        back: PathBuf,
        /// Pages in the back-side scan.
        back_pages: usize,
    },

    /// Merge operation failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Failed to create output file.
    #[error("Failed to create output file: {}\n  Reason: {source}", .path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to write to output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Consumed input could not be moved or removed.
    #[error("Failed to dispose of input: {}\n  Reason: {source}", .path.display())]
    DisposalFailed {
        /// Input file that should have been disposed of.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<anyhow::Error> for ReturnScanError {
    fn from(err: anyhow::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl ReturnScanError {
    /// Create a DirectoryNotFound error.
    pub fn directory_not_found(path: PathBuf) -> Self {
        Self::DirectoryNotFound { path }
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: PathBuf) -> Self {
        Self::NotADirectory { path }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path,
            reason: reason.into(),
        }
    }

    /// Create a CorruptedPdf error.
    pub fn corrupted_pdf(path: PathBuf, details: impl Into<String>) -> Self {
        Self::CorruptedPdf {
            path,
            details: details.into(),
        }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error only affects a single merge job.
    ///
    /// The watch loop logs recoverable errors and keeps polling; anything
    /// else aborts startup.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FailedToLoadPdf { .. }
                | Self::CorruptedPdf { .. }
                | Self::PageCountMismatch { .. }
                | Self::MergeFailed { .. }
                | Self::FailedToCreateOutput { .. }
                | Self::FailedToWrite { .. }
                | Self::DisposalFailed { .. }
                | Self::ListingFailed { .. }
                | Self::Io { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DirectoryNotFound { .. } => 2,
            Self::NotADirectory { .. } => 2,
            Self::ListingFailed { .. } => 2,
            Self::FailedToLoadPdf { .. } => 3,
            Self::CorruptedPdf { .. } => 3,
            Self::PageCountMismatch { .. } => 6,
            Self::MergeFailed { .. } => 6,
            Self::FailedToCreateOutput { .. } => 5,
            Self::FailedToWrite { .. } => 5,
            Self::DisposalFailed { .. } => 5,
            Self::InvalidConfig { .. } => 1,
            Self::Io { .. } => 5,
            Self::Other { .. } => 1,
        }
    }
}
