//! Small helpers shared across modules.

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

/// Absolute distance between two points in time.
pub fn time_gap(a: SystemTime, b: SystemTime) -> Duration {
    match a.duration_since(b) {
        Ok(gap) => gap,
        Err(err) => err.duration(),
    }
}

/// File stem as an owned string, lossy for non-UTF-8 names.
pub fn file_stem_lossy(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
