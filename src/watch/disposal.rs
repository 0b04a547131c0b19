//! Disposal of consumed inputs.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::DisposalMode;
use crate::error::{Result, ReturnScanError};
use crate::utils::file_stem_lossy;

/// What happened to a consumed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    /// Moved to the given path.
    Archived(PathBuf),
    Deleted,
    /// Left in place.
    Kept,
}

/// Archives, deletes or keeps consumed inputs.
#[derive(Debug, Clone)]
pub struct Disposer {
    mode: DisposalMode,
    archive_dir: PathBuf,
}

impl Disposer {
    pub fn new(mode: DisposalMode, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            archive_dir: archive_dir.into(),
        }
    }

    pub fn mode(&self) -> DisposalMode {
        self.mode
    }

    /// Dispose of `input` according to the configured mode.
    ///
    /// # Errors
    ///
    /// Returns [`ReturnScanError::DisposalFailed`] if the file cannot be
    /// moved or removed. The input is left where it was.
    pub async fn dispose(&self, input: &Path) -> Result<Disposal> {
        let failed = |source| ReturnScanError::DisposalFailed {
            path: input.to_path_buf(),
            source,
        };

        match self.mode {
            DisposalMode::Keep => Ok(Disposal::Kept),
            DisposalMode::Delete => {
                tokio::fs::remove_file(input).await.map_err(failed)?;
                Ok(Disposal::Deleted)
            }
            DisposalMode::Archive => {
                tokio::fs::create_dir_all(&self.archive_dir)
                    .await
                    .map_err(failed)?;

                let destination = self.archive_destination(input).await;
                move_file(input, &destination).await.map_err(failed)?;
                Ok(Disposal::Archived(destination))
            }
        }
    }

    /// First free path for `input` inside the archive directory.
    async fn archive_destination(&self, input: &Path) -> PathBuf {
        let file_name = input
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("scan.pdf"));
        let candidate = self.archive_dir.join(&file_name);

        if !exists(&candidate).await {
            return candidate;
        }

        let stem = file_stem_lossy(&file_name);
        let extension = file_name
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pdf".to_string());

        let mut counter = 1u32;
        loop {
            let candidate = self
                .archive_dir
                .join(format!("{stem}-{counter}.{extension}"));
            if !exists(&candidate).await {
                return candidate;
            }
            counter += 1;
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Rename, falling back to copy and remove across filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(from = %from.display(), to = %to.display(), error = %rename_err, "Rename failed, copying instead");
            if let Err(err) = tokio::fs::copy(from, to).await {
                debug!(to = %to.display(), error = %err, "Copy failed, removing partial destination");
                let _ = tokio::fs::remove_file(to).await;
                return Err(rename_err);
            }
            if let Err(err) = tokio::fs::remove_file(from).await {
                let _ = tokio::fs::remove_file(to).await;
                return Err(err);
            }
            Ok(())
        }
    }
}
