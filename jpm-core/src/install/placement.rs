// Path: jpm-core/src/install/placement.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jpm_aio::extract::Extractor;
use jpm_aio::fs::{create_dir_all, remove_dir_if_empty, remove_directory_recursive, rename_path};
use jpm_common::error::{JpmError, Result};
use tracing::{debug, warn};

/// Moves an extracted package directory into its final location, replacing
/// whatever was there. A reinstall never merges with an old tree.
pub fn place(source_dir: &Path, target_dir: &Path) -> Result<()> {
    if let Ok(meta) = target_dir.symlink_metadata() {
        debug!(
            "Removing existing package directory before placing: {}",
            target_dir.display()
        );
        if meta.is_dir() {
            remove_directory_recursive(target_dir)?;
        } else {
            jpm_aio::fs::remove_file_if_exists(target_dir)?;
        }
    }

    let parent_dir = target_dir.parent().ok_or_else(|| {
        JpmError::Generic(format!(
            "Could not determine parent directory for install path: {}",
            target_dir.display()
        ))
    })?;
    create_dir_all(parent_dir)?;
    rename_path(source_dir, target_dir)
}

/// Removes the staging root once nothing is left in it.
pub fn sweep_staging(staging_root: &Path) {
    match remove_dir_if_empty(staging_root) {
        Ok(true) => debug!("Removed staging root {}", staging_root.display()),
        Ok(false) => {}
        Err(e) => warn!(
            "Could not clean staging root {}: {}",
            staging_root.display(),
            e
        ),
    }
}

/// Turns a package name into a safe directory-name prefix.
fn staging_prefix(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    format!("{sanitized}-")
}

/// Extracts archives into per-attempt staging directories and places the
/// archive's canonical root directory at the package's target.
pub struct PlacementManager {
    staging_root: PathBuf,
    archive_root: String,
    extractor: Arc<dyn Extractor>,
}

impl PlacementManager {
    pub fn new(
        staging_root: impl Into<PathBuf>,
        archive_root: impl Into<String>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            staging_root: staging_root.into(),
            archive_root: archive_root.into(),
            extractor,
        }
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Waits for abandoned extractions to stop writing, then removes the
    /// staging root if nothing else is using it.
    pub async fn settle_and_sweep(&self) {
        self.extractor.settle().await;
        sweep_staging(&self.staging_root);
    }

    /// Installs the package `name` from `archive_path` into `target_dir`.
    ///
    /// Extraction and the layout check both happen before the old target is
    /// touched, so a bad archive leaves a previous install in place. The
    /// staging directory is removed on every path out of this function,
    /// including when the future is dropped mid-extraction.
    pub async fn install_archive(
        &self,
        name: &str,
        archive_path: &Path,
        target_dir: &Path,
    ) -> Result<()> {
        create_dir_all(&self.staging_root)?;
        let staging = tempfile::Builder::new()
            .prefix(&staging_prefix(name))
            .tempdir_in(&self.staging_root)?;
        debug!(
            "Extracting {} for '{}' into staging dir {}",
            archive_path.display(),
            name,
            staging.path().display()
        );

        self.extractor.extract(archive_path, staging.path()).await?;

        let extracted_root = staging.path().join(&self.archive_root);
        if !extracted_root.is_dir() {
            return Err(JpmError::MalformedArchive(format!(
                "Unexpected package structure in {} for '{}': no top-level '{}' directory",
                archive_path.display(),
                name,
                self.archive_root
            )));
        }

        place(&extracted_root, target_dir)?;
        debug!("Placed '{}' at {}", name, target_dir.display());

        if let Err(e) = staging.close() {
            warn!("Failed to remove staging directory for '{}': {}", name, e);
        }
        Ok(())
    }
}
