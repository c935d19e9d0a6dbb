/*
File: jpm-aio/src/fs.rs
Purpose: Primitive synchronous filesystem operations.
*/
use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::Arc,
};

use jpm_common::error::{JpmError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        JpmError::from(e)
    })
}

/// Removes a file, treating an already-missing file as success.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed file: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            error!("Failed remove file {}: {}", path.display(), e);
            Err(JpmError::from(e))
        }
    }
}

/// Removes a directory and all its contents recursively. A missing directory
/// is not an error.
pub fn remove_directory_recursive(path: &Path) -> Result<()> {
    debug!("Removing directory recursively: {}", path.display());
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            error!("Failed remove dir_all {}: {}", path.display(), e);
            Err(JpmError::from(e))
        }
    }
}

/// Removes `path` if it is an empty directory; leaves it alone otherwise.
pub fn remove_dir_if_empty(path: &Path) -> Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Ok(false);
            }
            fs::remove_dir(path)?;
            debug!("Removed empty directory: {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(JpmError::from(e)),
    }
}

/// Moves a file or directory. Both paths must live on the same filesystem.
pub fn rename_path(from: &Path, to: &Path) -> Result<()> {
    debug!("Moving {} -> {}", from.display(), to.display());
    fs::rename(from, to).map_err(|e| {
        error!(
            "Failed to move {} to {}: {}",
            from.display(),
            to.display(),
            e
        );
        JpmError::from(e)
    })
}

/// Atomically writes data to a file using a temporary file.
/// Preserves original permissions if possible.
pub fn atomic_write_file(original_path: &Path, content: &[u8]) -> Result<()> {
    let dir = original_path.parent().ok_or_else(|| {
        JpmError::Generic(format!(
            "Cannot get parent directory for {}",
            original_path.display()
        ))
    })?;

    create_dir_all(dir)?;

    let original_perms = fs::metadata(original_path).map(|m| m.permissions()).ok();

    let mut temp_file = NamedTempFile::new_in(dir)?;
    let temp_path = temp_file.path().to_path_buf();

    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        original_path.display(),
        temp_path.display()
    );

    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(original_path).map_err(|e| {
        error!(
            "Failed to persist temporary file {} over {}: {}",
            temp_path.display(),
            original_path.display(),
            e.error
        );
        JpmError::Io(Arc::new(e.error))
    })?;

    if let Some(perms) = original_perms {
        if let Err(e) = fs::set_permissions(original_path, perms) {
            warn!(
                "Failed to restore original permissions on {}: {}",
                original_path.display(),
                e
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        atomic_write_file(&path, b"one").unwrap();
        atomic_write_file(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn removals_tolerate_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_if_exists(&dir.path().join("absent")).unwrap();
        remove_directory_recursive(&dir.path().join("absent-dir")).unwrap();
        assert!(!remove_dir_if_empty(&dir.path().join("absent-dir")).unwrap());
    }

    #[test]
    fn remove_dir_if_empty_keeps_populated_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let populated = dir.path().join("full");
        fs::create_dir(&populated).unwrap();
        fs::write(populated.join("x"), b"x").unwrap();
        assert!(!remove_dir_if_empty(&populated).unwrap());

        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        assert!(remove_dir_if_empty(&empty).unwrap());
        assert!(!empty.exists());
    }
}
