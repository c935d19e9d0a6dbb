// jpm-aio/src/extract.rs
// Archive extraction collaborators.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use jpm_common::config::ExtractorKind;
use jpm_common::error::{JpmError, Result};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::fs::remove_directory_recursive;
use crate::process::run_command_async;

/// Unpacks a gzipped tarball into a directory. The engine only checks the
/// outcome; the layout inside `dest_dir` is whatever the archive holds.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<()>;

    /// Resolves once no extraction started by this extractor is still
    /// writing to disk, including ones whose future was dropped.
    async fn settle(&self) {}
}

/// Shells out to the system `tar` utility.
#[derive(Debug, Clone)]
pub struct TarCommandExtractor {
    program: String,
}

impl TarCommandExtractor {
    pub fn new() -> Self {
        Self {
            program: "tar".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for TarCommandExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for TarCommandExtractor {
    async fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<()> {
        debug!(
            "Extracting '{}' to '{}' with {}",
            archive_path.display(),
            dest_dir.display(),
            self.program
        );
        let args = vec![
            "-xzf".to_string(),
            archive_path.to_string_lossy().into_owned(),
            "-C".to_string(),
            dest_dir.to_string_lossy().into_owned(),
        ];
        let output = run_command_async(&self.program, &args, None).await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(JpmError::MalformedArchive(format!(
                "{} failed to extract {} ({}): {}",
                self.program,
                archive_path.display(),
                output.status,
                stderr.trim()
            )))
        }
    }
}

/// Unpacks in-process with flate2 + tar on the blocking pool.
///
/// A blocking task cannot be aborted, so dropping the `extract` future only
/// raises a flag. The task checks it between entries and removes `dest_dir`
/// once it notices. [`Extractor::settle`] waits for such tasks to exit.
#[derive(Debug, Clone)]
pub struct NativeExtractor {
    in_flight: Arc<watch::Sender<usize>>,
}

impl NativeExtractor {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(watch::channel(0).0),
        }
    }
}

impl Default for NativeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets the flag when the owning future completes or is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Counts one blocking task for the lifetime of the value.
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn enter(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

fn unpack_entries(archive_path: &Path, dest_dir: &Path, cancelled: &AtomicBool) -> Result<()> {
    let malformed = |e: std::io::Error| {
        JpmError::MalformedArchive(format!(
            "Failed to unpack {}: {e}",
            archive_path.display()
        ))
    };
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries().map_err(malformed)? {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        entry.map_err(malformed)?.unpack_in(dest_dir).map_err(malformed)?;
    }
    // Re-checked after the last write: the owner may have removed `dest_dir`
    // while an entry was being unpacked, and that entry recreated it.
    if cancelled.load(Ordering::SeqCst) {
        warn!(
            "Extraction of '{}' abandoned; removing '{}'",
            archive_path.display(),
            dest_dir.display()
        );
        if let Err(e) = remove_directory_recursive(dest_dir) {
            warn!("Failed to remove '{}': {}", dest_dir.display(), e);
        }
        return Err(JpmError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl Extractor for NativeExtractor {
    async fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<()> {
        debug!(
            "Extracting '{}' to '{}' in-process",
            archive_path.display(),
            dest_dir.display()
        );
        let archive_path: PathBuf = archive_path.to_path_buf();
        let dest_dir: PathBuf = dest_dir.to_path_buf();
        let cancelled = Arc::new(AtomicBool::new(false));
        let task_cancelled = Arc::clone(&cancelled);
        let in_flight = InFlight::enter(&self.in_flight);
        let handle = tokio::task::spawn_blocking(move || {
            let _in_flight = in_flight;
            unpack_entries(&archive_path, &dest_dir, &task_cancelled)
        });
        let _cancel = CancelOnDrop(cancelled);
        handle
            .await
            .map_err(|e| JpmError::Generic(format!("JoinError in archive extraction: {e}")))?
    }

    async fn settle(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

pub fn extractor_for(kind: ExtractorKind) -> Arc<dyn Extractor> {
    match kind {
        ExtractorKind::Tar => Arc::new(TarCommandExtractor::new()),
        ExtractorKind::Native => Arc::new(NativeExtractor::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_tgz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[tokio::test]
    async fn native_extractor_unpacks_tgz() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("demo-1.0.0.tgz");
        write_tgz(&archive, &[("package/index.js", b"module.exports = 1;\n")]);

        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        NativeExtractor::new().extract(&archive, &dest).await.unwrap();
        assert!(dest.join("package/index.js").is_file());
    }

    #[tokio::test]
    async fn garbage_is_a_malformed_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.tgz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();

        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        let err = NativeExtractor::new().extract(&archive, &dest).await.unwrap_err();
        assert!(matches!(err, JpmError::MalformedArchive(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn dropped_extraction_leaves_nothing_behind_once_settled() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("big-1.0.0.tgz");
        let names: Vec<String> = (0..2000).map(|i| format!("package/lib/f{i}.js")).collect();
        let body = vec![b'x'; 4096];
        let entries: Vec<(&str, &[u8])> = names
            .iter()
            .map(|n| (n.as_str(), body.as_slice()))
            .collect();
        write_tgz(&archive, &entries);

        let dest = dir.path().join("staging").join("tmp-big");
        std::fs::create_dir_all(&dest).unwrap();
        let extractor = NativeExtractor::new();

        // Give up almost immediately, the way Ctrl-C drops an install.
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            extractor.extract(&archive, &dest),
        )
        .await;
        // The staging owner cleans up as soon as its future is gone.
        std::fs::remove_dir_all(&dest).ok();

        extractor.settle().await;
        assert!(!dest.exists(), "extraction kept writing after being dropped");
    }

    #[tokio::test]
    async fn settle_returns_at_once_when_idle() {
        tokio::time::timeout(std::time::Duration::from_secs(5), NativeExtractor::new().settle())
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tar_command_failure_is_malformed_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.tgz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();

        // `false` exits non-zero whatever its arguments are.
        let extractor = TarCommandExtractor::with_program("false");
        let err = extractor.extract(&archive, dir.path()).await.unwrap_err();
        assert!(matches!(err, JpmError::MalformedArchive(_)), "got {err:?}");
    }
}
