// jpm-common/src/pipeline.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Progress notifications emitted by the install engine. Consumers subscribe
/// through a broadcast channel; the engine never waits on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstallEvent {
    InstallStarted {
        root_count: usize,
    },
    FetchStarted {
        target_id: String,
        url: String,
    },
    CacheHit {
        target_id: String,
        path: PathBuf,
    },
    DownloadFinished {
        target_id: String,
        path: PathBuf,
        size_bytes: u64,
    },
    PackageInstalled {
        target_id: String,
        path: PathBuf,
        nested: bool,
    },
    PackageFailed {
        target_id: String,
        error: String, // Keep as String for simplicity in events
    },
    CircularDependency {
        chain: Vec<String>,
    },
    InstallFinished {
        duration_secs: f64,
        installed_count: usize,
        skipped_count: usize,
        fail_count: usize,
    },
}

impl InstallEvent {
    pub fn package_failed(target_id: impl Into<String>, error: &crate::error::JpmError) -> Self {
        Self::PackageFailed {
            target_id: target_id.into(),
            error: error.to_string(),
        }
    }
}
