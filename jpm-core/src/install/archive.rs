// jpm-core/src/install/archive.rs
use std::sync::Arc;

use jpm_common::error::Result;
use jpm_common::model::PackageMetadata;
use jpm_net::http::Fetcher;
use tracing::debug;

use crate::cache::{ArchiveCache, CacheOutcome};

/// Obtains a verified archive for a package: reuses the cache entry when one
/// exists, otherwise downloads through the [`Fetcher`] into the cache.
pub struct PackageFetcher {
    cache: Arc<ArchiveCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl PackageFetcher {
    pub fn new(cache: Arc<ArchiveCache>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    pub async fn obtain(&self, metadata: &PackageMetadata) -> Result<CacheOutcome> {
        let key = metadata.archive_filename();
        let url = metadata.tarball_url.as_str();
        debug!(
            "Ensuring archive {} for {}@{} (integrity {})",
            key, metadata.name, metadata.version, metadata.integrity
        );
        let fetcher = Arc::clone(&self.fetcher);
        self.cache
            .ensure(&key, &metadata.integrity, |dest| async move {
                fetcher.fetch(url, &dest).await
            })
            .await
    }
}
