// jpm-net/src/registry.rs
use std::time::Duration;

use async_trait::async_trait;
use jpm_common::config::Config;
use jpm_common::error::{JpmError, Result};
use jpm_common::model::PackageMetadata;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::http::build_http_client;
use crate::validation::validate_url;

const METADATA_TIMEOUT_SECS: u64 = 60;

/// Looks up what the registry knows about `name` at `version` (a concrete
/// version or a dist-tag such as `latest`).
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn metadata(&self, name: &str, version: &str) -> Result<PackageMetadata>;
}

/// npm-compatible registry client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(build_http_client(config)?, config.registry_url.clone()))
    }

    /// `<registry>/<name>/<version>`, with a scope's slash percent-encoded.
    pub fn version_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            name.replace('/', "%2F"),
            version
        )
    }
}

#[async_trait]
impl MetadataSource for RegistryClient {
    async fn metadata(&self, name: &str, version: &str) -> Result<PackageMetadata> {
        let url = self.version_url(name, version);
        validate_url(&url)?;
        debug!("Fetching metadata for {}@{} from {}", name, version, url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(Duration::from_secs(METADATA_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| JpmError::Network(url.clone(), format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(JpmError::NotFound(format!(
                "{name}@{version} is not in the registry"
            )));
        }
        if !status.is_success() {
            return Err(JpmError::Registry(format!(
                "Registry returned {status} for {name}@{version}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| JpmError::Network(url.clone(), format!("interrupted stream: {e}")))?;
        let metadata = PackageMetadata::from_registry_json(&body)?;
        debug!(
            "Resolved {}@{} to {} ({} dependencies)",
            name,
            version,
            metadata.version,
            metadata.dependencies.len()
        );
        Ok(metadata)
    }
}
