use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use jpm_common::config::Config;
use jpm_common::error::{JpmError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::validation::validate_url;

const USER_AGENT_STRING: &str = "jpm package installer (Rust)";

/// Streams a remote resource to a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads `url` into `dest`, returning the number of bytes written.
    /// Any transport failure is a [`JpmError::Network`].
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

pub fn build_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| JpmError::Generic(format!("Failed to build HTTP client: {e}")))
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(build_http_client(config)?, config.fetch_timeout))
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        let network_err = |reason: String| JpmError::Network(url.to_string(), reason);

        let response = self.client.get(url).send().await.map_err(|e| {
            debug!("HTTP request failed for {url}: {e}");
            network_err(format!("request failed: {e}"))
        })?;
        let status = response.status();
        debug!("Received HTTP status: {} for {}", status, url);

        if !status.is_success() {
            error!("HTTP error {} for URL {}", status, url);
            return Err(match status {
                StatusCode::NOT_FOUND => network_err("resource not found (404)".to_string()),
                StatusCode::FORBIDDEN => network_err("access forbidden (403)".to_string()),
                _ => network_err(format!("HTTP status {status}")),
            });
        }

        let mut file = TokioFile::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network_err(format!("interrupted stream: {e}")))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        debug!("Finished writing {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        validate_url(url)?;
        debug!("Downloading {} to {}", url, dest.display());

        let outcome = tokio::time::timeout(self.timeout, self.stream_to_file(url, dest)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(JpmError::Network(
                url.to_string(),
                format!("timed out after {:?}", self.timeout),
            )),
        };

        if result.is_err() {
            // A half-written file must never look like a finished download.
            if let Err(e) = tokio::fs::remove_file(dest).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Failed to remove partial download {}: {}", dest.display(), e);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn fetcher() -> HttpFetcher {
        let config = Config::with_roots(&PathBuf::from("/tmp"), &PathBuf::from("/tmp"));
        HttpFetcher::from_config(&config).unwrap()
    }

    fn fetcher_with_timeout(timeout: Duration) -> HttpFetcher {
        let config = Config::with_roots(&PathBuf::from("/tmp"), &PathBuf::from("/tmp"));
        HttpFetcher::new(build_http_client(&config).unwrap(), timeout)
    }

    /// Accepts one connection on loopback, reads the request and answers
    /// with `response` verbatim, or holds the socket open when it is `None`.
    async fn serve_once(response: Option<&'static [u8]>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            match response {
                Some(bytes) => {
                    let _ = socket.write_all(bytes).await;
                    let _ = socket.shutdown().await;
                }
                None => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        });
        format!("http://{addr}/x.tgz")
    }

    #[tokio::test]
    async fn error_status_is_network_error() {
        let url = serve_once(Some(
            &b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"[..],
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.tgz");

        let err = fetcher_with_timeout(Duration::from_secs(10))
            .fetch(&url, &dest)
            .await
            .unwrap_err();

        match err {
            JpmError::Network(failed_url, reason) => {
                assert_eq!(failed_url, url);
                assert!(reason.contains("500"), "{reason}");
            }
            other => panic!("expected a network error, got {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn truncated_body_is_network_error_and_partial_file_is_removed() {
        let url = serve_once(Some(
            &b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\nonly part of it"[..],
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.tgz");

        let err = fetcher_with_timeout(Duration::from_secs(10))
            .fetch(&url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, JpmError::Network(..)), "got {err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn silent_server_times_out_as_network_error() {
        let url = serve_once(None).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.tgz");

        let err = fetcher_with_timeout(Duration::from_millis(100))
            .fetch(&url, &dest)
            .await
            .unwrap_err();

        match err {
            JpmError::Network(_, reason) => assert!(reason.contains("timed out"), "{reason}"),
            other => panic!("expected a network error, got {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn refuses_insecure_urls_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.tgz");
        let err = fetcher()
            .fetch("http://registry.example.com/x.tgz", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, JpmError::Validation(_)), "got {err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn connection_refused_is_network_error_and_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.tgz");
        // Port 9 (discard) on loopback is closed on any sane test host.
        let err = fetcher()
            .fetch("http://127.0.0.1:9/x.tgz", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, JpmError::Network(..)), "got {err:?}");
        assert!(!dest.exists());
    }
}
