use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum JpmError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("{} not found. Please run npm init to create one.", .0.display())]
    MissingManifest(PathBuf),

    #[error("Manifest Error: {0}")]
    Manifest(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Registry Error: {0}")]
    Registry(String),

    #[error("Network Error: failed to fetch '{0}': {1}")]
    Network(String, String),

    #[error("Integrity Error: {0}")]
    Integrity(String),

    #[error("Malformed Archive: {0}")]
    MalformedArchive(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Failed to execute command: {0}")]
    CommandExec(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl JpmError {
    /// Errors that abandon a single dependency subtree without stopping the
    /// whole install.
    pub fn is_node_failure(&self) -> bool {
        !matches!(
            self,
            JpmError::MissingManifest(_)
                | JpmError::Manifest(_)
                | JpmError::Config(_)
                | JpmError::Cancelled
        )
    }
}

impl From<std::io::Error> for JpmError {
    fn from(err: std::io::Error) -> Self {
        JpmError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for JpmError {
    fn from(err: reqwest::Error) -> Self {
        JpmError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for JpmError {
    fn from(err: serde_json::Error) -> Self {
        JpmError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, JpmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_message_names_the_file() {
        let err = JpmError::MissingManifest(PathBuf::from("/tmp/demo/package.json"));
        assert_eq!(
            err.to_string(),
            "/tmp/demo/package.json not found. Please run npm init to create one."
        );
        assert!(!err.is_node_failure());
    }

    #[test]
    fn per_node_errors_are_isolated() {
        assert!(JpmError::Integrity("bad".into()).is_node_failure());
        assert!(JpmError::Network("u".into(), "refused".into()).is_node_failure());
        assert!(JpmError::MalformedArchive("no root".into()).is_node_failure());
        assert!(!JpmError::Cancelled.is_node_failure());
    }
}
