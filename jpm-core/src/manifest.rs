// jpm-core/src/manifest.rs
// Reading the project manifest and the single-entry edit behind `add`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jpm_aio::json_io::write_json_pretty;
use jpm_common::dependency::DependencySpecifier;
use jpm_common::error::{JpmError, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const DEPENDENCIES_KEY: &str = "dependencies";

/// A `package.json` document. Everything other than `dependencies` is carried
/// through untouched, in its original key order.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    data: Map<String, Value>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading manifest {}", path.display());
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(JpmError::MissingManifest(path.to_path_buf()))
            }
            Err(e) => {
                return Err(JpmError::Manifest(format!(
                    "Could not read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            JpmError::Manifest(format!("Invalid JSON in {}: {}", path.display(), e))
        })?;
        match value {
            Value::Object(data) => Ok(Self {
                path: path.to_path_buf(),
                data,
            }),
            _ => Err(JpmError::Manifest(format!(
                "{} must contain a JSON object",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The declared dependencies, or `None` when the manifest has no
    /// `dependencies` object at all.
    pub fn dependencies(&self) -> Option<Vec<DependencySpecifier>> {
        let deps = self.data.get(DEPENDENCIES_KEY)?.as_object()?;
        Some(
            deps.iter()
                .filter_map(|(name, range)| match range.as_str() {
                    Some(range) => Some(DependencySpecifier::new(name.clone(), range)),
                    None => {
                        warn!("Ignoring dependency '{}': version range is not a string", name);
                        None
                    }
                })
                .collect(),
        )
    }

    /// Records `name` at `^version`, replacing any existing entry for it and
    /// creating the `dependencies` object when absent.
    pub fn add_dependency(&mut self, name: &str, version: &str) {
        let deps = self
            .data
            .entry(DEPENDENCIES_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !deps.is_object() {
            warn!("Replacing non-object '{}' in {}", DEPENDENCIES_KEY, self.path.display());
            *deps = Value::Object(Map::new());
        }
        if let Value::Object(map) = deps {
            map.insert(name.to_string(), Value::String(format!("^{version}")));
        }
    }

    pub fn save(&self) -> Result<()> {
        write_json_pretty(&self.path, &self.data)
    }
}
