// jpm-aio/src/json_io.rs
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use jpm_common::error::Result;

/// Writes serializable data to a JSON file, pretty-printed with two-space
/// indentation, replacing the file atomically.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    debug!("Writing JSON to: {}", path.display());
    let json_bytes = serde_json::to_vec_pretty(data)?;
    crate::fs::atomic_write_file(path, &json_bytes)
}

/// Reads and deserializes data from a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Reading JSON from: {}", path.display());
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn round_trips_with_two_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        write_json_pretty(&path, &json!({ "name": "demo", "dependencies": { "a": "^1.0.0" } }))
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"name\": \"demo\""));

        let back: Value = read_json(&path).unwrap();
        assert_eq!(back["dependencies"]["a"], "^1.0.0");
    }
}
