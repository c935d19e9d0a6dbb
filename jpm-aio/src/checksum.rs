// jpm-aio/src/checksum.rs
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use jpm_common::error::{JpmError, Result};
use jpm_common::model::{DigestAlgorithm, DigestEncoding, Integrity};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::debug;

fn hash_reader<D: Digest + Write, R: Read>(reader: &mut R) -> io::Result<(Vec<u8>, u64)> {
    let mut hasher = D::new();
    let bytes_copied = io::copy(reader, &mut hasher)?;
    Ok((hasher.finalize().to_vec(), bytes_copied))
}

/// Streams `path` through `algorithm` and returns the digest written in
/// `encoding`. The file is never held in memory as a whole.
pub fn compute_digest(
    path: &Path,
    algorithm: DigestAlgorithm,
    encoding: DigestEncoding,
) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let (digest, bytes_copied) = match algorithm {
        DigestAlgorithm::Sha1 => hash_reader::<Sha1, _>(&mut reader)?,
        DigestAlgorithm::Sha256 => hash_reader::<Sha256, _>(&mut reader)?,
        DigestAlgorithm::Sha384 => hash_reader::<Sha384, _>(&mut reader)?,
        DigestAlgorithm::Sha512 => hash_reader::<Sha512, _>(&mut reader)?,
    };
    let encoded = match encoding {
        DigestEncoding::Base64 => BASE64.encode(digest),
        DigestEncoding::Hex => hex::encode(digest),
    };
    debug!(
        "Calculated {}: {} ({} bytes read)",
        algorithm, encoded, bytes_copied
    );
    Ok(encoded)
}

/// Verifies `path` against `expected`, using the same algorithm and encoding
/// as the expectation.
pub fn verify_integrity(path: &Path, expected: &Integrity) -> Result<()> {
    debug!("Verifying integrity for: {}", path.display());
    let actual = compute_digest(path, expected.algorithm, expected.encoding)?;
    debug!("Expected {}:   {}", expected.algorithm, expected.value);

    let matches = match expected.encoding {
        DigestEncoding::Base64 => actual == expected.value,
        DigestEncoding::Hex => actual.eq_ignore_ascii_case(&expected.value),
    };
    if matches {
        Ok(())
    } else {
        Err(JpmError::Integrity(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// Runs [`verify_integrity`] on the blocking pool.
pub async fn verify_integrity_async(path: &Path, expected: &Integrity) -> Result<()> {
    let path: PathBuf = path.to_path_buf();
    let expected = expected.clone();
    tokio::task::spawn_blocking(move || verify_integrity(&path, &expected))
        .await
        .map_err(|e| JpmError::Generic(format!("JoinError in checksum verification: {e}")))?
}
