// jpm-common/src/model/integrity.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{JpmError, Result};

/// Digest algorithms accepted in registry integrity strings, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the expected digest value is written down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestEncoding {
    Base64,
    Hex,
}

/// An expected digest for a downloaded archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Integrity {
    pub algorithm: DigestAlgorithm,
    pub encoding: DigestEncoding,
    pub value: String,
}

impl Integrity {
    /// Parses a Subresource-Integrity string such as `sha512-<base64>`.
    /// When several hashes are listed the strongest supported one is kept.
    pub fn parse_sri(sri: &str) -> Result<Self> {
        sri.split_whitespace()
            .filter_map(|token| {
                let (alg, rest) = token.split_once('-')?;
                let algorithm = DigestAlgorithm::from_name(alg)?;
                // Options after '?' are not part of the digest.
                let value = rest.split('?').next().unwrap_or_default();
                if value.is_empty() {
                    return None;
                }
                Some(Self {
                    algorithm,
                    encoding: DigestEncoding::Base64,
                    value: value.to_string(),
                })
            })
            .max_by_key(|integrity| integrity.algorithm)
            .ok_or_else(|| {
                JpmError::Validation(format!("No supported digest in integrity string '{sri}'"))
            })
    }

    /// Builds a hex-encoded expectation, validating its length.
    pub fn from_hex(algorithm: DigestAlgorithm, hex_value: &str) -> Result<Self> {
        let hex_value = hex_value.trim();
        let valid = hex_value.len() == algorithm.output_len() * 2
            && hex_value.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(JpmError::Validation(format!(
                "'{hex_value}' is not a valid hex {algorithm} digest"
            )));
        }
        Ok(Self {
            algorithm,
            encoding: DigestEncoding::Hex,
            value: hex_value.to_ascii_lowercase(),
        })
    }

    /// Picks the expectation from a registry `dist` block: the SRI
    /// `integrity` field when present, else the legacy hex SHA-1 `shasum`.
    pub fn from_dist(integrity: Option<&str>, shasum: Option<&str>) -> Result<Self> {
        match (integrity.filter(|s| !s.trim().is_empty()), shasum) {
            (Some(sri), _) => Self::parse_sri(sri),
            (None, Some(sha1)) => Self::from_hex(DigestAlgorithm::Sha1, sha1),
            (None, None) => Err(JpmError::Validation(
                "Package metadata carries no integrity digest".to_string(),
            )),
        }
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encoding {
            DigestEncoding::Base64 => write!(f, "{}-{}", self.algorithm, self.value),
            DigestEncoding::Hex => write!(f, "{}:{}", self.algorithm, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_sri() {
        let integrity = Integrity::parse_sri("sha512-abcDEF+/==").unwrap();
        assert_eq!(integrity.algorithm, DigestAlgorithm::Sha512);
        assert_eq!(integrity.encoding, DigestEncoding::Base64);
        assert_eq!(integrity.value, "abcDEF+/==");
        assert_eq!(integrity.to_string(), "sha512-abcDEF+/==");
    }

    #[test]
    fn keeps_strongest_of_several() {
        let integrity = Integrity::parse_sri("sha1-aaaa sha512-bbbb?opt sha256-cccc").unwrap();
        assert_eq!(integrity.algorithm, DigestAlgorithm::Sha512);
        assert_eq!(integrity.value, "bbbb");
    }

    #[test]
    fn rejects_unknown_algorithms() {
        assert!(Integrity::parse_sri("md5-xyz").is_err());
        assert!(Integrity::parse_sri("").is_err());
    }

    #[test]
    fn falls_back_to_shasum() {
        let sha1 = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
        let integrity = Integrity::from_dist(None, Some(sha1)).unwrap();
        assert_eq!(integrity.algorithm, DigestAlgorithm::Sha1);
        assert_eq!(integrity.encoding, DigestEncoding::Hex);

        assert!(Integrity::from_dist(None, Some("not-hex")).is_err());
        assert!(Integrity::from_dist(None, None).is_err());
    }
}
