// jpm-common/src/model/metadata.rs
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::integrity::Integrity;
use crate::dependency::DependencySpecifier;
use crate::error::{JpmError, Result};

/// What the registry knows about one concrete version of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub tarball_url: String,
    pub integrity: Integrity,
    pub dependencies: Vec<DependencySpecifier>,
}

impl PackageMetadata {
    /// The archive's remote filename, used as the cache key. Scoped packages
    /// get their scope prepended, since `@scope/foo` and `foo` publish
    /// tarballs with the same basename.
    pub fn archive_filename(&self) -> String {
        let remote = self
            .tarball_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                let base = self.name.rsplit('/').next().unwrap_or(&self.name);
                format!("{}-{}.tgz", base, self.version)
            });
        match self.scope() {
            Some(scope) => format!("{scope}-{remote}"),
            None => remote,
        }
    }

    /// `types` for `@types/node`.
    fn scope(&self) -> Option<&str> {
        self.name
            .strip_prefix('@')
            .and_then(|rest| rest.split_once('/'))
            .map(|(scope, _)| scope)
    }

    /// Parses a registry version document (`GET <registry>/<name>/<version>`).
    pub fn from_registry_json(bytes: &[u8]) -> Result<Self> {
        let doc: RegistryVersionDoc = serde_json::from_slice(bytes)?;
        doc.try_into()
    }
}

#[derive(Debug, Deserialize)]
struct RegistryVersionDoc {
    name: String,
    version: String,
    dist: RegistryDist,
    #[serde(default)]
    dependencies: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RegistryDist {
    tarball: Option<String>,
    integrity: Option<String>,
    shasum: Option<String>,
}

impl TryFrom<RegistryVersionDoc> for PackageMetadata {
    type Error = JpmError;

    fn try_from(doc: RegistryVersionDoc) -> Result<Self> {
        let tarball_url = doc.dist.tarball.filter(|t| !t.is_empty()).ok_or_else(|| {
            JpmError::Registry(format!(
                "No tarball URL in metadata for {}@{}",
                doc.name, doc.version
            ))
        })?;
        let integrity =
            Integrity::from_dist(doc.dist.integrity.as_deref(), doc.dist.shasum.as_deref())
                .map_err(|e| {
                    JpmError::Registry(format!(
                        "Unusable integrity for {}@{}: {e}",
                        doc.name, doc.version
                    ))
                })?;

        let dependencies = doc
            .dependencies
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, range)| match range {
                Value::String(range) => Some(DependencySpecifier::new(name, range)),
                other => {
                    warn!(
                        "Ignoring dependency '{}' of {}@{}: range is not a string ({})",
                        name, doc.name, doc.version, other
                    );
                    None
                }
            })
            .collect();

        Ok(Self {
            name: doc.name,
            version: doc.version,
            tarball_url,
            integrity,
            dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DigestAlgorithm;

    const LEFT_PAD: &str = r#"{
        "name": "left-pad",
        "version": "1.3.0",
        "dist": {
            "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
            "integrity": "sha512-XI5MPzVNApjAyhQzphX8BkmKsKUxD4LdyK24iZeQEQ=="
        },
        "dependencies": { "zeta": "^2.0.0", "alpha": "1.0.0 || ^1.1.0" }
    }"#;

    #[test]
    fn parses_registry_document_in_declared_order() {
        let meta = PackageMetadata::from_registry_json(LEFT_PAD.as_bytes()).unwrap();
        assert_eq!(meta.name, "left-pad");
        assert_eq!(meta.version, "1.3.0");
        assert_eq!(meta.integrity.algorithm, DigestAlgorithm::Sha512);
        assert_eq!(meta.archive_filename(), "left-pad-1.3.0.tgz");
        let names: Vec<_> = meta.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn missing_tarball_is_a_registry_error() {
        let doc = r#"{"name":"x","version":"1.0.0","dist":{"integrity":"sha1-AAAA"}}"#;
        assert!(matches!(
            PackageMetadata::from_registry_json(doc.as_bytes()),
            Err(JpmError::Registry(_))
        ));
    }

    #[test]
    fn archive_filename_ignores_query() {
        let mut meta = PackageMetadata::from_registry_json(LEFT_PAD.as_bytes()).unwrap();
        meta.tarball_url = "https://example.com/pkgs/foo-1.0.0.tgz?token=abc".into();
        assert_eq!(meta.archive_filename(), "foo-1.0.0.tgz");
    }

    #[test]
    fn scoped_archives_do_not_share_a_key_with_unscoped_ones() {
        let mut plain = PackageMetadata::from_registry_json(LEFT_PAD.as_bytes()).unwrap();
        plain.name = "foo".into();
        plain.tarball_url = "https://registry.npmjs.org/foo/-/foo-1.0.0.tgz".into();

        let mut scoped = plain.clone();
        scoped.name = "@acme/foo".into();
        scoped.tarball_url = "https://registry.npmjs.org/@acme/foo/-/foo-1.0.0.tgz".into();

        assert_eq!(plain.archive_filename(), "foo-1.0.0.tgz");
        assert_eq!(scoped.archive_filename(), "acme-foo-1.0.0.tgz");
    }
}
