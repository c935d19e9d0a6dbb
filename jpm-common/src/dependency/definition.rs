// jpm-common/src/dependency/definition.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use super::resolver::resolve_version;
use crate::error::{JpmError, Result};

/// A declared dependency: a package name and the version range string found
/// in a manifest or in a package's own metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySpecifier {
    pub name: String,
    pub range: String,
}

impl DependencySpecifier {
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
        }
    }

    /// Picks the concrete version this specifier installs.
    pub fn to_request(&self) -> InstallRequest {
        InstallRequest::new(self.name.clone(), resolve_version(&self.range))
    }
}

impl fmt::Display for DependencySpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.range)
    }
}

/// The unit of work pushed through the install pipeline. Two requests are the
/// same request when both name and version match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstallRequest {
    pub name: String,
    pub version: String,
}

impl InstallRequest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for InstallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Checks that a package name maps to exactly one directory below the
/// dependency directory: a single plain component, or `@scope/name`.
pub fn validate_package_name(name: &str) -> Result<()> {
    let valid = match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, pkg)) => is_plain_component(scope) && is_plain_component(pkg),
            None => false,
        },
        None => is_plain_component(name),
    };
    if valid {
        Ok(())
    } else {
        Err(JpmError::Validation(format!(
            "Invalid package name '{name}': must be 'name' or '@scope/name'"
        )))
    }
}

fn is_plain_component(part: &str) -> bool {
    !part.is_empty()
        && !part.starts_with('.')
        && !part
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control())
}
