// jpm-common/src/model/package_spec.rs
use std::fmt;
use std::str::FromStr;

use crate::error::{JpmError, Result};

pub const LATEST_TAG: &str = "latest";

/// A package argument as typed on the command line: `name`, `name@version`,
/// `@scope/name` or `@scope/name@version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpec {
    /// The version to ask the registry for.
    pub fn version_or_latest(&self) -> &str {
        self.version.as_deref().unwrap_or(LATEST_TAG)
    }
}

impl FromStr for PackageSpec {
    type Err = JpmError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        // A scope's leading '@' is part of the name, not a version separator.
        let search_from = usize::from(s.starts_with('@'));
        let (name, version) = match s[search_from..].find('@') {
            Some(idx) => {
                let split = search_from + idx;
                (&s[..split], Some(&s[split + 1..]))
            }
            None => (s, None),
        };

        if name.is_empty() || name == "@" || (name.starts_with('@') && !name.contains('/')) {
            return Err(JpmError::Validation(format!("Invalid package name in '{s}'")));
        }
        let version = version.map(str::trim).filter(|v| !v.is_empty());

        Ok(Self {
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version_or_latest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> PackageSpec {
        s.parse().unwrap()
    }

    #[test]
    fn plain_and_versioned_names() {
        assert_eq!(
            parse("foo"),
            PackageSpec {
                name: "foo".into(),
                version: None
            }
        );
        assert_eq!(parse("foo@1.2.3").version.as_deref(), Some("1.2.3"));
        assert_eq!(parse("foo@").version, None);
        assert_eq!(parse("foo").version_or_latest(), "latest");
    }

    #[test]
    fn scoped_names_keep_their_at_sign() {
        let spec = parse("@types/node@20.1.0");
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.version.as_deref(), Some("20.1.0"));

        let spec = parse("@types/node");
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.version, None);
    }

    #[test]
    fn rejects_empty_and_bare_scopes() {
        assert!("".parse::<PackageSpec>().is_err());
        assert!("@1.0.0".parse::<PackageSpec>().is_err());
        assert!("@scope".parse::<PackageSpec>().is_err());
    }
}
