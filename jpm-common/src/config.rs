// jpm-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::UserDirs;
use tracing::debug;

use super::error::{JpmError, Result};

const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;

pub const MANIFEST_FILENAME: &str = "package.json";
pub const DEPS_DIR_NAME: &str = "node_modules";
pub const NESTED_DIR_NAME: &str = "node_modules";
pub const ARCHIVE_ROOT_DIR: &str = "package";
const STAGING_DIR_NAME: &str = ".staging";

/// Which archive extraction collaborator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    /// Shell out to the system `tar` utility.
    #[default]
    Tar,
    /// Unpack in-process with flate2 + tar.
    Native,
}

impl FromStr for ExtractorKind {
    type Err = JpmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tar" => Ok(Self::Tar),
            "native" => Ok(Self::Native),
            other => Err(JpmError::Config(format!(
                "Unknown extractor '{other}' (expected 'tar' or 'native')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_root: PathBuf,
    pub jpm_home: PathBuf,
    pub cache_dir: PathBuf,
    pub registry_url: String,
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    pub extractor: ExtractorKind,
}

impl Config {
    /// Loads configuration for the project rooted at `project_root`, reading
    /// overrides from the `JPM_*` environment variables.
    pub fn load(project_root: &Path) -> Result<Self> {
        debug!("Loading jpm configuration for {}", project_root.display());

        let jpm_home = env::var("JPM_HOME")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = UserDirs::new()
                    .map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf());
                home.join(".jpm")
            });

        let cache_dir = env::var("JPM_CACHE_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| jpm_home.join("cache"));

        let registry_url = env::var("JPM_REGISTRY")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string());

        let fetch_timeout_secs = match env::var("JPM_FETCH_TIMEOUT_SECS") {
            Ok(raw) if !raw.is_empty() => raw.parse::<u64>().map_err(|e| {
                JpmError::Config(format!("Invalid JPM_FETCH_TIMEOUT_SECS '{raw}': {e}"))
            })?,
            _ => DEFAULT_FETCH_TIMEOUT_SECS,
        };

        let extractor = match env::var("JPM_EXTRACTOR") {
            Ok(raw) if !raw.is_empty() => raw.parse()?,
            _ => ExtractorKind::default(),
        };

        debug!(
            "Effective jpm home: {}, cache: {}, registry: {}",
            jpm_home.display(),
            cache_dir.display(),
            registry_url
        );

        Ok(Self {
            project_root: project_root.to_path_buf(),
            jpm_home,
            cache_dir,
            registry_url,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            extractor,
        })
    }

    /// Builds a configuration with explicit roots and defaults for everything
    /// else. No environment lookups.
    pub fn with_roots(project_root: &Path, cache_dir: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            jpm_home: cache_dir.to_path_buf(),
            cache_dir: cache_dir.to_path_buf(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            extractor: ExtractorKind::default(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_root.join(MANIFEST_FILENAME)
    }

    pub fn deps_dir(&self) -> PathBuf {
        self.project_root.join(DEPS_DIR_NAME)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.deps_dir().join(STAGING_DIR_NAME)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.jpm_home.join("logs")
    }

    /// Top-level location of a package.
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.deps_dir().join(name)
    }

    /// Location of a package nested under the package directory `parent_dir`.
    pub fn nested_package_dir(&self, parent_dir: &Path, name: &str) -> PathBuf {
        parent_dir.join(NESTED_DIR_NAME).join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_follow_the_project_root() {
        let config = Config::with_roots(Path::new("/work/app"), Path::new("/tmp/jpm-cache"));
        assert_eq!(config.manifest_path(), PathBuf::from("/work/app/package.json"));
        assert_eq!(config.deps_dir(), PathBuf::from("/work/app/node_modules"));
        assert_eq!(
            config.package_dir("@types/node"),
            PathBuf::from("/work/app/node_modules/@types/node")
        );
        assert_eq!(
            config.nested_package_dir(&config.package_dir("a"), "c"),
            PathBuf::from("/work/app/node_modules/a/node_modules/c")
        );
        assert_eq!(config.cache_dir(), Path::new("/tmp/jpm-cache"));
    }

    #[test]
    fn extractor_kind_parses_known_names() {
        assert_eq!("tar".parse::<ExtractorKind>().unwrap(), ExtractorKind::Tar);
        assert_eq!(" Native ".parse::<ExtractorKind>().unwrap(), ExtractorKind::Native);
        assert!(matches!(
            "unzip".parse::<ExtractorKind>(),
            Err(JpmError::Config(_))
        ));
    }
}
