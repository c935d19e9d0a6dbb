// jpm-core/src/install/engine.rs
// Depth-first dependency traversal with an explicit worklist.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use jpm_aio::extract::{extractor_for, Extractor};
use jpm_common::config::{Config, ARCHIVE_ROOT_DIR};
use jpm_common::dependency::{validate_package_name, DependencySpecifier, InstallRequest};
use jpm_common::error::{JpmError, Result};
use jpm_common::model::PackageMetadata;
use jpm_common::pipeline::InstallEvent;
use jpm_net::http::{Fetcher, HttpFetcher};
use jpm_net::registry::{MetadataSource, RegistryClient};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use super::archive::PackageFetcher;
use super::placement::PlacementManager;
use crate::cache::{ArchiveCache, CacheOutcome};

#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub request: InstallRequest,
    /// Version reported by the registry, which differs from the request
    /// when the request named a dist-tag.
    pub resolved_version: String,
    pub path: PathBuf,
    pub nested: bool,
}

#[derive(Debug, Clone)]
pub struct FailedPackage {
    pub request: InstallRequest,
    pub error: JpmError,
}

/// Outcome of one `install` run.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub installed: Vec<InstalledPackage>,
    pub failed: Vec<FailedPackage>,
    /// Each truncated cycle as `name@version` entries, from the first
    /// repeated request back to itself.
    pub cycles: Vec<Vec<String>>,
    pub duplicates_skipped: usize,
}

impl InstallReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn installed_path(&self, name: &str, version: &str) -> Option<&Path> {
        self.installed
            .iter()
            .find(|p| p.request.name == name && p.request.version == version)
            .map(|p| p.path.as_path())
    }
}

/// One level of the active install path. The root frame has no request and
/// holds the manifest's dependencies.
struct Frame {
    request: Option<InstallRequest>,
    package_dir: Option<PathBuf>,
    pending: VecDeque<DependencySpecifier>,
}

/// Per-run traversal state. Nothing here outlives a single `install` call.
#[derive(Default)]
struct Traversal {
    seen: HashSet<InstallRequest>,
    /// Name -> (version, dir) of the copy living in the shared directory.
    canonical: HashMap<String, (String, PathBuf)>,
    report: InstallReport,
}

pub struct Installer {
    config: Config,
    registry: Arc<dyn MetadataSource>,
    packages: PackageFetcher,
    placement: PlacementManager,
    events: Option<broadcast::Sender<InstallEvent>>,
}

impl Installer {
    pub fn new(
        config: Config,
        registry: Arc<dyn MetadataSource>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let cache = Arc::new(ArchiveCache::new(config.cache_dir()));
        let placement = PlacementManager::new(config.staging_dir(), ARCHIVE_ROOT_DIR, extractor);
        Self {
            registry,
            packages: PackageFetcher::new(cache, fetcher),
            placement,
            events: None,
            config,
        }
    }

    /// Wires up the registry client, HTTP fetcher and extractor named by
    /// `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = Arc::new(RegistryClient::from_config(&config)?);
        let fetcher = Arc::new(HttpFetcher::from_config(&config)?);
        let extractor = extractor_for(config.extractor);
        Ok(Self::new(config, registry, fetcher, extractor))
    }

    pub fn with_events(mut self, events: broadcast::Sender<InstallEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ArchiveCache {
        self.packages.cache()
    }

    fn emit(&self, event: InstallEvent) {
        if let Some(tx) = &self.events {
            // No subscribers is fine.
            let _ = tx.send(event);
        }
    }

    /// Removes the staging root once no extraction is writing into it.
    pub async fn sweep_staging(&self) {
        self.placement.settle_and_sweep().await;
    }

    /// Installs `roots` and everything they depend on.
    ///
    /// Per-package failures are collected in the report; only errors that are
    /// not node failures (see [`JpmError::is_node_failure`]) abort the run.
    #[instrument(skip_all, fields(roots = roots.len()))]
    pub async fn install(&self, roots: &[DependencySpecifier]) -> Result<InstallReport> {
        let start = Instant::now();
        self.emit(InstallEvent::InstallStarted {
            root_count: roots.len(),
        });

        let result = self.traverse(roots).await;
        self.sweep_staging().await;
        let report = result?;

        self.emit(InstallEvent::InstallFinished {
            duration_secs: start.elapsed().as_secs_f64(),
            installed_count: report.installed.len(),
            skipped_count: report.duplicates_skipped + report.cycles.len(),
            fail_count: report.failed.len(),
        });
        info!(
            "Installed {} package(s), {} failed, {} skipped",
            report.installed.len(),
            report.failed.len(),
            report.duplicates_skipped + report.cycles.len()
        );
        Ok(report)
    }

    async fn traverse(&self, roots: &[DependencySpecifier]) -> Result<InstallReport> {
        let mut state = Traversal::default();
        let mut stack = vec![Frame {
            request: None,
            package_dir: None,
            pending: roots.iter().cloned().collect(),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(spec) = frame.pending.pop_front() else {
                if let Some(done) = stack.pop().and_then(|f| f.request) {
                    debug!("Finished subtree of {}", done);
                }
                continue;
            };
            let request = spec.to_request();

            if let Some(pos) = stack
                .iter()
                .position(|f| f.request.as_ref() == Some(&request))
            {
                let chain: Vec<String> = stack[pos..]
                    .iter()
                    .filter_map(|f| f.request.as_ref().map(ToString::to_string))
                    .chain(std::iter::once(request.to_string()))
                    .collect();
                warn!("Circular dependency detected: {}", chain.join(" -> "));
                self.emit(InstallEvent::CircularDependency {
                    chain: chain.clone(),
                });
                state.report.cycles.push(chain);
                continue;
            }

            if !state.seen.insert(request.clone()) {
                debug!("Skipping {}: already scheduled", request);
                state.report.duplicates_skipped += 1;
                continue;
            }

            // Names become paths under the dependency directory; anything that
            // could resolve elsewhere never reaches placement.
            if let Err(e) = validate_package_name(&request.name) {
                error!("Refusing to install {}: {}", request, e);
                self.emit(InstallEvent::package_failed(request.to_string(), &e));
                state.report.failed.push(FailedPackage { request, error: e });
                continue;
            }

            let parent_dir = stack.last().and_then(|f| f.package_dir.as_deref());
            let (target, nested) = self.placement_target(&mut state, &request, parent_dir);

            match self.install_node(&request, &target, nested).await {
                Ok(metadata) => {
                    state.report.installed.push(InstalledPackage {
                        request: request.clone(),
                        resolved_version: metadata.version,
                        path: target.clone(),
                        nested,
                    });
                    stack.push(Frame {
                        request: Some(request),
                        package_dir: Some(target),
                        pending: metadata.dependencies.into(),
                    });
                }
                Err(e) if e.is_node_failure() => {
                    error!("Failed to install {}: {}", request, e);
                    self.emit(InstallEvent::package_failed(request.to_string(), &e));
                    state.report.failed.push(FailedPackage { request, error: e });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(state.report)
    }

    /// Chooses where `request` lives. The first version of a name seen in a
    /// run owns the shared directory; any other version nests under the
    /// package that asked for it, or under the owner when the manifest asked.
    fn placement_target(
        &self,
        state: &mut Traversal,
        request: &InstallRequest,
        parent_dir: Option<&Path>,
    ) -> (PathBuf, bool) {
        let conflict = state
            .canonical
            .get(&request.name)
            .filter(|(version, _)| *version != request.version)
            .cloned();
        if let Some((version, canonical_dir)) = conflict {
            let parent = parent_dir.unwrap_or(canonical_dir.as_path());
            debug!(
                "{} conflicts with canonical {}@{}; nesting under {}",
                request,
                request.name,
                version,
                parent.display()
            );
            return (self.config.nested_package_dir(parent, &request.name), true);
        }

        let dir = self.config.package_dir(&request.name);
        state
            .canonical
            .insert(request.name.clone(), (request.version.clone(), dir.clone()));
        (dir, false)
    }

    async fn install_node(
        &self,
        request: &InstallRequest,
        target: &Path,
        nested: bool,
    ) -> Result<PackageMetadata> {
        let target_id = request.to_string();
        let metadata = self
            .registry
            .metadata(&request.name, &request.version)
            .await?;

        self.emit(InstallEvent::FetchStarted {
            target_id: target_id.clone(),
            url: metadata.tarball_url.clone(),
        });
        let outcome = self.packages.obtain(&metadata).await?;
        self.emit(match &outcome {
            CacheOutcome::Hit(path) => InstallEvent::CacheHit {
                target_id: target_id.clone(),
                path: path.clone(),
            },
            CacheOutcome::Downloaded { path, size_bytes } => InstallEvent::DownloadFinished {
                target_id: target_id.clone(),
                path: path.clone(),
                size_bytes: *size_bytes,
            },
        });
        self.placement
            .install_archive(&request.name, outcome.path(), target)
            .await?;

        debug!("Installed {} at {}", target_id, target.display());
        self.emit(InstallEvent::PackageInstalled {
            target_id,
            path: target.to_path_buf(),
            nested,
        });
        Ok(metadata)
    }
}
