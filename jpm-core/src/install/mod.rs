// jpm-core/src/install/mod.rs
// Dependency installation: archive fetching, placement and graph traversal.

// --- Submodules ---
pub mod archive;
pub mod engine;
pub mod placement;

pub use archive::PackageFetcher;
pub use engine::{FailedPackage, InstallReport, InstalledPackage, Installer};
pub use placement::{place, sweep_staging, PlacementManager};
