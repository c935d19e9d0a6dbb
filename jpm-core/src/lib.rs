// jpm-core/src/lib.rs

// Declare the top-level modules within the library crate
pub mod cache;
pub mod install;
pub mod manifest;

// Re-export key types for easier use by the CLI crate
pub use cache::{ArchiveCache, CacheOutcome};
pub use install::{
    place, FailedPackage, InstallReport, InstalledPackage, Installer, PackageFetcher,
    PlacementManager,
};
pub use manifest::Manifest;
