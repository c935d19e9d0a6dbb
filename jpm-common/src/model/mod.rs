// jpm-common/src/model/mod.rs
// Declares the modules within the model directory.
pub mod integrity;
pub mod metadata;
pub mod package_spec;

// Re-export
pub use integrity::{DigestAlgorithm, DigestEncoding, Integrity};
pub use metadata::PackageMetadata;
pub use package_spec::{PackageSpec, LATEST_TAG};
