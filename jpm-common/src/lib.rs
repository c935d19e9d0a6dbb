// jpm-common/src/lib.rs
pub mod config;
pub mod dependency;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::Config;
pub use dependency::{DependencySpecifier, InstallRequest};
pub use error::{JpmError, Result};
pub use model::{Integrity, PackageMetadata, PackageSpec};
pub use pipeline::InstallEvent;
