// jpm-common/src/dependency/mod.rs
pub mod definition;
pub mod resolver;

pub use definition::{validate_package_name, DependencySpecifier, InstallRequest};
pub use resolver::resolve_version;
