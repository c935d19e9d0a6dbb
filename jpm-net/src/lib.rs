// jpm-net/src/lib.rs
pub mod http;
pub mod registry;
pub mod validation;

pub use http::{build_http_client, Fetcher, HttpFetcher};
pub use registry::{MetadataSource, RegistryClient};
pub use validation::validate_url;
