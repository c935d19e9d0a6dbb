// jpm-aio/src/lib.rs
//! IO operations for jpm (filesystem, json, checksums, extraction, process)

pub mod checksum;
pub mod extract;
pub mod fs;
pub mod json_io;
pub mod process;

// Re-export the primary functions
pub use checksum::{compute_digest, verify_integrity, verify_integrity_async};
pub use extract::{extractor_for, Extractor, NativeExtractor, TarCommandExtractor};
pub use json_io::{read_json, write_json_pretty};
pub use process::run_command_async;
