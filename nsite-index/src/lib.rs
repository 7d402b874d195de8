//! File indexing for nsite
//!
//! This crate owns the data model shared by every other part of the system:
//! - `ContentHash`: SHA-256 digest identifying a blob
//! - `FileRecord` / `Manifest`: one record per site path
//! - `TreeScanner`: builds a manifest from a local directory
//! - `resolve_records`: reduces an append-only record history to a manifest

pub mod errors;
pub mod hash;
pub mod manifest;
pub mod resolver;
pub mod scanner;

pub use errors::{IndexError, Result};
pub use hash::{ContentHash, ContentHasher};
pub use manifest::{validate_path, FileRecord, Manifest};
pub use resolver::resolve_records;
pub use scanner::{ScannerConfig, TreeScanner};
