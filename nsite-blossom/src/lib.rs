//! Blob server access for nsite
//!
//! Site content lives on content-addressed blob servers: a blob is stored
//! and fetched by the SHA-256 of its bytes. `BlobStore` is the capability
//! set the sync engine consumes; `BlossomClient` speaks HTTP to real servers
//! and `MemoryBlobStore` keeps everything in process.

pub mod client;
pub mod errors;
pub mod memory;
pub mod store;

pub use client::{BlobDescriptor, BlossomClient};
pub use errors::{BlobError, Result};
pub use memory::MemoryBlobStore;
pub use store::{verify_blob, AuthProof, BlobStore, DEFAULT_AUTH_TTL_SECS};
