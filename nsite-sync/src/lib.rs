//! Synchronization engine for nsite
//!
//! This crate reconciles a local directory with the site published under an
//! identity:
//! - Server list resolution across overrides, configuration and the
//!   published list
//! - Manifest diff computation
//! - Upload fan-out with a single publish per file
//! - Download with ordered server fallback
//! - Best-effort deletion of content and index records
//! - Run reports with per-file failures

pub mod config;
pub mod context;
pub mod deletion;
pub mod diff;
pub mod download;
pub mod engine;
pub mod errors;
pub mod remote;
pub mod report;
pub mod servers;
pub mod upload;

pub use config::{StragglerPolicy, SyncConfig};
pub use context::SyncContext;
pub use deletion::{delete_local, delete_remote};
pub use diff::{diff_manifests, SyncPlan};
pub use download::download_files;
pub use engine::{listing_line, ServerSources, SyncEngine, FALLBACK_FILE};
pub use errors::{FailureKind, FileFailure, Result, SyncError};
pub use remote::{fetch_published_servers, fetch_remote_manifest};
pub use report::SyncReport;
pub use servers::{ServerList, DEFAULT_SERVERS};
pub use upload::{upload_files, FanOutStats};
