//! Error types for sync runs
//!
//! `SyncError` is reserved for conditions that abort a whole run. Problems
//! confined to one file are collected as `FileFailure`s in the run report.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Local scan failed: {0}")]
    Scan(#[from] nsite_index::IndexError),

    #[error("Failed to fetch remote manifest: {0}")]
    ManifestFetch(#[source] nsite_relay::RelayError),

    #[error("No blob servers configured or published")]
    NoServers,

    #[error("A signing identity is required for this operation")]
    MissingSigner,

    #[error("No files found in local source folder {}", .0.display())]
    EmptySite(PathBuf),

    #[error("Failed to copy 404 fallback {}: {source}", .path.display())]
    Fallback {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Stage of per-file processing that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Every server failed to store or serve the content
    Transfer,
    /// Content was stored but its index record could not be published
    Publish,
    /// Content could not be removed
    DeleteContent,
    /// The index record could not be retracted
    DeleteRecord,
    /// Downloaded content could not be written locally
    Write,
}

impl FailureKind {
    /// Failures that leave the requested state unreached.
    ///
    /// Publish and delete problems only leave stale or orphaned data behind.
    pub fn is_blocking(&self) -> bool {
        matches!(self, FailureKind::Transfer | FailureKind::Write)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Transfer => "transfer",
            FailureKind::Publish => "publish",
            FailureKind::DeleteContent => "delete content",
            FailureKind::DeleteRecord => "delete record",
            FailureKind::Write => "write",
        };
        f.write_str(name)
    }
}

/// One file that could not be fully processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for {}: {}", self.kind, self.path, self.reason)
    }
}
