//! Outcome of a sync run

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::errors::{FailureKind, FileFailure};

/// Summary of one upload or download run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Paths whose content reached at least one destination
    pub transferred: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            transferred: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record a per-file failure and log it
    pub fn fail(&mut self, path: &str, kind: FailureKind, reason: impl Into<String>) {
        let failure = FileFailure {
            path: path.to_string(),
            kind,
            reason: reason.into(),
        };
        warn!("{}", failure);
        self.failures.push(failure);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &FileFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    /// Whether any file failed to reach its destination
    pub fn has_blocking_failures(&self) -> bool {
        self.failures.iter().any(|f| f.kind.is_blocking())
    }

    pub fn duration_secs(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} transferred, {} unchanged, {} deleted, {} failed",
            self.transferred.len(),
            self.unchanged.len(),
            self.deleted.len(),
            self.failures.len()
        )
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}
