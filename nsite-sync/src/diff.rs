//! Manifest diff computation
//!
//! Compares a desired manifest (`source`) with the current one (`target`)
//! and classifies every path into exactly one of three sets.

use std::collections::HashMap;

use nsite_index::{FileRecord, Manifest};
use tracing::debug;

/// Result of comparing two manifests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Source records missing from the target or differing in content
    pub to_transfer: Vec<FileRecord>,
    /// Source records the target already holds with identical content
    pub unchanged: Vec<FileRecord>,
    /// Target records whose path the source does not have
    pub to_delete: Vec<FileRecord>,
}

impl SyncPlan {
    pub fn has_changes(&self) -> bool {
        !self.to_transfer.is_empty() || !self.to_delete.is_empty()
    }

    /// Records to send: `to_transfer`, followed by `unchanged` when forced
    pub fn transfer_set(&self, force: bool) -> Vec<&FileRecord> {
        let forced: &[FileRecord] = if force { self.unchanged.as_slice() } else { &[] };
        self.to_transfer.iter().chain(forced).collect()
    }
}

/// Compute the plan turning `target` into `source`.
///
/// Runs in a single pass over `source` against a path lookup of `target`;
/// whatever the pass leaves in the lookup is scheduled for deletion. Output
/// vectors follow manifest (path) order.
pub fn diff_manifests(source: &Manifest, target: &Manifest) -> SyncPlan {
    let mut lookup: HashMap<&str, &FileRecord> = target
        .iter()
        .map(|record| (record.path.as_str(), record))
        .collect();

    let mut plan = SyncPlan::default();
    for record in source {
        match lookup.remove(record.path.as_str()) {
            Some(existing) if existing.content_hash == record.content_hash => {
                plan.unchanged.push(record.clone());
            }
            _ => plan.to_transfer.push(record.clone()),
        }
    }

    plan.to_delete = target
        .iter()
        .filter(|record| lookup.contains_key(record.path.as_str()))
        .cloned()
        .collect();

    debug!(
        "Diff: {} to transfer, {} unchanged, {} to delete",
        plan.to_transfer.len(),
        plan.unchanged.len(),
        plan.to_delete.len()
    );
    plan
}
