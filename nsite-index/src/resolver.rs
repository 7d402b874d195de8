//! Reduction of published record history into a manifest
//!
//! The event network only appends: every publish of a path adds another
//! record. The current state of a site is therefore derived client-side by
//! grouping records by path and keeping the newest one.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::manifest::{FileRecord, Manifest};

/// Reduce raw records (possibly several per path) to one record per path.
///
/// The record with the greatest `changed_at` wins; a missing timestamp counts
/// as 0. When timestamps are equal the record with the lexicographically
/// smallest `source_ref` wins, so the result does not depend on the order in
/// which records arrived.
pub fn resolve_records(records: impl IntoIterator<Item = FileRecord>) -> Manifest {
    let mut newest: HashMap<String, FileRecord> = HashMap::new();
    let mut total = 0usize;

    for record in records {
        total += 1;
        match newest.get(&record.path) {
            Some(current) if !supersedes(&record, current) => {}
            _ => {
                newest.insert(record.path.clone(), record);
            }
        }
    }

    debug!("Resolved {} records into {} paths", total, newest.len());
    newest.into_values().collect()
}

fn supersedes(candidate: &FileRecord, current: &FileRecord) -> bool {
    let candidate_ts = candidate.changed_at.unwrap_or(0);
    let current_ts = current.changed_at.unwrap_or(0);

    match candidate_ts.cmp(&current_ts) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.source_ref < current.source_ref,
    }
}
