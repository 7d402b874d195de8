use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, Result};
use crate::hash::ContentHash;

/// One file of a site, either scanned locally or reconstructed from a
/// published index record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Slash-separated path relative to the site root, without a leading slash
    pub path: String,
    pub content_hash: ContentHash,
    /// Where the bytes live on disk (only set for locally scanned records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Unix seconds
    #[serde(default)]
    pub changed_at: Option<i64>,
    /// Id of the index record this entry was reduced from
    #[serde(default)]
    pub source_ref: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content_hash: ContentHash) -> Self {
        Self {
            path: path.into(),
            content_hash,
            local_path: None,
            changed_at: None,
            source_ref: None,
        }
    }

    pub fn with_local_path(mut self, local_path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }

    pub fn with_changed_at(mut self, changed_at: i64) -> Self {
        self.changed_at = Some(changed_at);
        self
    }

    pub fn with_source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    /// Whether this record was indexed on the event network
    pub fn has_provenance(&self) -> bool {
        self.source_ref.is_some()
    }
}

/// Check that `path` is a site path in the form the scanner produces:
/// `/`-separated segments relative to the site root.
///
/// The path is returned unchanged so a published record reads back exactly
/// as it was written. Empty paths, absolute paths and empty, `.` or `..`
/// segments are rejected, so a remote record can never address a file
/// outside the site root.
pub fn validate_path(path: &str) -> Result<&str> {
    let valid = !path.is_empty()
        && path
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."));

    if valid {
        Ok(path)
    } else {
        Err(IndexError::InvalidPath(path.to_string()))
    }
}

/// Resolved view of a site: exactly one record per path.
///
/// Iteration order is by path, which keeps transfer batches and logs
/// deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    records: BTreeMap<String, FileRecord>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the one it replaced at the same path
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(record.path.clone(), record)
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records.into_values().collect()
    }
}

/// Later records replace earlier ones at the same path.
impl FromIterator<FileRecord> for Manifest {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        for record in iter {
            manifest.insert(record);
        }
        manifest
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a FileRecord;
    type IntoIter = std::collections::btree_map::Values<'a, String, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}
