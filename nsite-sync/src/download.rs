//! Download with ordered fallback
//!
//! Servers are tried strictly in list order, one at a time, until one returns
//! bytes matching the expected hash.

use std::io;
use std::path::Path;

use nsite_blossom::verify_blob;
use nsite_index::{validate_path, FileRecord};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::{attempt, SyncContext};
use crate::errors::FailureKind;
use crate::report::SyncReport;
use crate::servers::ServerList;

/// Download `files` below `root`, in order.
pub async fn download_files<'a, I>(
    context: &SyncContext,
    servers: &ServerList,
    files: I,
    root: &Path,
    report: &mut SyncReport,
) where
    I: IntoIterator<Item = &'a FileRecord>,
{
    for record in files {
        download_file(context, servers, record, root, report).await;
    }
}

async fn download_file(
    context: &SyncContext,
    servers: &ServerList,
    record: &FileRecord,
    root: &Path,
    report: &mut SyncReport,
) {
    let path = record.path.as_str();
    let destination = match validate_path(path) {
        Ok(relative) => root.join(relative),
        Err(e) => {
            report.fail(path, FailureKind::Write, e.to_string());
            return;
        }
    };

    let mut errors = Vec::new();
    for server in servers.iter() {
        let fetched = attempt(
            context.config.attempt_timeout,
            context.blobs.get(server, &record.content_hash),
        )
        .await
        .and_then(|data| {
            verify_blob(&record.content_hash, &data)
                .map(|_| data)
                .map_err(|e| e.to_string())
        });

        match fetched {
            Ok(data) => {
                match write_atomic(&destination, &data).await {
                    Ok(()) => {
                        info!("Downloaded {} from {}", path, server);
                        report.transferred.push(path.to_string());
                    }
                    Err(e) => report.fail(
                        path,
                        FailureKind::Write,
                        format!("{}: {}", destination.display(), e),
                    ),
                }
                return;
            }
            Err(reason) => {
                debug!("Download of {} from {} failed: {}", path, server, reason);
                errors.push(format!("{}: {}", server, reason));
            }
        }
    }

    report.fail(
        path,
        FailureKind::Transfer,
        format!("all servers failed ({})", errors.join("; ")),
    );
}

/// Write `data` to a temporary sibling of `destination`, then rename it into
/// place. Missing parent directories are created.
pub(crate) async fn write_atomic(destination: &Path, data: &[u8]) -> io::Result<()> {
    let parent = destination
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    fs::create_dir_all(parent).await?;

    let file_name = destination
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download");
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let written = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, destination).await
    }
    .await;

    if written.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_replaces() {
        let temp_dir = tempdir().unwrap();
        let destination = temp_dir.path().join("a/b/c.txt");

        write_atomic(&destination, b"first").await.unwrap();
        write_atomic(&destination, b"second").await.unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"second");
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path().join("a/b"))
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_write_atomic_over_directory_fails_cleanly() {
        let temp_dir = tempdir().unwrap();
        let destination = temp_dir.path().join("taken");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("inner"), b"x").unwrap();

        assert!(write_atomic(&destination, b"data").await.is_err());
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
