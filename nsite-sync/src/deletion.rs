//! Best-effort removal of files that left the site
//!
//! Nothing here aborts a run: every failure is logged and reported per file.

use std::collections::HashSet;

use nsite_blossom::{AuthProof, BlobError};
use nsite_crypto::{AuthVerb, SiteIdentity};
use nsite_index::{ContentHash, FileRecord};
use nsite_relay::deletion_template;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::context::{attempt, SyncContext};
use crate::errors::{FailureKind, Result};
use crate::report::SyncReport;
use crate::servers::ServerList;

const RETRACTION_REASON: &str = "File deletion through sync with nsite-cli.";

/// Remove published files: their blobs from every server, then their
/// index records.
///
/// Blobs listed in `retained` are still referenced by a path the site
/// keeps, so only the record of the removed path is retracted. Records
/// that were never published are skipped.
pub async fn delete_remote<'a, I>(
    context: &SyncContext,
    servers: &ServerList,
    records: I,
    retained: &HashSet<ContentHash>,
    report: &mut SyncReport,
) -> Result<()>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let identity = context.signer()?;

    for record in records {
        let Some(record_id) = record.source_ref.as_deref() else {
            debug!("Skipping {}: never published", record.path);
            continue;
        };

        if retained.contains(&record.content_hash) {
            debug!(
                "Keeping blob {} of {}: still used by the site",
                record.content_hash, record.path
            );
        } else {
            delete_content(context, identity, servers, record, report).await;
        }

        retract_record(context, identity, record, record_id, report).await;
    }
    Ok(())
}

async fn delete_content(
    context: &SyncContext,
    identity: &SiteIdentity,
    servers: &ServerList,
    record: &FileRecord,
    report: &mut SyncReport,
) {
    let hash = &record.content_hash;
    let auth = match AuthProof::sign(identity, AuthVerb::Delete, hash) {
        Ok(auth) => auth,
        Err(e) => {
            report.fail(&record.path, FailureKind::DeleteContent, e.to_string());
            return;
        }
    };

    let mut removed = 0;
    let mut errors = Vec::new();
    for server in servers.iter() {
        info!("Deleting blob {} from server {}", hash, server);
        let limit = context.config.attempt_timeout;
        match tokio::time::timeout(limit, context.blobs.delete(server, hash, &auth)).await {
            Ok(Ok(())) => removed += 1,
            Ok(Err(BlobError::NotFound(_))) => debug!("Blob {} not on {}", hash, server),
            Ok(Err(e)) => {
                warn!("Error deleting blob {} from server {}: {}", hash, server, e);
                errors.push(format!("{}: {}", server, e));
            }
            Err(_) => {
                warn!("Deleting blob {} from server {} timed out", hash, server);
                errors.push(format!("{}: timed out after {:?}", server, limit));
            }
        }
    }

    if removed == 0 && !errors.is_empty() {
        report.fail(
            &record.path,
            FailureKind::DeleteContent,
            format!("no server removed the blob ({})", errors.join("; ")),
        );
    }
}

async fn retract_record(
    context: &SyncContext,
    identity: &SiteIdentity,
    record: &FileRecord,
    record_id: &str,
    report: &mut SyncReport,
) {
    let event = match deletion_template(&[record_id.to_string()], RETRACTION_REASON).sign(identity) {
        Ok(event) => event,
        Err(e) => {
            report.fail(&record.path, FailureKind::DeleteRecord, e.to_string());
            return;
        }
    };

    info!("Deleting record {} of {}", record_id, record.path);
    match attempt(context.config.attempt_timeout, context.network.publish(event)).await {
        Ok(id) => {
            debug!("Published retraction {}", id);
            report.deleted.push(record.path.clone());
        }
        Err(reason) => report.fail(&record.path, FailureKind::DeleteRecord, reason),
    }
}

/// Remove local files that the remote site no longer has
pub async fn delete_local<'a, I>(records: I, report: &mut SyncReport)
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    for record in records {
        let Some(local_path) = record.local_path.as_ref() else {
            continue;
        };

        match fs::remove_file(local_path).await {
            Ok(()) => {
                info!("Removed local file {}", local_path.display());
                report.deleted.push(record.path.clone());
            }
            Err(e) => report.fail(
                &record.path,
                FailureKind::DeleteContent,
                format!("failed to delete {}: {}", local_path.display(), e),
            ),
        }
    }
}
