//! Upload fan-out
//!
//! Files are uploaded one at a time. Each file goes to every server at once;
//! the first server to accept it triggers the single publish of its index
//! record. Remaining attempts either drain or are aborted, depending on the
//! straggler policy, before the next file starts.

use std::sync::Arc;

use bytes::Bytes;
use nsite_blossom::AuthProof;
use nsite_crypto::{AuthVerb, SiteIdentity};
use nsite_index::{ContentHash, FileRecord, Manifest};
use nsite_relay::file_record_template;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::StragglerPolicy;
use crate::context::{attempt, SyncContext};
use crate::errors::{FailureKind, Result};
use crate::report::SyncReport;
use crate::servers::ServerList;

/// How the server attempts for one file ended
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutStats {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub published: bool,
}

/// Upload `files` in order, publishing one record per stored file.
///
/// New records are timestamped after the matching record in `published`
/// so they win the reduction even within the same second.
pub async fn upload_files<'a, I>(
    context: &SyncContext,
    servers: &ServerList,
    files: I,
    published: &Manifest,
    report: &mut SyncReport,
) -> Result<()>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let identity = context.signer()?;
    for record in files {
        let not_before = published
            .get(&record.path)
            .and_then(|previous| previous.changed_at)
            .map(|changed_at| changed_at + 1);
        let stats = upload_file(context, identity, servers, record, not_before, report).await;
        debug!("Upload of {} finished: {:?}", record.path, stats);
    }
    Ok(())
}

async fn read_local(record: &FileRecord) -> std::result::Result<Bytes, String> {
    let local_path = record
        .local_path
        .as_ref()
        .ok_or_else(|| "no local file for this record".to_string())?;
    let data = tokio::fs::read(local_path)
        .await
        .map_err(|e| format!("failed to read {}: {}", local_path.display(), e))?;

    if ContentHash::of(&data) != record.content_hash {
        return Err(format!("{} changed since it was scanned", local_path.display()));
    }
    Ok(Bytes::from(data))
}

pub(crate) async fn upload_file(
    context: &SyncContext,
    identity: &SiteIdentity,
    servers: &ServerList,
    record: &FileRecord,
    not_before: Option<i64>,
    report: &mut SyncReport,
) -> FanOutStats {
    let path = record.path.as_str();
    let mut stats = FanOutStats::default();

    let data = match read_local(record).await {
        Ok(data) => data,
        Err(reason) => {
            report.fail(path, FailureKind::Transfer, reason);
            return stats;
        }
    };
    let auth = match AuthProof::sign(identity, AuthVerb::Upload, &record.content_hash) {
        Ok(auth) => auth,
        Err(e) => {
            report.fail(path, FailureKind::Transfer, e.to_string());
            return stats;
        }
    };

    let limit = context.config.attempt_timeout;
    let mut attempts = JoinSet::new();
    for server in servers.iter() {
        let blobs = Arc::clone(&context.blobs);
        let server = server.to_string();
        let data = data.clone();
        let auth = auth.clone();
        let expected = record.content_hash;

        attempts.spawn(async move {
            let result = attempt(limit, blobs.put(&server, data, &auth))
                .await
                .and_then(|stored| {
                    if stored == expected {
                        Ok(())
                    } else {
                        Err(format!("server stored {} instead of {}", stored, expected))
                    }
                });
            (server, result)
        });
    }

    let mut errors = Vec::new();
    while let Some(joined) = attempts.join_next().await {
        match joined {
            Ok((server, Ok(()))) => {
                stats.succeeded += 1;
                debug!("Stored {} on {}", path, server);

                if !stats.published {
                    stats.published = true;
                    publish_record(context, identity, record, not_before, report).await;

                    if context.config.straggler_policy == StragglerPolicy::Cancel {
                        attempts.abort_all();
                    }
                }
            }
            Ok((server, Err(reason))) => {
                stats.failed += 1;
                debug!("Upload of {} to {} failed: {}", path, server, reason);
                errors.push(format!("{}: {}", server, reason));
            }
            Err(e) if e.is_cancelled() => stats.cancelled += 1,
            Err(e) => {
                stats.failed += 1;
                errors.push(format!("upload task failed: {}", e));
            }
        }
    }

    if stats.published {
        info!(
            "Uploaded {} to {}/{} servers",
            path,
            stats.succeeded,
            servers.len()
        );
        report.transferred.push(path.to_string());
    } else {
        report.fail(
            path,
            FailureKind::Transfer,
            format!("all servers failed ({})", errors.join("; ")),
        );
    }
    stats
}

async fn publish_record(
    context: &SyncContext,
    identity: &SiteIdentity,
    record: &FileRecord,
    not_before: Option<i64>,
    report: &mut SyncReport,
) {
    let template = file_record_template(
        &record.path,
        &record.content_hash,
        &context.config.client_marker,
    );
    let created_at = template.created_at.max(not_before.unwrap_or_default());
    let event = match template.created_at(created_at).sign(identity) {
        Ok(event) => event,
        Err(e) => {
            report.fail(&record.path, FailureKind::Publish, e.to_string());
            return;
        }
    };

    match attempt(context.config.attempt_timeout, context.network.publish(event)).await {
        Ok(id) => debug!("Published record {} for {}", id, record.path),
        // the blob stays on the servers without a record pointing at it
        Err(reason) => report.fail(&record.path, FailureKind::Publish, reason),
    }
}
