//! Upload, download and listing runs
//!
//! A run scans the local tree and resolves the remote manifest, diffs them,
//! then hands the plan to the transfer and deletion stages. Setup problems
//! abort with a `SyncError`; per-file problems end up in the `SyncReport`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use nsite_index::{FileRecord, Manifest, TreeScanner};
use nsite_relay::server_list_template;
use tracing::{debug, enabled, info, warn, Level};

use crate::context::{attempt, SyncContext};
use crate::deletion::{delete_local, delete_remote};
use crate::diff::diff_manifests;
use crate::download::download_files;
use crate::errors::{Result, SyncError};
use crate::remote::{fetch_published_servers, fetch_remote_manifest};
use crate::report::SyncReport;
use crate::servers::{ServerList, DEFAULT_SERVERS};
use crate::upload::upload_files;

/// Name the 404 fallback is published under
pub const FALLBACK_FILE: &str = "404.html";

/// Where blob server candidates come from, highest priority first
#[derive(Debug, Clone)]
pub struct ServerSources {
    /// Servers named for this run only
    pub overrides: Vec<String>,
    /// Servers from project configuration or environment
    pub configured: Vec<String>,
    /// Use `DEFAULT_SERVERS` when no other source names a server
    pub use_defaults: bool,
    /// Publish the merged list when it names servers the published one lacks
    pub publish_on_change: bool,
}

impl Default for ServerSources {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            configured: Vec::new(),
            use_defaults: true,
            publish_on_change: false,
        }
    }
}

/// `hash<TAB>timestamp<TAB>path`, with `-` for an unknown timestamp
pub fn listing_line(record: &FileRecord) -> String {
    let changed = record
        .changed_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{}\t{}\t{}", record.content_hash, changed, record.path)
}

fn log_files<'a>(label: &str, records: impl IntoIterator<Item = &'a FileRecord>) {
    if !enabled!(Level::DEBUG) {
        return;
    }
    for record in records {
        debug!("{}: {}", label, listing_line(record));
    }
}

pub struct SyncEngine {
    context: SyncContext,
}

impl SyncEngine {
    pub fn new(context: SyncContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Merge server candidates with the site's published server list.
    pub async fn resolve_servers(&self, sources: &ServerSources) -> Result<ServerList> {
        let published = fetch_published_servers(&self.context).await?;

        let nothing_named =
            sources.overrides.is_empty() && sources.configured.is_empty() && published.is_empty();
        let defaults: Vec<String> = if sources.use_defaults && nothing_named {
            DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };

        let servers = ServerList::merge([
            &sources.overrides,
            &sources.configured,
            &published,
            &defaults,
        ])?;
        info!("Using blob servers: {}", servers.as_slice().join(", "));

        if sources.publish_on_change && servers.extends(&published) {
            self.publish_server_list(&servers).await;
        }
        Ok(servers)
    }

    async fn publish_server_list(&self, servers: &ServerList) {
        let identity = match self.context.signer() {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Not publishing server list: {}", e);
                return;
            }
        };

        info!("Publishing blob server list");
        let published = match server_list_template(servers.as_slice()).sign(identity) {
            Ok(event) => attempt(self.context.config.attempt_timeout, self.context.network.publish(event)).await,
            Err(e) => Err(e.to_string()),
        };
        if let Err(reason) = published {
            warn!("Failed to publish server list: {}", reason);
        }
    }

    /// Resolved remote manifest of the site
    pub async fn list(&self) -> Result<Manifest> {
        fetch_remote_manifest(&self.context).await
    }

    /// Make the published site match the tree at `root`.
    pub async fn upload(&self, root: &Path, servers: &ServerList) -> Result<SyncReport> {
        self.context.signer()?;
        let config = &self.context.config;

        if let Some(fallback) = &config.fallback {
            copy_fallback(root, fallback).await?;
        }

        let local = TreeScanner::new(root).scan().await?;
        if local.is_empty() {
            return Err(SyncError::EmptySite(root.to_path_buf()));
        }
        info!("{} files found locally in {}", local.len(), root.display());
        log_files("local", &local);

        let remote = fetch_remote_manifest(&self.context).await?;
        log_files("online", &remote);

        let plan = diff_manifests(&local, &remote);
        info!(
            "{} new files to upload, {} files unchanged, {} files to delete online",
            plan.to_transfer.len(),
            plan.unchanged.len(),
            plan.to_delete.len()
        );

        let mut report = SyncReport::new();
        if !config.force {
            report.unchanged = plan.unchanged.iter().map(|r| r.path.clone()).collect();
        }

        let to_send = plan.transfer_set(config.force);
        upload_files(
            &self.context,
            servers,
            to_send.iter().copied(),
            &remote,
            &mut report,
        )
        .await?;
        log_files("uploaded", to_send.iter().copied());

        if config.purge {
            let retained: HashSet<_> = local.iter().map(|r| r.content_hash).collect();
            delete_remote(&self.context, servers, &plan.to_delete, &retained, &mut report).await?;
        } else if !plan.to_delete.is_empty() {
            info!(
                "{} files online are no longer local; purge to remove them",
                plan.to_delete.len()
            );
        }

        report.finish();
        info!("Upload finished: {}", report.summary());
        Ok(report)
    }

    /// Make the tree at `root` match the published site.
    pub async fn download(&self, root: &Path, servers: &ServerList) -> Result<SyncReport> {
        let remote = fetch_remote_manifest(&self.context).await?;
        log_files("online", &remote);

        let local = TreeScanner::new(root).scan().await?;
        info!("{} files found locally in {}", local.len(), root.display());
        log_files("local", &local);

        let plan = diff_manifests(&remote, &local);
        info!(
            "{} new files to download, {} files unchanged, {} files to delete locally",
            plan.to_transfer.len(),
            plan.unchanged.len(),
            plan.to_delete.len()
        );

        let mut report = SyncReport::new();
        report.unchanged = plan.unchanged.iter().map(|r| r.path.clone()).collect();

        download_files(&self.context, servers, &plan.to_transfer, root, &mut report).await;
        log_files("downloaded", &plan.to_transfer);

        if self.context.config.purge {
            delete_local(&plan.to_delete, &mut report).await;
        }

        report.finish();
        info!("Download finished: {}", report.summary());
        Ok(report)
    }
}

async fn copy_fallback(root: &Path, fallback: &str) -> Result<()> {
    let source: PathBuf = root.join(fallback.trim_start_matches('/'));
    let target = root.join(FALLBACK_FILE);
    if source == target {
        return Ok(());
    }

    debug!(
        "Copying 404 fallback from {} to {}",
        source.display(),
        target.display()
    );
    tokio::fs::copy(&source, &target)
        .await
        .map_err(|source_err| SyncError::Fallback {
            path: source.clone(),
            source: source_err,
        })?;
    Ok(())
}
