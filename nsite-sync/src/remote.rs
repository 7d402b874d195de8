//! Remote state: the published manifest and server list of a site

use nsite_index::{resolve_records, Manifest};
use nsite_relay::{
    parse_file_record, parse_server_list, Event, Filter, RelayError, KIND_SERVER_LIST,
    KIND_SITE_FILE,
};
use tracing::{debug, info};

use crate::context::SyncContext;
use crate::errors::{Result, SyncError};

async fn fetch_kind(context: &SyncContext, kind: u16) -> Result<Vec<Event>> {
    let filter = Filter::new().author(context.author).kind(kind);
    let limit = context.config.attempt_timeout;

    match tokio::time::timeout(limit, context.network.fetch(&filter)).await {
        Ok(result) => result.map_err(SyncError::ManifestFetch),
        Err(_) => Err(SyncError::ManifestFetch(RelayError::Network(format!(
            "fetch timed out after {:?}",
            limit
        )))),
    }
}

/// Reduce every published file record of the site to one record per path
pub async fn fetch_remote_manifest(context: &SyncContext) -> Result<Manifest> {
    let events = fetch_kind(context, KIND_SITE_FILE).await?;
    let records: Vec<_> = events.iter().filter_map(parse_file_record).collect();
    debug!(
        "{} usable file records out of {} events",
        records.len(),
        events.len()
    );

    let manifest = resolve_records(records);
    info!("{} files available online", manifest.len());
    Ok(manifest)
}

/// Servers from the newest published server list, empty if none exists
pub async fn fetch_published_servers(context: &SyncContext) -> Result<Vec<String>> {
    let events = fetch_kind(context, KIND_SERVER_LIST).await?;
    let servers = parse_server_list(&events);
    debug!("Published server list: {:?}", servers);
    Ok(servers)
}
