//! Mapping between site data and event tags
//!
//! File records: `d` = "/" + path, `x` = content hash (legacy alias
//! `sha256`), `client` = producer marker. Server lists: one `server` tag per
//! URL. Retractions: one `e` tag per retracted record id.

use nsite_index::{validate_path, ContentHash, FileRecord};
use tracing::debug;

use crate::event::{Event, EventTemplate, KIND_DELETION, KIND_SERVER_LIST, KIND_SITE_FILE};

pub fn file_record_template(path: &str, hash: &ContentHash, client: &str) -> EventTemplate {
    EventTemplate::new(KIND_SITE_FILE)
        .tag("d", format!("/{}", path.trim_start_matches('/')))
        .tag("x", hash.to_hex())
        .tag("client", client)
}

/// Turn a stored file record event back into a `FileRecord`.
///
/// Returns `None` for events missing a path or hash, or carrying values that
/// cannot be used safely (malformed hash, path escaping the site root).
pub fn parse_file_record(event: &Event) -> Option<FileRecord> {
    if event.kind != KIND_SITE_FILE {
        return None;
    }

    let raw_path = event.tag_value("d")?;
    let raw_hash = event
        .tag_value("x")
        .or_else(|| event.tag_value("sha256"))?;

    let path = match validate_path(raw_path.strip_prefix('/').unwrap_or(raw_path)) {
        Ok(path) => path.to_string(),
        Err(e) => {
            debug!("Skipping record {}: {}", event.id, e);
            return None;
        }
    };
    let content_hash = match ContentHash::from_hex(raw_hash) {
        Ok(hash) => hash,
        Err(e) => {
            debug!("Skipping record {}: {}", event.id, e);
            return None;
        }
    };

    Some(
        FileRecord::new(path, content_hash)
            .with_changed_at(event.created_at)
            .with_source_ref(event.id.clone()),
    )
}

pub fn server_list_template(servers: &[String]) -> EventTemplate {
    servers
        .iter()
        .fold(EventTemplate::new(KIND_SERVER_LIST), |template, server| {
            template.tag("server", server.clone())
        })
}

/// Server URLs from the newest server list event in `events`
pub fn parse_server_list(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.kind == KIND_SERVER_LIST)
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| b.id.cmp(&a.id))
        })
        .map(|event| event.tag_values("server").map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn deletion_template(record_ids: &[String], reason: &str) -> EventTemplate {
    record_ids
        .iter()
        .fold(
            EventTemplate::new(KIND_DELETION).content(reason),
            |template, id| template.tag("e", id.clone()),
        )
}
