//! Helpers for end-to-end tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use nsite::blossom::MemoryBlobStore;
use nsite::crypto::{PublicKey, SiteIdentity};
use nsite::relay::LocalEventLog;
use nsite::sync::{ServerList, SyncConfig, SyncContext, SyncEngine};

pub const PRIMARY: &str = "https://blossom.one.example";
pub const MIRROR: &str = "https://blossom.two.example";

/// Lay out a small static site under `root`.
pub fn write_site(root: &Path) {
    std::fs::create_dir_all(root.join("assets/img")).unwrap();
    std::fs::write(root.join("index.html"), "<h1>welcome</h1>").unwrap();
    std::fs::write(root.join("blog.html"), "<h1>posts</h1>").unwrap();
    std::fs::write(root.join("assets/site.css"), "body { margin: 0 }").unwrap();
    std::fs::write(root.join("assets/img/logo.svg"), "<svg/>").unwrap();
}

pub fn servers() -> ServerList {
    ServerList::merge([[PRIMARY, MIRROR]]).unwrap()
}

/// Engine that publishes as `identity` through the log in `log_dir`.
pub async fn publisher(
    identity: Arc<SiteIdentity>,
    log_dir: &Path,
    blobs: &MemoryBlobStore,
    config: SyncConfig,
) -> SyncEngine {
    let log = LocalEventLog::open(log_dir).await.unwrap();
    let context = SyncContext::for_identity(identity, Arc::new(log), Arc::new(blobs.clone()))
        .with_config(config);
    SyncEngine::new(context)
}

/// Read-only engine for the site of `author`.
pub async fn reader(
    author: PublicKey,
    log_dir: &Path,
    blobs: &MemoryBlobStore,
    config: SyncConfig,
) -> SyncEngine {
    let log = LocalEventLog::open(log_dir).await.unwrap();
    let context =
        SyncContext::new(author, Arc::new(log), Arc::new(blobs.clone())).with_config(config);
    SyncEngine::new(context)
}
