//! Publishing and mirroring a site through a persistent event log and
//! in-memory blob servers

mod common;

use std::fs;
use std::sync::Arc;

use nsite::blossom::MemoryBlobStore;
use nsite::crypto::SiteIdentity;
use nsite::index::ContentHash;
use nsite::sync::{FailureKind, ServerSources, SyncConfig};
use tempfile::tempdir;

use common::{publisher, reader, servers, write_site, MIRROR, PRIMARY};

#[tokio::test]
async fn test_mirror_reproduces_published_site() {
    let site = tempdir().unwrap();
    let mirror = tempdir().unwrap();
    let log_dir = tempdir().unwrap();
    write_site(site.path());

    let blobs = MemoryBlobStore::new();
    let identity = Arc::new(SiteIdentity::generate());
    let author = identity.public_key();

    let engine = publisher(identity, log_dir.path(), &blobs, SyncConfig::default()).await;
    let report = engine.upload(site.path(), &servers()).await.unwrap();
    assert_eq!(report.transferred.len(), 4);
    assert!(report.failures.is_empty());

    // the first server drops out before the mirror runs
    blobs.set_offline(PRIMARY, true).await;
    let mirror_engine = reader(author, log_dir.path(), &blobs, SyncConfig::default()).await;
    let report = mirror_engine
        .download(mirror.path(), &servers())
        .await
        .unwrap();
    assert_eq!(report.transferred.len(), 4);
    assert!(!report.has_blocking_failures());

    for path in ["index.html", "blog.html", "assets/site.css", "assets/img/logo.svg"] {
        assert_eq!(
            fs::read(mirror.path().join(path)).unwrap(),
            fs::read(site.path().join(path)).unwrap(),
            "{} differs",
            path
        );
    }
}

#[tokio::test]
async fn test_content_held_by_one_server_only() {
    let site = tempdir().unwrap();
    let mirror = tempdir().unwrap();
    let log_dir = tempdir().unwrap();
    write_site(site.path());

    let blobs = MemoryBlobStore::new();
    blobs.set_offline(MIRROR, true).await;
    let identity = Arc::new(SiteIdentity::generate());
    let author = identity.public_key();

    let engine = publisher(identity, log_dir.path(), &blobs, SyncConfig::default()).await;
    let report = engine.upload(site.path(), &servers()).await.unwrap();
    assert_eq!(report.transferred.len(), 4);
    assert!(report.failures.is_empty());

    let index_hash = ContentHash::of(b"<h1>welcome</h1>");
    assert!(blobs.contains(PRIMARY, &index_hash).await);
    assert!(!blobs.contains(MIRROR, &index_hash).await);

    blobs.set_offline(MIRROR, false).await;
    blobs.set_offline(PRIMARY, true).await;
    let mirror_engine = reader(author, log_dir.path(), &blobs, SyncConfig::default()).await;
    let report = mirror_engine
        .download(mirror.path(), &servers())
        .await
        .unwrap();

    assert!(report.transferred.is_empty());
    assert_eq!(report.failures_of(FailureKind::Transfer).count(), 4);
    assert!(report.has_blocking_failures());
    assert!(!mirror.path().join("index.html").exists());
}

#[tokio::test]
async fn test_site_history_survives_reopening_the_log() {
    let site = tempdir().unwrap();
    let log_dir = tempdir().unwrap();
    write_site(site.path());

    let blobs = MemoryBlobStore::new();
    let identity = Arc::new(SiteIdentity::generate());

    let first = publisher(identity.clone(), log_dir.path(), &blobs, SyncConfig::default()).await;
    first.upload(site.path(), &servers()).await.unwrap();
    drop(first);

    fs::write(site.path().join("index.html"), "<h1>welcome back</h1>").unwrap();
    fs::remove_file(site.path().join("blog.html")).unwrap();

    let purging = SyncConfig {
        purge: true,
        ..Default::default()
    };
    let second = publisher(identity.clone(), log_dir.path(), &blobs, purging).await;
    let report = second.upload(site.path(), &servers()).await.unwrap();
    assert_eq!(report.transferred, vec!["index.html"]);
    assert_eq!(report.deleted, vec!["blog.html"]);
    assert_eq!(report.unchanged.len(), 2);
    drop(second);

    let later = reader(
        identity.public_key(),
        log_dir.path(),
        &blobs,
        SyncConfig::default(),
    )
    .await;
    let manifest = later.list().await.unwrap();
    assert_eq!(
        manifest.paths().collect::<Vec<_>>(),
        vec!["assets/img/logo.svg", "assets/site.css", "index.html"]
    );
    assert_eq!(
        manifest.get("index.html").unwrap().content_hash,
        ContentHash::of(b"<h1>welcome back</h1>")
    );

    let blog_hash = ContentHash::of(b"<h1>posts</h1>");
    assert!(!blobs.contains(PRIMARY, &blog_hash).await);
    assert!(!blobs.contains(MIRROR, &blog_hash).await);
}

#[tokio::test]
async fn test_published_server_list_guides_readers() {
    let log_dir = tempdir().unwrap();
    let blobs = MemoryBlobStore::new();
    let identity = Arc::new(SiteIdentity::generate());

    let engine = publisher(identity.clone(), log_dir.path(), &blobs, SyncConfig::default()).await;
    let sources = ServerSources {
        configured: vec![PRIMARY.to_string(), format!("{}/", MIRROR)],
        publish_on_change: true,
        ..Default::default()
    };
    let resolved = engine.resolve_servers(&sources).await.unwrap();
    assert_eq!(resolved.as_slice(), [PRIMARY, MIRROR]);

    let visitor = reader(
        identity.public_key(),
        log_dir.path(),
        &blobs,
        SyncConfig::default(),
    )
    .await;
    let discovered = visitor
        .resolve_servers(&ServerSources::default())
        .await
        .unwrap();
    assert_eq!(discovered, resolved);
}
