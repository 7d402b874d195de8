//! Whole upload/download runs through `SyncEngine`

mod common;

use std::fs;
use std::sync::Arc;

use nsite_crypto::SiteIdentity;
use nsite_relay::{EventNetwork, Filter, KIND_SERVER_LIST, KIND_SITE_FILE};
use nsite_sync::{
    ServerSources, SyncConfig, SyncContext, SyncEngine, SyncError, DEFAULT_SERVERS, FALLBACK_FILE,
};
use tempfile::tempdir;

use common::{context, servers, RecordingNetwork, ScriptedBlobStore, S1, S2};

fn write_site(root: &std::path::Path) {
    fs::create_dir_all(root.join("css")).unwrap();
    fs::write(root.join("index.html"), b"<h1>home</h1>").unwrap();
    fs::write(root.join("about.html"), b"<h1>about</h1>").unwrap();
    fs::write(root.join("css/site.css"), b"body{}").unwrap();
}

fn engine(
    blobs: &Arc<ScriptedBlobStore>,
    network: &Arc<RecordingNetwork>,
    config: SyncConfig,
) -> SyncEngine {
    SyncEngine::new(context(blobs.clone(), network.clone(), config))
}

#[tokio::test]
async fn test_upload_then_download_reproduces_site() {
    let site = tempdir().unwrap();
    let mirror = tempdir().unwrap();
    write_site(site.path());

    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let uploader = engine(&blobs, &network, SyncConfig::default());
    let list = servers(&[S1, S2]);

    let report = uploader.upload(site.path(), &list).await.unwrap();
    assert_eq!(report.transferred.len(), 3);
    assert!(report.failures.is_empty());
    assert!(report.finished_at.is_some());
    assert_eq!(network.publishes(), 3);

    let reader = SyncEngine::new(SyncContext::new(
        uploader.context().author,
        network.clone(),
        blobs.clone(),
    ));
    let report = reader.download(mirror.path(), &list).await.unwrap();
    assert_eq!(report.transferred.len(), 3);
    assert_eq!(
        fs::read(mirror.path().join("css/site.css")).unwrap(),
        b"body{}"
    );

    let again = reader.download(mirror.path(), &list).await.unwrap();
    assert!(again.transferred.is_empty());
    assert_eq!(again.unchanged.len(), 3);
}

#[tokio::test]
async fn test_second_upload_only_sends_changes() {
    let site = tempdir().unwrap();
    write_site(site.path());
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let uploader = engine(&blobs, &network, SyncConfig::default());
    let list = servers(&[S1]);

    uploader.upload(site.path(), &list).await.unwrap();
    fs::write(site.path().join("about.html"), b"<h1>about us</h1>").unwrap();

    let report = uploader.upload(site.path(), &list).await.unwrap();
    assert_eq!(report.transferred, vec!["about.html"]);
    assert_eq!(report.unchanged, vec!["css/site.css", "index.html"]);
    assert_eq!(network.publishes(), 4);

    let manifest = uploader.list().await.unwrap();
    assert_eq!(manifest.len(), 3);
    assert_eq!(
        manifest.get("about.html").unwrap().content_hash,
        nsite_index::ContentHash::of(b"<h1>about us</h1>")
    );
}

#[tokio::test]
async fn test_force_republishes_unchanged_files() {
    let site = tempdir().unwrap();
    write_site(site.path());
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let list = servers(&[S1]);

    let identity = Arc::new(SiteIdentity::generate());
    let plain = SyncEngine::new(SyncContext::for_identity(
        identity.clone(),
        network.clone(),
        blobs.clone(),
    ));
    plain.upload(site.path(), &list).await.unwrap();

    let forced = SyncEngine::new(
        SyncContext::for_identity(identity, network.clone(), blobs.clone()).with_config(
            SyncConfig {
                force: true,
                ..Default::default()
            },
        ),
    );
    let report = forced.upload(site.path(), &list).await.unwrap();
    assert_eq!(report.transferred.len(), 3);
    assert!(report.unchanged.is_empty());
    assert_eq!(network.publishes(), 6);
}

#[tokio::test]
async fn test_purge_removes_files_gone_locally() {
    let site = tempdir().unwrap();
    write_site(site.path());
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let identity = Arc::new(SiteIdentity::generate());
    let list = servers(&[S1]);

    let without_purge = SyncEngine::new(SyncContext::for_identity(
        identity.clone(),
        network.clone(),
        blobs.clone(),
    ));
    without_purge.upload(site.path(), &list).await.unwrap();
    let about_hash = without_purge.list().await.unwrap().get("about.html").unwrap().content_hash;

    fs::remove_file(site.path().join("about.html")).unwrap();
    let report = without_purge.upload(site.path(), &list).await.unwrap();
    assert!(report.deleted.is_empty());
    assert!(without_purge.list().await.unwrap().contains("about.html"));

    let with_purge = SyncEngine::new(
        SyncContext::for_identity(identity, network.clone(), blobs.clone()).with_config(
            SyncConfig {
                purge: true,
                ..Default::default()
            },
        ),
    );
    let report = with_purge.upload(site.path(), &list).await.unwrap();
    assert_eq!(report.deleted, vec!["about.html"]);
    assert!(!blobs.holds(S1, &about_hash));
    assert!(!with_purge.list().await.unwrap().contains("about.html"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_backslash_names_are_stable_across_uploads() {
    let site = tempdir().unwrap();
    fs::write(site.path().join("a\\b.txt"), b"literal backslash").unwrap();
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let config = SyncConfig {
        purge: true,
        ..Default::default()
    };
    let uploader = engine(&blobs, &network, config);
    let list = servers(&[S1]);

    let first = uploader.upload(site.path(), &list).await.unwrap();
    assert_eq!(first.transferred, vec!["a\\b.txt"]);

    let second = uploader.upload(site.path(), &list).await.unwrap();
    assert!(second.transferred.is_empty());
    assert!(second.deleted.is_empty());
    assert_eq!(second.unchanged, vec!["a\\b.txt"]);

    let manifest = uploader.list().await.unwrap();
    assert_eq!(manifest.paths().collect::<Vec<_>>(), vec!["a\\b.txt"]);
}

#[tokio::test]
async fn test_empty_site_is_refused_before_touching_the_network() {
    let site = tempdir().unwrap();
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    network.fail_fetch(true);

    let result = engine(&blobs, &network, SyncConfig::default())
        .upload(site.path(), &servers(&[S1]))
        .await;
    assert!(matches!(result, Err(SyncError::EmptySite(_))));
    assert_eq!(network.publishes(), 0);
}

#[tokio::test]
async fn test_upload_without_signer_fails() {
    let site = tempdir().unwrap();
    write_site(site.path());
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());

    let reader = SyncEngine::new(SyncContext::new(
        SiteIdentity::generate().public_key(),
        network,
        blobs,
    ));
    let result = reader.upload(site.path(), &servers(&[S1])).await;
    assert!(matches!(result, Err(SyncError::MissingSigner)));
}

#[tokio::test]
async fn test_unreachable_event_network_aborts_run() {
    let site = tempdir().unwrap();
    write_site(site.path());
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    network.fail_fetch(true);

    let result = engine(&blobs, &network, SyncConfig::default())
        .upload(site.path(), &servers(&[S1]))
        .await;
    assert!(matches!(result, Err(SyncError::ManifestFetch(_))));
    assert!(blobs.calls().is_empty());
}

#[tokio::test]
async fn test_fallback_is_uploaded_as_404() {
    let site = tempdir().unwrap();
    write_site(site.path());
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let config = SyncConfig {
        fallback: Some("/index.html".to_string()),
        ..Default::default()
    };

    let uploader = engine(&blobs, &network, config);
    uploader.upload(site.path(), &servers(&[S1])).await.unwrap();

    let manifest = uploader.list().await.unwrap();
    assert_eq!(
        manifest.get(FALLBACK_FILE).unwrap().content_hash,
        manifest.get("index.html").unwrap().content_hash
    );
}

#[tokio::test]
async fn test_download_purge_removes_extra_local_files() {
    let site = tempdir().unwrap();
    let mirror = tempdir().unwrap();
    write_site(site.path());
    fs::write(mirror.path().join("extra.txt"), b"local only").unwrap();

    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let uploader = engine(&blobs, &network, SyncConfig::default());
    let list = servers(&[S1]);
    uploader.upload(site.path(), &list).await.unwrap();

    let keep = SyncEngine::new(SyncContext::new(
        uploader.context().author,
        network.clone(),
        blobs.clone(),
    ));
    keep.download(mirror.path(), &list).await.unwrap();
    assert!(mirror.path().join("extra.txt").exists());

    let purge = SyncEngine::new(
        SyncContext::new(uploader.context().author, network.clone(), blobs.clone()).with_config(
            SyncConfig {
                purge: true,
                ..Default::default()
            },
        ),
    );
    let report = purge.download(mirror.path(), &list).await.unwrap();
    assert_eq!(report.deleted, vec!["extra.txt"]);
    assert!(!mirror.path().join("extra.txt").exists());
}

#[tokio::test]
async fn test_server_resolution_and_publish_on_change() {
    let blobs = Arc::new(ScriptedBlobStore::new());
    let network = Arc::new(RecordingNetwork::new());
    let uploader = engine(&blobs, &network, SyncConfig::default());

    let defaults = uploader.resolve_servers(&ServerSources::default()).await.unwrap();
    assert_eq!(defaults.as_slice(), DEFAULT_SERVERS);
    assert_eq!(network.publishes(), 0);

    let none = uploader
        .resolve_servers(&ServerSources {
            use_defaults: false,
            ..Default::default()
        })
        .await;
    assert!(matches!(none, Err(SyncError::NoServers)));

    let sources = ServerSources {
        overrides: vec![format!("{}/", S2)],
        configured: vec![S1.to_string()],
        publish_on_change: true,
        ..Default::default()
    };
    let resolved = uploader.resolve_servers(&sources).await.unwrap();
    assert_eq!(resolved.as_slice(), [S2, S1]);
    assert_eq!(network.publishes(), 1);

    let author = uploader.context().author;
    let lists = network
        .fetch(&Filter::new().author(author).kind(KIND_SERVER_LIST))
        .await
        .unwrap();
    assert_eq!(lists.len(), 1);

    // published list now covers everything, so nothing new is published
    let again = uploader.resolve_servers(&sources).await.unwrap();
    assert_eq!(again, resolved);
    assert_eq!(network.publishes(), 1);

    // the published list is picked up by readers with no configuration
    let reader = SyncEngine::new(SyncContext::new(author, network.clone(), blobs.clone()));
    let discovered = reader.resolve_servers(&ServerSources::default()).await.unwrap();
    assert_eq!(discovered.as_slice(), [S2, S1]);

    let files = network
        .fetch(&Filter::new().kind(KIND_SITE_FILE))
        .await
        .unwrap();
    assert!(files.is_empty());
}
