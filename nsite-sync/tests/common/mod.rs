//! Scriptable collaborators for sync tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use nsite_blossom::{AuthProof, BlobError, BlobStore};
use nsite_crypto::SiteIdentity;
use nsite_index::ContentHash;
use nsite_relay::{Event, EventNetwork, Filter, MemoryEventNetwork, RelayError};
use nsite_sync::{ServerList, SyncConfig, SyncContext};

pub const S1: &str = "https://s1.example";
pub const S2: &str = "https://s2.example";
pub const S3: &str = "https://s3.example";

/// How a scripted server answers every request
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Accept,
    Reject,
    /// Answer like `Accept`, after a delay
    Slow(Duration),
    /// Acknowledge or serve the wrong bytes
    Corrupt,
}

#[derive(Default)]
pub struct ScriptedBlobStore {
    behaviors: HashMap<String, Behavior>,
    stored: Mutex<HashMap<(String, ContentHash), Bytes>>,
    calls: Mutex<Vec<(String, &'static str)>>,
}

impl ScriptedBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, server: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(server.to_string(), behavior);
        self
    }

    pub fn seed(&self, server: &str, data: &[u8]) -> ContentHash {
        let hash = ContentHash::of(data);
        self.stored
            .lock()
            .unwrap()
            .insert((server.to_string(), hash), Bytes::copy_from_slice(data));
        hash
    }

    pub fn holds(&self, server: &str, hash: &ContentHash) -> bool {
        self.stored
            .lock()
            .unwrap()
            .contains_key(&(server.to_string(), *hash))
    }

    /// `(server, operation)` in call order
    pub fn calls(&self) -> Vec<(String, &'static str)> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, server: &str, operation: &'static str) -> Result<(), BlobError> {
        self.calls
            .lock()
            .unwrap()
            .push((server.to_string(), operation));

        match self.behavior(server) {
            Behavior::Reject => Err(BlobError::Status {
                server: server.to_string(),
                status: 500,
                message: "scripted failure".to_string(),
            }),
            Behavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Behavior::Accept | Behavior::Corrupt => Ok(()),
        }
    }

    fn behavior(&self, server: &str) -> Behavior {
        self.behaviors
            .get(server)
            .copied()
            .unwrap_or(Behavior::Accept)
    }
}

#[async_trait]
impl BlobStore for ScriptedBlobStore {
    async fn put(&self, server: &str, data: Bytes, _auth: &AuthProof) -> Result<ContentHash, BlobError> {
        self.enter(server, "put").await?;
        if let Behavior::Corrupt = self.behavior(server) {
            return Ok(ContentHash::of(b"not what was sent"));
        }

        let hash = ContentHash::of(&data);
        self.stored
            .lock()
            .unwrap()
            .insert((server.to_string(), hash), data);
        Ok(hash)
    }

    async fn get(&self, server: &str, hash: &ContentHash) -> Result<Bytes, BlobError> {
        self.enter(server, "get").await?;
        if let Behavior::Corrupt = self.behavior(server) {
            return Ok(Bytes::from_static(b"corrupted"));
        }

        self.stored
            .lock()
            .unwrap()
            .get(&(server.to_string(), *hash))
            .cloned()
            .ok_or_else(|| BlobError::NotFound(hash.to_hex()))
    }

    async fn delete(&self, server: &str, hash: &ContentHash, _auth: &AuthProof) -> Result<(), BlobError> {
        self.enter(server, "delete").await?;
        self.stored
            .lock()
            .unwrap()
            .remove(&(server.to_string(), *hash))
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(hash.to_hex()))
    }
}

/// Event network that counts publishes and can be told to fail
#[derive(Default)]
pub struct RecordingNetwork {
    pub inner: MemoryEventNetwork,
    publishes: AtomicUsize,
    fail_publish: AtomicBool,
    fail_fetch: AtomicBool,
}

impl RecordingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventNetwork for RecordingNetwork {
    async fn fetch(&self, filter: &Filter) -> Result<Vec<Event>, RelayError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RelayError::Network("relay unreachable".to_string()));
        }
        self.inner.fetch(filter).await
    }

    async fn publish(&self, event: Event) -> Result<String, RelayError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(RelayError::Network("relay rejected event".to_string()));
        }
        self.inner.publish(event).await
    }
}

pub fn servers(urls: &[&str]) -> ServerList {
    ServerList::merge([urls]).unwrap()
}

pub fn context(
    blobs: Arc<ScriptedBlobStore>,
    network: Arc<RecordingNetwork>,
    config: SyncConfig,
) -> SyncContext {
    SyncContext::for_identity(Arc::new(SiteIdentity::generate()), network, blobs).with_config(config)
}
