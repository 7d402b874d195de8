use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nsite_index::ContentHash;
use tokio::sync::RwLock;

use crate::errors::{BlobError, Result};
use crate::store::{AuthProof, BlobStore};

#[derive(Default)]
struct Servers {
    blobs: HashMap<String, HashMap<ContentHash, Bytes>>,
    offline: HashSet<String>,
}

/// In-memory blob servers, keyed by server URL.
///
/// Servers marked offline reject every request, which lets tests script
/// partial outages.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<RwLock<Servers>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_offline(&self, server: &str, offline: bool) {
        let mut inner = self.inner.write().await;
        if offline {
            inner.offline.insert(server.to_string());
        } else {
            inner.offline.remove(server);
        }
    }

    /// Whether `server` currently holds `hash`
    pub async fn contains(&self, server: &str, hash: &ContentHash) -> bool {
        self.inner
            .read()
            .await
            .blobs
            .get(server)
            .is_some_and(|blobs| blobs.contains_key(hash))
    }

    /// Place a blob on `server` directly, bypassing authorization
    pub async fn seed(&self, server: &str, data: Bytes) -> ContentHash {
        let hash = ContentHash::of(&data);
        self.inner
            .write()
            .await
            .blobs
            .entry(server.to_string())
            .or_default()
            .insert(hash, data);
        hash
    }

    fn ensure_online(inner: &Servers, server: &str) -> Result<()> {
        if inner.offline.contains(server) {
            return Err(BlobError::Status {
                server: server.to_string(),
                status: 503,
                message: "server offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, server: &str, data: Bytes, _auth: &AuthProof) -> Result<ContentHash> {
        let mut inner = self.inner.write().await;
        Self::ensure_online(&inner, server)?;

        let hash = ContentHash::of(&data);
        inner
            .blobs
            .entry(server.to_string())
            .or_default()
            .insert(hash, data);
        Ok(hash)
    }

    async fn get(&self, server: &str, hash: &ContentHash) -> Result<Bytes> {
        let inner = self.inner.read().await;
        Self::ensure_online(&inner, server)?;

        inner
            .blobs
            .get(server)
            .and_then(|blobs| blobs.get(hash))
            .cloned()
            .ok_or_else(|| BlobError::NotFound(format!("{} on {}", hash, server)))
    }

    async fn delete(&self, server: &str, hash: &ContentHash, _auth: &AuthProof) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::ensure_online(&inner, server)?;

        let removed = inner
            .blobs
            .get_mut(server)
            .and_then(|blobs| blobs.remove(hash));
        match removed {
            Some(_) => Ok(()),
            None => Err(BlobError::NotFound(format!("{} on {}", hash, server))),
        }
    }
}
