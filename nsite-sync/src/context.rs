use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nsite_blossom::BlobStore;
use nsite_crypto::{PublicKey, SiteIdentity};
use nsite_relay::EventNetwork;

use crate::config::SyncConfig;
use crate::errors::{Result, SyncError};

/// Everything a run needs, built once and passed to every stage.
///
/// `author` is the site being read; `signer`, when present, is the identity
/// allowed to change it.
#[derive(Clone)]
pub struct SyncContext {
    pub author: PublicKey,
    pub signer: Option<Arc<SiteIdentity>>,
    pub network: Arc<dyn EventNetwork>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: SyncConfig,
}

impl SyncContext {
    /// Read-only context for the site published by `author`
    pub fn new(author: PublicKey, network: Arc<dyn EventNetwork>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            author,
            signer: None,
            network,
            blobs,
            config: SyncConfig::default(),
        }
    }

    /// Context that may publish as `identity`
    pub fn for_identity(
        identity: Arc<SiteIdentity>,
        network: Arc<dyn EventNetwork>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let mut context = Self::new(identity.public_key(), network, blobs);
        context.signer = Some(identity);
        context
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn signer(&self) -> Result<&SiteIdentity> {
        self.signer.as_deref().ok_or(SyncError::MissingSigner)
    }
}

/// Run `future` with the per-attempt deadline, flattening both failure modes
/// into a message.
pub(crate) async fn attempt<T, E, F>(limit: Duration, future: F) -> std::result::Result<T, String>
where
    E: Display,
    F: Future<Output = std::result::Result<T, E>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {:?}", limit)),
    }
}
