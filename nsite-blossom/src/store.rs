use async_trait::async_trait;
use bytes::Bytes;
use nsite_crypto::{AuthVerb, SiteIdentity};
use nsite_index::ContentHash;

use crate::errors::{BlobError, Result};

/// Lifetime of a freshly signed authorization proof
pub const DEFAULT_AUTH_TTL_SECS: i64 = 300;

/// Per-request authorization, sent verbatim as the `Authorization` header.
///
/// Stores never look inside it; they only forward it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthProof(String);

impl AuthProof {
    pub fn new(header: impl Into<String>) -> Self {
        Self(header.into())
    }

    /// Sign a proof allowing `verb` on `hash`
    pub fn sign(identity: &SiteIdentity, verb: AuthVerb, hash: &ContentHash) -> Result<Self> {
        let authorization = identity.authorize(verb, &hash.to_hex(), DEFAULT_AUTH_TTL_SECS);
        Ok(Self(authorization.to_header()?))
    }

    pub fn as_header(&self) -> &str {
        &self.0
    }
}

/// Content-addressed storage spread over several servers.
///
/// Every call names the server it targets, so one implementation serves the
/// whole server list.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` on `server`, returning the hash the server acknowledged
    async fn put(&self, server: &str, data: Bytes, auth: &AuthProof) -> Result<ContentHash>;

    /// Fetch the blob with `hash` from `server`
    async fn get(&self, server: &str, hash: &ContentHash) -> Result<Bytes>;

    /// Remove the blob with `hash` from `server`
    async fn delete(&self, server: &str, hash: &ContentHash, auth: &AuthProof) -> Result<()>;
}

/// Check that `data` hashes to `expected`.
pub fn verify_blob(expected: &ContentHash, data: &[u8]) -> Result<()> {
    let actual = ContentHash::of(data);
    if &actual != expected {
        return Err(BlobError::HashMismatch {
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(())
}
