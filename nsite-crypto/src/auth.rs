//! Per-request authorization proofs for blob servers
//!
//! A blob server accepts an upload or delete only when the request carries a
//! short-lived proof signed by the site identity, naming the verb and the
//! content hash it applies to.

use serde::{Deserialize, Serialize};

use crate::errors::{CryptoError, Result};
use crate::identity::{PublicKey, SiteIdentity};

/// Header scheme used in the `Authorization` header
pub const AUTH_SCHEME: &str = "Nsite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthVerb {
    Upload,
    Delete,
}

impl std::fmt::Display for AuthVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthVerb::Upload => write!(f, "upload"),
            AuthVerb::Delete => write!(f, "delete"),
        }
    }
}

/// Signed statement "`pubkey` may `verb` blob `hash` until `expiration`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobAuthorization {
    pub verb: AuthVerb,
    pub hash: String,
    /// Unix seconds
    pub expiration: i64,
    pub pubkey: PublicKey,
    pub signature: String,
}

impl BlobAuthorization {
    fn signing_payload(verb: AuthVerb, hash: &str, expiration: i64, pubkey: &PublicKey) -> String {
        format!("{}:{}:{}:{}", verb, hash, expiration, pubkey)
    }

    /// Check signature and expiry against `now` (unix seconds)
    pub fn verify(&self, now: i64) -> Result<()> {
        if self.expiration < now {
            return Err(CryptoError::SignatureVerification);
        }
        let signature =
            hex::decode(&self.signature).map_err(|_| CryptoError::SignatureVerification)?;
        let payload = Self::signing_payload(self.verb, &self.hash, self.expiration, &self.pubkey);
        self.pubkey.verify(payload.as_bytes(), &signature)
    }

    /// Value for an HTTP `Authorization` header
    pub fn to_header(&self) -> Result<String> {
        let json =
            serde_json::to_vec(self).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(format!("{} {}", AUTH_SCHEME, hex::encode(json)))
    }

    /// Parse a header produced by `to_header`
    pub fn from_header(header: &str) -> Result<Self> {
        let encoded = header
            .strip_prefix(AUTH_SCHEME)
            .map(str::trim_start)
            .ok_or_else(|| CryptoError::Serialization("unknown auth scheme".to_string()))?;
        let json = hex::decode(encoded).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| CryptoError::Serialization(e.to_string()))
    }
}

impl SiteIdentity {
    /// Authorize `verb` on blob `hash` for `ttl_secs` seconds.
    pub fn authorize(&self, verb: AuthVerb, hash: &str, ttl_secs: i64) -> BlobAuthorization {
        let expiration = chrono::Utc::now().timestamp() + ttl_secs;
        let pubkey = self.public_key();
        let payload = BlobAuthorization::signing_payload(verb, hash, expiration, &pubkey);

        BlobAuthorization {
            verb,
            hash: hash.to_string(),
            expiration,
            pubkey,
            signature: hex::encode(self.sign(payload.as_bytes())),
        }
    }
}
