use nsite_crypto::{PublicKey, SiteIdentity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{RelayError, Result};

/// Retraction request for earlier records (`e` tags)
pub const KIND_DELETION: u16 = 5;
/// Published list of blob servers (`server` tags)
pub const KIND_SERVER_LIST: u16 = 10063;
/// Index record for one site file (`d` + `x` tags)
pub const KIND_SITE_FILE: u16 = 34128;

/// A signed, immutable record on the event network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Lowercase hex sha256 of the canonical serialization
    pub id: String,
    pub pubkey: PublicKey,
    /// Unix seconds
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// Hex Ed25519 signature over the id bytes
    pub sig: String,
}

impl Event {
    /// Canonical id: sha256 of `[0, pubkey, created_at, kind, tags, content]`
    pub fn compute_id(
        pubkey: &PublicKey,
        created_at: i64,
        kind: u16,
        tags: &[Vec<String>],
        content: &str,
    ) -> Result<String> {
        let canonical = serde_json::to_vec(&(0u8, pubkey.to_hex(), created_at, kind, tags, content))?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    /// Check the id matches the content and the signature matches the author.
    pub fn verify(&self) -> Result<()> {
        let expected = Self::compute_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )?;
        if expected != self.id {
            return Err(RelayError::InvalidEvent {
                id: self.id.clone(),
                reason: "id does not match content".to_string(),
            });
        }

        let id_bytes = hex::decode(&self.id).map_err(|e| RelayError::InvalidEvent {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        let signature = hex::decode(&self.sig).map_err(|e| RelayError::InvalidEvent {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;

        self.pubkey
            .verify(&id_bytes, &signature)
            .map_err(|_| RelayError::InvalidEvent {
                id: self.id.clone(),
                reason: "bad signature".to_string(),
            })
    }

    /// First value of the first tag named `name`
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(name))
            .and_then(|tag| tag.get(1))
            .map(String::as_str)
    }

    /// Values of every tag named `name`, in order
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| tag.first().map(String::as_str) == Some(name))
            .filter_map(|tag| tag.get(1))
            .map(String::as_str)
    }
}

/// An unsigned event, ready to be signed by a site identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplate {
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub created_at: i64,
}

impl EventTemplate {
    pub fn new(kind: u16) -> Self {
        Self {
            kind,
            tags: Vec::new(),
            content: String::new(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn tag(mut self, name: &str, value: impl Into<String>) -> Self {
        self.tags.push(vec![name.to_string(), value.into()]);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn sign(self, identity: &SiteIdentity) -> Result<Event> {
        let pubkey = identity.public_key();
        let id = Event::compute_id(
            &pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )?;
        let id_bytes = hex::decode(&id).map_err(|e| RelayError::InvalidEvent {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        let sig = hex::encode(identity.sign(&id_bytes));

        Ok(Event {
            id,
            pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        })
    }
}
