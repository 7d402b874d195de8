//! HTTP access to Blossom-style blob servers
//!
//! - `PUT {server}/upload` with the raw bytes, answered by a JSON descriptor
//! - `GET {server}/{sha256}` returns the bytes
//! - `DELETE {server}/{sha256}` removes them
//!
//! Mutating requests carry the caller's `AuthProof` as the `Authorization`
//! header.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use nsite_index::ContentHash;
use reqwest::{header, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::errors::{BlobError, Result};
use crate::store::{AuthProof, BlobStore};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Blob descriptor returned by a successful upload
#[derive(Debug, Clone, Deserialize)]
pub struct BlobDescriptor {
    pub sha256: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

pub struct BlossomClient {
    client: reqwest::Client,
}

impl BlossomClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn endpoint(server: &str, path: &str) -> Result<Url> {
        let invalid = |reason: String| BlobError::InvalidServer {
            server: server.to_string(),
            reason,
        };

        let base = Url::parse(&format!("{}/", server.trim_end_matches('/')))
            .map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", base.scheme())));
        }
        base.join(path).map_err(|e| invalid(e.to_string()))
    }

    async fn check(server: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(BlobError::Status {
            server: server.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

fn transport_error(server: &str, error: reqwest::Error) -> BlobError {
    if error.is_timeout() {
        BlobError::Timeout(server.to_string())
    } else {
        BlobError::Http(error)
    }
}

#[async_trait]
impl BlobStore for BlossomClient {
    async fn put(&self, server: &str, data: Bytes, auth: &AuthProof) -> Result<ContentHash> {
        let url = Self::endpoint(server, "upload")?;
        let hash = ContentHash::of(&data);
        debug!("PUT {} ({} bytes)", url, data.len());

        let response = self
            .client
            .put(url)
            .header(header::AUTHORIZATION, auth.as_header())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header("X-SHA-256", hash.to_hex())
            .body(data)
            .send()
            .await
            .map_err(|e| transport_error(server, e))?;

        let descriptor: BlobDescriptor = Self::check(server, response).await?.json().await?;
        ContentHash::from_hex(&descriptor.sha256).map_err(|_| BlobError::HashMismatch {
            expected: hash.to_hex(),
            actual: descriptor.sha256.clone(),
        })
    }

    async fn get(&self, server: &str, hash: &ContentHash) -> Result<Bytes> {
        let url = Self::endpoint(server, &hash.to_hex())?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(server, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(format!("{} on {}", hash, server)));
        }

        let body = Self::check(server, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(server, e))?;
        Ok(body)
    }

    async fn delete(&self, server: &str, hash: &ContentHash, auth: &AuthProof) -> Result<()> {
        let url = Self::endpoint(server, &hash.to_hex())?;
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .header(header::AUTHORIZATION, auth.as_header())
            .send()
            .await
            .map_err(|e| transport_error(server, e))?;

        Self::check(server, response).await?;
        Ok(())
    }
}
