//! Blob server list resolution
//!
//! Candidate server URLs come from several sources, highest priority first:
//! explicit overrides, configured servers, the list published under the
//! site identity and the built-in defaults. They are merged into one ordered
//! list in which no two entries name the same scheme, host and port.

use url::Url;

use crate::errors::{Result, SyncError};

/// Servers used when nothing else is configured or published
pub const DEFAULT_SERVERS: &[&str] = &["https://blossom.primal.net", "https://cdn.satellite.earth"];

/// An ordered, non-empty list of distinct blob server base URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerList {
    servers: Vec<String>,
}

impl ServerList {
    /// Merge candidate lists given in priority order.
    ///
    /// Each candidate loses one trailing slash; a candidate equal to an
    /// earlier entry (case-insensitive scheme, host and port) is dropped.
    pub fn merge<I, L, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut servers: Vec<String> = Vec::new();
        let mut keys: Vec<String> = Vec::new();

        for candidate in sources.into_iter().flatten() {
            let candidate = candidate.as_ref().trim();
            if candidate.is_empty() {
                continue;
            }
            let candidate = candidate.strip_suffix('/').unwrap_or(candidate);
            let key = server_key(candidate);
            if !keys.contains(&key) {
                keys.push(key);
                servers.push(candidate.to_string());
            }
        }

        if servers.is_empty() {
            return Err(SyncError::NoServers);
        }
        Ok(Self { servers })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.servers
    }

    pub fn contains(&self, server: &str) -> bool {
        let key = server_key(server.trim().trim_end_matches('/'));
        self.servers.iter().any(|s| server_key(s) == key)
    }

    /// Whether this list names a server missing from `published`
    pub fn extends(&self, published: &[String]) -> bool {
        let published: Vec<String> = published
            .iter()
            .map(|s| server_key(s.trim().trim_end_matches('/')))
            .collect();
        self.servers
            .iter()
            .any(|s| !published.contains(&server_key(s)))
    }
}

/// Comparison key: lowercase scheme, host and effective port.
///
/// Strings that are not absolute URLs compare by their lowercase text.
fn server_key(server: &str) -> String {
    match Url::parse(server) {
        Ok(url) if url.host_str().is_some() => format!(
            "{}://{}:{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            url.port_or_known_default().unwrap_or_default()
        ),
        _ => server.to_lowercase(),
    }
}
