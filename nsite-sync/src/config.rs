use std::time::Duration;

/// What happens to the remaining upload attempts of a file once one server
/// has accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StragglerPolicy {
    /// Let every attempt finish and count its outcome
    #[default]
    Drain,
    /// Abort the remaining attempts
    Cancel,
}

/// Configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound for every blob request and every event publish
    pub attempt_timeout: Duration,
    pub straggler_policy: StragglerPolicy,
    /// Re-upload files whose content is already published
    pub force: bool,
    /// Remove files on the destination side that the source no longer has
    pub purge: bool,
    /// Value of the `client` tag on published records
    pub client_marker: String,
    /// Site file copied to `404.html` before an upload
    pub fallback: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            straggler_policy: StragglerPolicy::default(),
            force: false,
            purge: false,
            client_marker: "nsite-cli".to_string(),
            fallback: None,
        }
    }
}
