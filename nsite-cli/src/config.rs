use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project directory holding the project file and, by default, the site key
pub const PROJECT_DIR: &str = ".nsite";
const PROJECT_FILE: &str = "project.toml";
/// Comma separated blob servers added ahead of the project's own
pub const SERVERS_ENV: &str = "NSITE_SERVERS";

/// Per-site settings kept in `.nsite/project.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Secret key file; relative paths are taken from the project directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_path: Option<PathBuf>,
    /// Directory of the event log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,
    pub servers: Vec<String>,
    pub publish_server_list: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl ProjectConfig {
    /// Location of the project file for a project rooted at `dir`
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(PROJECT_DIR).join(PROJECT_FILE)
    }

    /// Load the project file under `dir`, if there is one.
    pub fn load_from(dir: &Path) -> Result<Option<Self>> {
        let config_path = Self::path_in(dir);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project file: {}", config_path.display()))?;
        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse project file: {}", config_path.display()))?;
        Ok(Some(config))
    }

    /// Write the project file under `dir`, returning its path.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let config_path = Self::path_in(dir);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content =
            toml::to_string_pretty(self).context("Failed to serialize project to TOML")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project file: {}", config_path.display()))?;
        Ok(config_path)
    }

    /// Identity file, falling back to `~/.nsite/keys/identity.key`
    pub fn identity_path(&self, dir: &Path) -> Result<PathBuf> {
        match &self.identity_path {
            Some(path) => Ok(dir.join(path)),
            None => nsite_crypto::SiteIdentity::default_key_path()
                .context("No identity path configured"),
        }
    }

    /// Event log directory, falling back to `~/.nsite/events`
    pub fn event_log(&self, dir: &Path) -> Result<PathBuf> {
        match &self.event_log {
            Some(path) => Ok(dir.join(path)),
            None => default_event_log(),
        }
    }
}

/// Key file `init` creates for a new project
pub fn project_key_path() -> PathBuf {
    Path::new(PROJECT_DIR).join("identity.key")
}

/// Split a comma separated server list, dropping blank entries
pub fn parse_server_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|server| !server.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn default_event_log() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Home directory not found")?;
    Ok(home.join(PROJECT_DIR).join("events"))
}
