use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use nsite_blossom::{BlobStore, BlossomClient};
use nsite_crypto::{PublicKey, SiteIdentity};
use nsite_relay::{EventNetwork, LocalEventLog};
use nsite_sync::{
    listing_line, ServerSources, StragglerPolicy, SyncConfig, SyncContext, SyncEngine, SyncReport,
};
use tracing::info;

use crate::config::{parse_server_list, project_key_path, ProjectConfig, PROJECT_DIR};

/// Settings shared by every command: the project in the working directory
/// plus global flags.
pub struct Environment {
    pub project_dir: PathBuf,
    pub project: ProjectConfig,
    env_servers: Vec<String>,
    key: Option<PathBuf>,
    event_log: Option<PathBuf>,
    timeout: Duration,
}

impl Environment {
    pub fn load(
        project_dir: PathBuf,
        key: Option<PathBuf>,
        event_log: Option<PathBuf>,
        timeout: Duration,
    ) -> Result<Self> {
        let project = ProjectConfig::load_from(&project_dir)?.unwrap_or_default();
        Ok(Self {
            project_dir,
            project,
            env_servers: Vec::new(),
            key,
            event_log,
            timeout,
        })
    }

    /// Add servers from the environment; they rank above the project's
    /// servers and below `--servers`.
    pub fn with_env_servers(mut self, value: Option<&str>) -> Self {
        self.env_servers = value.map(parse_server_list).unwrap_or_default();
        self
    }

    /// Environment servers followed by the project's servers
    fn configured_servers(&self) -> Vec<String> {
        self.env_servers
            .iter()
            .chain(&self.project.servers)
            .cloned()
            .collect()
    }

    fn identity_path(&self) -> Result<PathBuf> {
        match &self.key {
            Some(key) => Ok(self.project_dir.join(key)),
            None => self.project.identity_path(&self.project_dir),
        }
    }

    async fn identity(&self) -> Result<SiteIdentity> {
        let path = self.identity_path()?;
        SiteIdentity::load(&path).await.with_context(|| {
            format!(
                "Failed to load identity from {}; run `nsite init` first",
                path.display()
            )
        })
    }

    async fn author(&self, pubkey: Option<PublicKey>) -> Result<PublicKey> {
        match pubkey {
            Some(pubkey) => Ok(pubkey),
            None => Ok(self.identity().await?.public_key()),
        }
    }

    async fn network(&self) -> Result<Arc<dyn EventNetwork>> {
        let dir = match &self.event_log {
            Some(dir) => self.project_dir.join(dir),
            None => self.project.event_log(&self.project_dir)?,
        };
        let log = LocalEventLog::open(&dir)
            .await
            .with_context(|| format!("Failed to open event log: {}", dir.display()))?;
        Ok(Arc::new(log))
    }

    fn blobs(&self) -> Result<Arc<dyn BlobStore>> {
        let client =
            BlossomClient::with_timeout(self.timeout).context("Failed to create HTTP client")?;
        Ok(Arc::new(client))
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            attempt_timeout: self.timeout,
            ..Default::default()
        }
    }
}

pub struct UploadOptions {
    pub force: bool,
    pub purge: bool,
    pub servers: Vec<String>,
    pub fallback: Option<String>,
    pub publish_server_list: bool,
    pub cancel_stragglers: bool,
}

/// Set up a project: reuse or create the identity key, then write the
/// project file.
pub async fn init(
    env: &Environment,
    servers: Vec<String>,
    publish_server_list: bool,
    force: bool,
) -> Result<PublicKey> {
    let config_path = ProjectConfig::path_in(&env.project_dir);
    if config_path.exists() && !force {
        bail!(
            "Project already set up at {}; use --force to overwrite",
            config_path.display()
        );
    }

    let key_path = env.key.clone().unwrap_or_else(project_key_path);
    let absolute_key = env.project_dir.join(&key_path);
    let identity = if absolute_key.exists() {
        info!("Reusing identity at {}", absolute_key.display());
        SiteIdentity::load(&absolute_key).await?
    } else {
        let identity = SiteIdentity::generate();
        identity
            .save(&absolute_key)
            .await
            .with_context(|| format!("Failed to save identity to {}", absolute_key.display()))?;
        identity
    };

    let project = ProjectConfig {
        identity_path: Some(key_path),
        event_log: env.event_log.clone(),
        servers,
        publish_server_list,
        fallback: None,
    };
    let written = project.save_to(&env.project_dir)?;

    let public_key = identity.public_key();
    println!("Site public key: {}", public_key);
    println!("Project saved to {}", written.display());
    Ok(public_key)
}

pub async fn upload(env: &Environment, folder: &Path, options: UploadOptions) -> Result<SyncReport> {
    if folder.join(PROJECT_DIR).exists() {
        bail!(
            "{} contains the {} project directory with the site key; upload a subdirectory instead",
            folder.display(),
            PROJECT_DIR
        );
    }

    let identity = Arc::new(env.identity().await?);
    println!("Upload for {}", identity.public_key());

    let config = SyncConfig {
        force: options.force,
        purge: options.purge,
        fallback: options.fallback.or_else(|| env.project.fallback.clone()),
        straggler_policy: if options.cancel_stragglers {
            StragglerPolicy::Cancel
        } else {
            StragglerPolicy::Drain
        },
        ..env.sync_config()
    };
    let context = SyncContext::for_identity(identity, env.network().await?, env.blobs()?)
        .with_config(config);
    let engine = SyncEngine::new(context);

    let sources = ServerSources {
        overrides: options.servers,
        configured: env.configured_servers(),
        publish_on_change: options.publish_server_list || env.project.publish_server_list,
        ..Default::default()
    };
    let servers = engine.resolve_servers(&sources).await?;

    let report = engine
        .upload(folder, &servers)
        .await
        .with_context(|| format!("Upload of {} failed", folder.display()))?;
    print_report(&report);
    Ok(report)
}

pub async fn download(
    env: &Environment,
    folder: &Path,
    pubkey: Option<PublicKey>,
    servers: Vec<String>,
    purge: bool,
) -> Result<SyncReport> {
    let author = env.author(pubkey).await?;
    println!("Download of {}", author);

    let config = SyncConfig {
        purge,
        ..env.sync_config()
    };
    let context = SyncContext::new(author, env.network().await?, env.blobs()?).with_config(config);
    let engine = SyncEngine::new(context);

    let sources = ServerSources {
        overrides: servers,
        configured: env.configured_servers(),
        ..Default::default()
    };
    let servers = engine.resolve_servers(&sources).await?;

    let report = engine
        .download(folder, &servers)
        .await
        .with_context(|| format!("Download into {} failed", folder.display()))?;
    print_report(&report);
    Ok(report)
}

pub async fn list(env: &Environment, pubkey: Option<PublicKey>) -> Result<()> {
    let author = env.author(pubkey).await?;
    let context = SyncContext::new(author, env.network().await?, env.blobs()?)
        .with_config(env.sync_config());

    let manifest = SyncEngine::new(context).list().await?;
    info!("{} files published by {}", manifest.len(), author);
    for record in &manifest {
        println!("{}", listing_line(record));
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("{}", report.summary());
    for failure in &report.failures {
        println!("  {}", failure);
    }
}

/// Failure exit status when any file could not be transferred or written
pub fn exit_code(report: &SyncReport) -> ExitCode {
    if report.has_blocking_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
