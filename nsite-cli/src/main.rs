use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nsite_crypto::PublicKey;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "nsite")]
#[command(about = "Publish a static site to redundant blob servers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Secret key file to sign with
    #[arg(short, long, global = true, env = "NSITE_KEY")]
    key: Option<PathBuf>,

    /// Directory of the event log
    #[arg(long, global = true, env = "NSITE_EVENT_LOG")]
    event_log: Option<PathBuf>,

    /// Seconds allowed for each blob request and publish
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an identity and a project file in the current directory
    Init {
        /// Blob servers to store in the project (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        servers: Vec<String>,

        /// Publish the blob server list on upload
        #[arg(long)]
        publish_server_list: bool,

        /// Overwrite an existing project file
        #[arg(short, long)]
        force: bool,
    },

    /// Publish the files of a folder
    Upload {
        /// Folder to publish
        folder: PathBuf,

        /// Upload files even if they are already published
        #[arg(short, long)]
        force: bool,

        /// Delete published files that are gone locally
        #[arg(short, long)]
        purge: bool,

        /// Blob servers to try ahead of configured ones (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        servers: Vec<String>,

        /// File to copy and publish as 404.html
        #[arg(long)]
        fallback: Option<String>,

        /// Publish the blob server list
        #[arg(long)]
        publish_server_list: bool,

        /// Abort the remaining uploads of a file after the first success
        #[arg(long)]
        cancel_stragglers: bool,
    },

    /// Mirror a published site into a folder
    Download {
        /// Destination folder
        folder: PathBuf,

        /// Public key of the site, defaults to the project identity
        pubkey: Option<PublicKey>,

        /// Blob servers to try ahead of configured ones (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        servers: Vec<String>,

        /// Delete local files that are not published
        #[arg(short, long)]
        purge: bool,
    },

    /// List the published files of a site
    Ls {
        /// Public key of the site, defaults to the project identity
        pubkey: Option<PublicKey>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let env = commands::Environment::load(
        std::env::current_dir()?,
        cli.key,
        cli.event_log,
        Duration::from_secs(cli.timeout),
    )?
    .with_env_servers(std::env::var(config::SERVERS_ENV).ok().as_deref());

    match cli.command {
        Commands::Init {
            servers,
            publish_server_list,
            force,
        } => {
            commands::init(&env, servers, publish_server_list, force).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Upload {
            folder,
            force,
            purge,
            servers,
            fallback,
            publish_server_list,
            cancel_stragglers,
        } => {
            let options = commands::UploadOptions {
                force,
                purge,
                servers,
                fallback,
                publish_server_list,
                cancel_stragglers,
            };
            let report = commands::upload(&env, &folder, options).await?;
            Ok(commands::exit_code(&report))
        }
        Commands::Download {
            folder,
            pubkey,
            servers,
            purge,
        } => {
            let report = commands::download(&env, &folder, pubkey, servers, purge).await?;
            Ok(commands::exit_code(&report))
        }
        Commands::Ls { pubkey } => {
            commands::list(&env, pubkey).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
