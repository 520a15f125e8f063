//! Terraform-style HTTP state backend on top of Git hosting platforms.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                   STATE PROXY                     │
//!   GET/POST           │  ┌─────────┐   ┌──────────────┐   ┌───────────┐   │
//!   /{platform}/...  ──┼─▶│  http   │──▶│    proxy     │──▶│  backend  │───┼──▶ Bitbucket /
//!                      │  │ request │   │ StateProxy   │   │  adapter  │   │    Gitea API
//!   state / marker / ◀─┼──│response │◀──│ (protocol)   │◀──│           │◀──┼───
//!   pass-through       │  └─────────┘   └──────┬───────┘   └───────────┘   │
//!                      │                       │                           │
//!                      │                ┌──────▼───────┐                   │
//!                      │                │   envelope   │                   │
//!                      │                │ AES-256-CBC  │                   │
//!                      │                └──────────────┘                   │
//!                      └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use git_state_proxy::config::{default_candidates, discover_config, load_config};
use git_state_proxy::observability::{logging, metrics};
use git_state_proxy::{HttpServer, Shutdown, StateCipher};

#[derive(Parser)]
#[command(name = "git-state-proxy")]
#[command(about = "HTTP remote-state backend storing state in Bitbucket or Gitea repositories")]
struct Cli {
    /// Configuration file; defaults to the first config.toml found in the
    /// working directory, the executable's directory, or /etc/tfstate
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config_path, mut config) = match cli.config {
        Some(path) => {
            let config = load_config(&path)?;
            (path, config)
        }
        None => discover_config(&default_candidates())?,
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("git-state-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_path.display(),
        bind_address = %config.listener.bind_address,
        bitbucket = config.bitbucket.is_some(),
        gitea = config.gitea.is_some(),
        "Configuration loaded"
    );

    let cipher = StateCipher::from_env(&config.encryption.key_env);
    tracing::info!(
        env = %config.encryption.key_env,
        enabled = cipher.is_some(),
        "State encryption"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, cipher)?;
    let signal = shutdown.clone();
    tokio::spawn(async move {
        git_state_proxy::lifecycle::signals::shutdown_on_ctrl_c(&signal).await;
    });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
