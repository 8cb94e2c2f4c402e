//! # kegeye CLI
//!
//! ## Usage
//!
//! ```bash
//! kegeye [--config ./config/kegeye.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kegeye serve` | Start the HTTP server |
//! | `kegeye keg <owner/repo>` | Print a keg's descriptor as JSON |
//! | `kegeye dex <owner/repo>` | Print a keg's dex as JSON |
//! | `kegeye node <owner/repo> <id>` | Print one entry's Markdown |
//!
//! `KEGEYE_ENV`, `GITHUB_TOKEN` and `KEGEYE_BIND` override the config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kegeye::config::{self, Config};
use kegeye::models::NodeId;
use kegeye::{inspect, logging, server};

/// kegeye: serve knowledge-management kegs from GitHub repositories.
#[derive(Parser)]
#[command(
    name = "kegeye",
    about = "kegeye: serve knowledge-management kegs from GitHub repositories",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional; every setting has a default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// The `/keg/github` routes are only served when a GitHub token is
    /// configured (`GITHUB_TOKEN` or `[github].token`).
    Serve,

    /// Print a keg's descriptor.
    Keg {
        /// Repository as `owner/repo`.
        repo: String,
        /// Branch to read instead of the default one.
        #[arg(long)]
        branch: Option<String>,
    },

    /// Print a keg's dex.
    Dex {
        /// Repository as `owner/repo`.
        repo: String,
        /// Branch to read instead of the default one.
        #[arg(long)]
        branch: Option<String>,
    },

    /// Print one entry's Markdown.
    Node {
        /// Repository as `owner/repo`.
        repo: String,
        /// Entry id.
        #[arg(allow_negative_numbers = true)]
        id: NodeId,
        /// Branch to read instead of the default one.
        #[arg(long)]
        branch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    let cfg = cfg.apply_env()?;

    logging::init(cfg.environment);

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Keg { repo, branch } => {
            let repo = inspect::repo_ref(&repo, branch)?;
            inspect::run_keg(&cfg, &repo).await?;
        }
        Commands::Dex { repo, branch } => {
            let repo = inspect::repo_ref(&repo, branch)?;
            inspect::run_dex(&cfg, &repo).await?;
        }
        Commands::Node { repo, id, branch } => {
            let repo = inspect::repo_ref(&repo, branch)?;
            inspect::run_node(&cfg, &repo, id).await?;
        }
    }

    Ok(())
}
