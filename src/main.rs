//! # Trial Search CLI (`trials`)
//!
//! Runs the HTTP API and the index maintenance commands against the
//! configured search engine.
//!
//! ## Usage
//!
//! ```bash
//! trials --config ./config/trials.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `trials serve` | Start the HTTP API server |
//! | `trials reindex` | Drop, recreate, and bulk-load the trial index |
//! | `trials search "<query>"` | Search indexed trials |
//! | `trials stats` | Show document count and index size |
//! | `trials delete-index` | Remove the trial index |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trial_search::gateway::DEFAULT_PAGE_SIZE;
use trial_search::{config, ingest, search, server, stats};

/// Trial Search — full-text search over clinical-trial records.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with at least an `[engine] url`.
#[derive(Parser)]
#[command(name = "trials", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/trials.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    ///
    /// Binds to `[server].bind` and serves /search, /index-info, /reindex,
    /// /version, and /health.
    Serve,

    /// Rebuild the trial index from a JSON file.
    ///
    /// Deletes the index, recreates it with the trial mapping, and
    /// bulk-loads every record. Failed documents are counted, not fatal.
    Reindex {
        /// Trial file to load instead of `[data].path`.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Keep the existing index and load into it.
        #[arg(long)]
        keep: bool,
    },

    /// Search indexed trials.
    Search {
        /// The search query string.
        query: String,

        /// Field to search; repeat for several. Defaults to briefTitle,
        /// officialTitle, and conditions.
        #[arg(long = "field")]
        fields: Vec<String>,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Results per page (1 to 100).
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        size: usize,
    },

    /// Show document count and size of the index.
    Stats,

    /// Delete the trial index. Succeeds if it does not exist.
    DeleteIndex,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trial_search=info,trials=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Reindex { file, keep } => {
            ingest::run_reindex(&cfg, file, keep).await?;
        }
        Commands::Search {
            query,
            fields,
            page,
            size,
        } => {
            search::run_search(&cfg, &query, fields, page, size).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::DeleteIndex => {
            ingest::run_delete_index(&cfg).await?;
        }
    }

    Ok(())
}
