//! Reindex orchestration for the CLI.
//!
//! Coordinates the full rebuild: drop the index, recreate it with the trial
//! mapping, and bulk-load the configured data file. Per-document failures are
//! reported, never fatal.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::gateway::SearchGateway;

pub async fn run_reindex(config: &Config, file: Option<PathBuf>, keep: bool) -> Result<()> {
    let gateway = SearchGateway::from_config(config)?;
    let path = file.unwrap_or_else(|| config.data.path.clone());

    if !keep {
        gateway
            .delete_index()
            .await
            .context("Failed to delete existing index")?;
    }

    let summary = gateway
        .build_index(&path)
        .await
        .with_context(|| format!("Failed to index {}", path.display()))?;

    println!("reindex {}", gateway.index_name());
    println!("  source: {}", path.display());
    println!("  indexed: {}", summary.succeeded);
    println!("  failed: {}", summary.failed);
    println!("ok");

    Ok(())
}

pub async fn run_delete_index(config: &Config) -> Result<()> {
    let gateway = SearchGateway::from_config(config)?;
    if gateway.delete_index().await? {
        println!("Deleted index {}.", gateway.index_name());
    } else {
        println!("Index {} does not exist.", gateway.index_name());
    }
    Ok(())
}
