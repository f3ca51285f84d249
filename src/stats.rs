//! Index statistics overview.
//!
//! Used by `trials stats` to confirm that a reindex landed: document count and
//! store size for the configured index.

use anyhow::Result;

use crate::config::Config;
use crate::gateway::SearchGateway;

/// Run the stats command: query the engine and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let gateway = SearchGateway::from_config(config)?;
    let stats = gateway.get_stats().await?;

    println!("Trial Search — Index Stats");
    println!("==========================");
    println!();
    println!("  Engine:      {}", config.engine.url);
    println!("  Index:       {}", gateway.index_name());
    println!();
    println!("  Documents:   {}", stats.doc_count);
    println!("  Size:        {}", format_bytes(stats.size_in_bytes));
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
