//! `trials search`: run a query from the command line.

use anyhow::Result;

use crate::config::Config;
use crate::gateway::{SearchGateway, SearchRequest};
use crate::models::SearchResult;

pub async fn run_search(
    config: &Config,
    query: &str,
    fields: Vec<String>,
    page: usize,
    size: usize,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let mut request = SearchRequest::new(query).with_page(page, size);
    if !fields.is_empty() {
        request = request.with_fields(fields);
    }
    request.validate()?;

    let gateway = SearchGateway::from_config(config)?;
    let hits = gateway.query(&request).await?;
    let results: Vec<SearchResult> = hits.iter().map(SearchResult::from_hit).collect();

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [{}] {}",
            request.offset() + i + 1,
            r.nct_id,
            r.brief_title
        );
        println!("    status: {}", r.overall_status);
        if !r.conditions.is_empty() {
            println!("    conditions: {}", r.conditions.join(", "));
        }
    }

    Ok(())
}
