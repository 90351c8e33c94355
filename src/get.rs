//! Concept retrieval by identifier.
//!
//! Used by the `fundreg get` CLI command to show the full stored record,
//! including resolved broader/narrower names.

use anyhow::{bail, Result};
use std::path::Path;

use crate::db;
use crate::models::Concept;
use crate::search::fetch_concept;

/// Core get function returning the stored record.
pub async fn get_concept(index_path: &Path, id: &str) -> Result<Concept> {
    let pool = db::open_read_only(index_path).await?;
    let found = fetch_concept(&pool, id).await;
    pool.close().await;

    match found? {
        Some(concept) => Ok(concept),
        None => bail!("concept not found: {}", id),
    }
}

/// CLI entry point: calls get_concept and prints to stdout.
pub async fn run_get(index_path: &Path, id: &str, json: bool) -> Result<()> {
    let concept = get_concept(index_path, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&concept)?);
        return Ok(());
    }

    println!("--- Funder ---");
    println!("id:        {}", concept.id);
    println!("doi:       {}", concept.doi);
    println!("name:      {}", concept.name.as_deref().unwrap_or("(unnamed)"));
    for alt in &concept.altnames {
        println!("alt name:  {}", alt);
    }
    print_opt("type:", &concept.body_type);
    print_opt("subtype:", &concept.body_sub_type);
    print_opt("region:", &concept.region);
    print_opt("country:", &concept.country);
    print_opt("code:", &concept.country_code);
    print_opt("state:", &concept.state);
    print_opt("location:", &concept.location);

    if !concept.broader.is_empty() {
        println!();
        println!("--- Broader ({}) ---", concept.broader.len());
        for (id, name) in &concept.broader {
            println!("{}  {}", id, name);
        }
    }
    if !concept.narrower.is_empty() {
        println!();
        println!("--- Narrower ({}) ---", concept.narrower.len());
        for (id, name) in &concept.narrower {
            println!("{}  {}", id, name);
        }
    }

    Ok(())
}

fn print_opt(label: &str, value: &Option<String>) {
    if let Some(v) = value {
        println!("{:<10} {}", label, v);
    }
}
