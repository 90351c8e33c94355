//! Build pipeline orchestration.
//!
//! Runs the stages strictly in sequence: destination check → optional fetch →
//! parse (or load the snapshot) → resolve → index. Each stage needs the
//! complete output of the one before it.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::country::CountryTable;
use crate::fetch;
use crate::index::{self, BuildReport, IndexSettings};
use crate::models::{RawRelations, RecordSet};
use crate::parser;
use crate::progress::{BuildProgressEvent, BuildProgressReporter};
use crate::resolve;
use crate::snapshot;

/// Command-line switches for a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Download a fresh taxonomy first (implies `rebuild_snapshot`).
    pub fetch: bool,
    /// Re-parse the RDF instead of loading the JSON snapshot.
    pub rebuild_snapshot: bool,
    /// Overrides `index.path`.
    pub index_path: Option<PathBuf>,
}

pub async fn run_build(
    config: &Config,
    opts: &BuildOptions,
    progress: &dyn BuildProgressReporter,
) -> Result<BuildReport> {
    let index_path = opts
        .index_path
        .clone()
        .unwrap_or_else(|| config.index.path.clone());

    // Fail before doing any work
    index::check_destination(&index_path)?;

    if opts.fetch {
        run_fetch(config).await?;
    }

    let (records, source) = if opts.fetch || opts.rebuild_snapshot {
        progress.report(BuildProgressEvent::Parsing {
            source: config.source.rdf_path.display().to_string(),
        });
        let records = parse_taxonomy(config)?;
        snapshot::write_snapshot(&config.source.snapshot_path, &records)?;
        (records, config.source.rdf_path.clone())
    } else {
        progress.report(BuildProgressEvent::Parsing {
            source: config.source.snapshot_path.display().to_string(),
        });
        let records = snapshot::read_snapshot(&config.source.snapshot_path)?;
        (records, config.source.snapshot_path.clone())
    };
    let concept_count = records.len();

    progress.report(BuildProgressEvent::Resolving {
        records: concept_count as u64,
    });
    let resolved = resolve::resolve(records)?;

    let settings = IndexSettings {
        checkpoint_every: config.index.checkpoint_every,
        ..Default::default()
    };
    let report = index::build_index(&index_path, &resolved, &settings, progress).await?;

    println!("build {}", index_path.display());
    println!("  source: {}", source.display());
    println!("  concepts: {}", concept_count);
    println!("  documents indexed: {}", report.documents);
    println!("  commits: {}", report.commits);
    println!("ok");

    Ok(report)
}

/// Parses the configured RDF file, warning once about unmapped country codes.
pub fn parse_taxonomy(config: &Config) -> Result<RecordSet<RawRelations>> {
    let countries = CountryTable::from_config(config.source.countries_path.as_deref())?;
    let parsed = parser::parse_file(&config.source.rdf_path, &countries)?;
    if !parsed.unknown_countries.is_empty() {
        let codes: Vec<&str> = parsed.unknown_countries.iter().map(String::as_str).collect();
        eprintln!(
            "Warning: {} unmapped country code(s): {}",
            codes.len(),
            codes.join(", ")
        );
    }
    Ok(parsed.records)
}

/// CLI entry point for `fundreg parse`: prints the unresolved record set.
pub fn run_parse(config: &Config) -> Result<()> {
    let records = parse_taxonomy(config)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "items": records }))?
    );
    Ok(())
}

pub async fn run_fetch(config: &Config) -> Result<()> {
    let dest: &Path = &config.source.rdf_path;
    let bytes = fetch::fetch_taxonomy(
        &config.source.url,
        dest,
        Duration::from_secs(config.source.fetch_timeout_secs),
    )
    .await?;
    println!("fetched {} bytes into {}", bytes, dest.display());
    Ok(())
}
