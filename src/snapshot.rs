//! Intermediate normalized snapshot of the parsed taxonomy.
//!
//! Parsing the full registry takes a while, so the unresolved record set is
//! written as JSON (`{"items": {<id>: record}}`) and later builds can start
//! from it instead of the RDF.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::{RawRelations, RecordSet};

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    items: RecordSet<RawRelations>,
}

pub fn write_snapshot(path: &Path, records: &RecordSet<RawRelations>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&SnapshotRef { items: records })?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))
}

pub fn read_snapshot(path: &Path) -> Result<RecordSet<RawRelations>> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read snapshot: {} (run with --rebuild-snapshot to create it)",
            path.display()
        )
    })?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
    Ok(snapshot.items)
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    items: &'a RecordSet<RawRelations>,
}
