//! ISO3 country code → display name lookup.
//!
//! The table is built once before the pipeline runs and handed to the parser
//! by reference. A built-in dataset ships with the crate; `source.countries_path`
//! can point at a replacement file with the same shape:
//!
//! ```json
//! [{"code": "usa", "name": "United States"}, ...]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Returned for codes the table does not know.
pub const UNKNOWN_COUNTRY: &str = "unknown";

const BUILTIN_COUNTRIES: &str = include_str!("../data/countries.json");

#[derive(Debug, Deserialize)]
struct CountryEntry {
    code: String,
    name: String,
}

/// Read-only mapping from lowercase ISO3 code to country name.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    names: HashMap<String, String>,
}

impl CountryTable {
    /// The dataset compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_COUNTRIES).context("built-in country table is invalid")
    }

    /// Loads a `{code, name}` array from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read country table: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse country table: {}", path.display()))
    }

    /// The override file when one is configured, otherwise the built-in table.
    pub fn from_config(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CountryEntry> = serde_json::from_str(json)?;
        Ok(entries
            .into_iter()
            .map(|e| (e.code, e.name))
            .collect())
    }

    /// Looks up a code case-insensitively, falling back to [`UNKNOWN_COUNTRY`].
    pub fn resolve(&self, code: &str) -> &str {
        self.get(code).unwrap_or(UNKNOWN_COUNTRY)
    }

    /// Looks up a code case-insensitively.
    pub fn get(&self, code: &str) -> Option<&str> {
        self.names
            .get(&code.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CountryTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }
}
