//! Term generation: turns a resolved concept into an index document.
//!
//! Stemming happens inside SQLite: the FTS5 table is created with the Porter
//! tokenizer, so indexed text and queries are reduced to the same roots. What
//! this module decides is *which* text is indexed, which words feed the
//! spelling dictionary, and how the full record is stored for retrieval.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::models::Concept;

/// Stemming algorithm applied by the full-text index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stemmer {
    /// English Porter stemmer.
    #[default]
    English,
}

impl Stemmer {
    pub fn name(&self) -> &'static str {
        match self {
            Stemmer::English => "english",
        }
    }

    pub fn fts5_tokenizer(&self) -> &'static str {
        match self {
            Stemmer::English => "porter unicode61 remove_diacritics 2",
        }
    }
}

/// One row set written to the index per concept.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    pub id: String,
    pub doi: String,
    pub name: Option<String>,
    /// Free text: names, alternate names and descriptive fields.
    pub text: String,
    /// Country, country code and region, queried separately.
    pub location: String,
    /// The complete resolved record.
    pub data_json: String,
    pub content_hash: String,
    /// Unstemmed words for the spelling dictionary; empty when spelling is off.
    pub spelling: Vec<String>,
}

/// Builds [`IndexDocument`]s with a fixed stemmer and spelling setting.
#[derive(Debug, Clone)]
pub struct TermGenerator {
    stemmer: Stemmer,
    spelling: bool,
}

impl Default for TermGenerator {
    fn default() -> Self {
        Self::new(Stemmer::English)
    }
}

impl TermGenerator {
    /// Spelling collection is on by default.
    pub fn new(stemmer: Stemmer) -> Self {
        Self {
            stemmer,
            spelling: true,
        }
    }

    pub fn with_spelling(mut self, enabled: bool) -> Self {
        self.spelling = enabled;
        self
    }

    pub fn stemmer(&self) -> Stemmer {
        self.stemmer
    }

    pub fn spelling(&self) -> bool {
        self.spelling
    }

    pub fn document(&self, concept: &Concept) -> Result<IndexDocument> {
        let text = indexable_text(concept);
        let location = location_text(concept);
        let data_json = serde_json::to_string(concept)?;
        let content_hash = format!("{:x}", Sha256::digest(data_json.as_bytes()));
        let spelling = if self.spelling {
            words(&text).collect()
        } else {
            Vec::new()
        };

        Ok(IndexDocument {
            id: concept.id.clone(),
            doi: concept.doi.clone(),
            name: concept.name.clone(),
            text,
            location,
            data_json,
            content_hash,
            spelling,
        })
    }
}

fn indexable_text(concept: &Concept) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(concept.name.as_deref());
    parts.extend(concept.altnames.iter().map(String::as_str));
    parts.extend(concept.body_type.as_deref());
    parts.extend(concept.body_sub_type.as_deref());
    parts.extend(concept.region.as_deref());
    parts.extend(concept.country.as_deref());
    join_nonempty(&parts)
}

fn location_text(concept: &Concept) -> String {
    let parts = [
        concept.country.as_deref(),
        concept.country_code.as_deref(),
        concept.region.as_deref(),
    ];
    join_nonempty(&parts.into_iter().flatten().collect::<Vec<_>>())
}

fn join_nonempty(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercased words containing at least one letter, in text order.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().any(char::is_alphabetic))
        .map(str::to_lowercase)
}
