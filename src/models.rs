//! Core data models used throughout fundreg.
//!
//! A funding body moves through the pipeline in two shapes. The parser
//! produces [`RawConcept`]s whose `broader`/`narrower` relations are plain
//! identifier lists; the resolver turns them into [`Concept`]s whose relations
//! map each identifier to the referenced concept's display name. Keeping the
//! two shapes distinct means a relation map cannot be read before resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix prepended to a concept identifier to form its DOI.
pub const DOI_PREFIX: &str = "10.13039/";

/// Relation payload before resolution: referenced identifiers in source order.
pub type RawRelations = Vec<String>;

/// Relation payload after resolution: identifier → referenced concept's name.
pub type ResolvedRelations = BTreeMap<String, String>;

/// One funding body from the taxonomy, generic over its relation payload.
///
/// Field names on the wire follow the registry export, so the JSON snapshot
/// and the stored index data stay readable by existing consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRecord<R> {
    pub id: String,
    pub doi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub altnames: Vec<String>,
    pub narrower: R,
    pub broader: R,
    #[serde(
        rename = "fundingBodyType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub body_type: Option<String>,
    #[serde(
        rename = "fundingBodySubType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub body_sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A concept as produced by the parser.
pub type RawConcept = ConceptRecord<RawRelations>;

/// A concept whose relations have been resolved to names.
pub type Concept = ConceptRecord<ResolvedRelations>;

/// Identifier-keyed record set. Ordered so every pass over it is deterministic.
pub type RecordSet<R> = BTreeMap<String, ConceptRecord<R>>;

impl RawConcept {
    /// A fresh record with only the identifier-derived fields set.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            doi: format!("{}{}", DOI_PREFIX, id),
            id,
            name: None,
            altnames: Vec::new(),
            narrower: Vec::new(),
            broader: Vec::new(),
            body_type: None,
            body_sub_type: None,
            region: None,
            state: None,
            country_code: None,
            country: None,
            location: None,
        }
    }
}

impl<R> ConceptRecord<R> {
    /// Rebuilds the record around new relation payloads, keeping every other field.
    pub fn with_relations<T>(self, narrower: T, broader: T) -> ConceptRecord<T> {
        ConceptRecord {
            id: self.id,
            doi: self.doi,
            name: self.name,
            altnames: self.altnames,
            narrower,
            broader,
            body_type: self.body_type,
            body_sub_type: self.body_sub_type,
            region: self.region,
            state: self.state,
            country_code: self.country_code,
            country: self.country,
            location: self.location,
        }
    }

    /// Display name, or the identifier when the concept has no preferred label.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A search hit: the stored record plus its rank score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: f64,
    pub item: Concept,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_derives_doi() {
        let r = RawConcept::new("501100000001");
        assert_eq!(r.doi, "10.13039/501100000001");
        assert!(r.altnames.is_empty());
        assert!(r.narrower.is_empty() && r.broader.is_empty());
        assert!(r.name.is_none());
    }

    #[test]
    fn json_uses_registry_field_names() {
        let mut r = RawConcept::new("x");
        r.body_type = Some("gov".to_string());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["fundingBodyType"], "gov");
        assert!(v.get("name").is_none());
        assert!(v.get("country").is_none());
    }

    #[test]
    fn with_relations_keeps_fields() {
        let mut r = RawConcept::new("a");
        r.name = Some("Alpha".to_string());
        let mut n = ResolvedRelations::new();
        n.insert("b".to_string(), "Beta".to_string());
        let c: Concept = r.with_relations(n.clone(), ResolvedRelations::new());
        assert_eq!(c.name.as_deref(), Some("Alpha"));
        assert_eq!(c.narrower, n);
        assert_eq!(c.display_name(), "Alpha");
    }
}
