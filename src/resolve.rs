//! Broader/narrower resolution.
//!
//! Turns each record's raw identifier lists into identifier → name maps, looked
//! up against the complete parsed record set. A reference to an identifier that
//! was never declared is an [`IntegrityError`]; nothing is skipped.

use crate::error::IntegrityError;
use crate::models::{Concept, RawConcept, RawRelations, RecordSet, ResolvedRelations};

/// Resolves every record's relations. Records keep their identifiers and order.
pub fn resolve(
    records: RecordSet<RawRelations>,
) -> Result<RecordSet<ResolvedRelations>, IntegrityError> {
    let mut resolved = RecordSet::new();
    for (id, record) in &records {
        resolved.insert(id.clone(), resolve_one(record, &records)?);
    }
    Ok(resolved)
}

/// Resolves a single record against the full raw set.
pub fn resolve_one(
    record: &RawConcept,
    records: &RecordSet<RawRelations>,
) -> Result<Concept, IntegrityError> {
    let narrower = link(record, "narrower", &record.narrower, records)?;
    let broader = link(record, "broader", &record.broader, records)?;
    Ok(record.clone().with_relations(narrower, broader))
}

fn link(
    record: &RawConcept,
    relation: &'static str,
    targets: &[String],
    records: &RecordSet<RawRelations>,
) -> Result<ResolvedRelations, IntegrityError> {
    targets
        .iter()
        .map(|target| match records.get(target) {
            Some(found) => Ok((target.clone(), found.name.clone().unwrap_or_default())),
            None => Err(IntegrityError::DanglingRelation {
                concept: record.id.clone(),
                relation,
                target: target.clone(),
            }),
        })
        .collect()
}
