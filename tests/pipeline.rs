//! Library-level tests for the parse → resolve → index pipeline.

use std::sync::Mutex;
use std::time::Duration;

use fundreg::country::{CountryTable, UNKNOWN_COUNTRY};
use fundreg::error::{DestinationExists, IntegrityError};
use fundreg::get::get_concept;
use fundreg::index::{build_index, IndexBuilder, IndexSettings, SqliteIndex};
use fundreg::models::{Concept, RawConcept, RawRelations, RecordSet, ResolvedRelations};
use fundreg::parser::parse_reader;
use fundreg::progress::{BuildProgressEvent, BuildProgressReporter, NoProgress};
use fundreg::resolve::resolve;
use fundreg::search::{document_count, search};
use tempfile::TempDir;

const REGISTRY: &str = include_str!("fixtures/registry.rdf");

/// Collects every progress event.
#[derive(Default)]
struct CapturedProgress {
    events: Mutex<Vec<BuildProgressEvent>>,
}

impl BuildProgressReporter for CapturedProgress {
    fn report(&self, event: BuildProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn two_concept_rdf(top: &[&str]) -> String {
    let tops: String = top
        .iter()
        .map(|id| format!(r#"<skos:hasTopConcept rdf:resource="http://dx.doi.org/10.13039/{}"/>"#, id))
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:skos="http://www.w3.org/2004/02/skos/core#"
         xmlns:skosxl="http://www.w3.org/2008/05/skos-xl#">
  <skos:ConceptScheme rdf:about="http://example.org/scheme">{}</skos:ConceptScheme>
  <skos:Concept rdf:about="http://dx.doi.org/10.13039/A">
    <skosxl:prefLabel><skosxl:Label><skosxl:literalForm>Arctic Council</skosxl:literalForm></skosxl:Label></skosxl:prefLabel>
    <skos:narrower rdf:resource="http://dx.doi.org/10.13039/B"/>
  </skos:Concept>
  <skos:Concept rdf:about="http://dx.doi.org/10.13039/B">
    <skosxl:prefLabel><skosxl:Label><skosxl:literalForm>Boreal Institute</skosxl:literalForm></skosxl:Label></skosxl:prefLabel>
    <skos:broader rdf:resource="http://dx.doi.org/10.13039/A"/>
  </skos:Concept>
</rdf:RDF>
"#,
        tops
    )
}

fn synthetic(n: usize) -> RecordSet<ResolvedRelations> {
    (0..n)
        .map(|i| {
            let mut r = RawConcept::new(format!("{:06}", i));
            r.name = Some(format!("Research Council {}", i));
            let c: Concept = r.with_relations(ResolvedRelations::new(), ResolvedRelations::new());
            (c.id.clone(), c)
        })
        .collect()
}

fn countries() -> CountryTable {
    CountryTable::builtin().unwrap()
}

#[tokio::test]
async fn two_concepts_link_and_are_retrievable_by_id() {
    let rdf = two_concept_rdf(&["A", "B"]);
    let parsed = parse_reader(rdf.as_bytes(), &countries()).unwrap();
    let resolved = resolve(parsed.records).unwrap();

    let a = &resolved["A"];
    let b = &resolved["B"];
    assert_eq!(a.narrower.len(), 1);
    assert_eq!(a.narrower["B"], "Boreal Institute");
    assert_eq!(b.broader.len(), 1);
    assert_eq!(b.broader["A"], "Arctic Council");

    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("index");
    let report = build_index(&index, &resolved, &IndexSettings::default(), &NoProgress)
        .await
        .unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.commits, 1);

    for id in ["A", "B"] {
        let page = search(&index, 0, Some(&format!("id:{}", id)), None, 20)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(&page.results[0].item, &resolved[id]);
    }

    let missing = search(&index, 0, Some("id:C"), None, 20).await.unwrap();
    assert_eq!(missing.total, 0);
    assert!(missing.results.is_empty());
}

#[tokio::test]
async fn dangling_top_concept_aborts_before_indexing() {
    let rdf = two_concept_rdf(&["A", "Z"]);
    let err = parse_reader(rdf.as_bytes(), &countries()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<IntegrityError>(),
        Some(&IntegrityError::MissingTopConcept { id: "Z".into() })
    );
}

#[tokio::test]
async fn dangling_relation_aborts_resolution() {
    let rdf = two_concept_rdf(&["A"]).replace(
        r#"<skos:broader rdf:resource="http://dx.doi.org/10.13039/A"/>"#,
        r#"<skos:broader rdf:resource="http://dx.doi.org/10.13039/ghost"/>"#,
    );
    let parsed = parse_reader(rdf.as_bytes(), &countries()).unwrap();
    assert!(matches!(
        resolve(parsed.records),
        Err(IntegrityError::DanglingRelation { ref target, .. }) if target == "ghost"
    ));
}

#[tokio::test]
async fn fixture_registry_is_searchable() {
    let parsed = parse_reader(REGISTRY.as_bytes(), &countries()).unwrap();
    assert_eq!(parsed.records.len(), 4);
    assert!(parsed.unknown_countries.is_empty());

    let resolved = resolve(parsed.records).unwrap();
    let nsf = &resolved["100000001"];
    assert_eq!(nsf.country.as_deref(), Some("United States"));
    assert_eq!(
        nsf.narrower["100000003"],
        "Office of Polar Programs & Arctic Research"
    );

    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("index");
    build_index(&index, &resolved, &IndexSettings::default(), &NoProgress)
        .await
        .unwrap();

    // Stemming: "foundations" finds "Foundation"
    let page = search(&index, 0, Some("foundations"), None, 20).await.unwrap();
    let ids: Vec<&str> = page.results.iter().map(|h| h.item.id.as_str()).collect();
    assert_eq!(page.total, 2);
    assert!(ids.contains(&"100000001"));
    assert!(ids.contains(&"501100001659"));

    // Location narrows the same query
    let page = search(&index, 0, Some("foundation"), Some("Germany"), 20)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0].item.id, "501100001659");

    let page = search(&index, 0, None, Some("usa"), 20).await.unwrap();
    assert_eq!(page.total, 3);

    // Pagination
    let page = search(&index, 2, None, Some("usa"), 2).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.results.len(), 1);

    // Spelling correction when nothing matches
    let page = search(&index, 0, Some("polr fundation"), None, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.suggestion.as_deref(), Some("polar foundation"));

    // Numbers survive the rewrite
    let page = search(&index, 0, Some("polr 2020 fundation"), None, 20)
        .await
        .unwrap();
    assert_eq!(page.suggestion.as_deref(), Some("polar 2020 foundation"));

    // One-letter words are never corrected, two-letter words only by one edit
    let page = search(&index, 0, Some("fundation x"), None, 20)
        .await
        .unwrap();
    assert_eq!(page.suggestion.as_deref(), Some("foundation x"));
    let page = search(&index, 0, Some("ID:100000001"), None, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.suggestion, None);

    let dfg = get_concept(&index, "501100001659").await.unwrap();
    assert_eq!(dfg.altnames, vec!["German Research Foundation", "DFG"]);
    assert!(get_concept(&index, "nope").await.is_err());

    assert!(search(&index, 0, None, None, 20).await.is_err());
}

#[tokio::test]
async fn unknown_country_degrades_to_placeholder() {
    let rdf = REGISTRY.replace(
        "<schema:addressCountry>deu</schema:addressCountry>",
        "<schema:addressCountry>qqq</schema:addressCountry>",
    );
    let parsed = parse_reader(rdf.as_bytes(), &countries()).unwrap();
    let dfg = &parsed.records["501100001659"];
    assert_eq!(dfg.country_code.as_deref(), Some("qqq"));
    assert_eq!(dfg.country.as_deref(), Some(UNKNOWN_COUNTRY));
    assert!(parsed.unknown_countries.contains("qqq"));
}

#[tokio::test]
async fn existing_destination_is_left_untouched() {
    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("index");
    std::fs::create_dir(&index).unwrap();
    std::fs::write(index.join("keep.txt"), b"production data").unwrap();

    let err = build_index(&index, &synthetic(3), &IndexSettings::default(), &NoProgress)
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<DestinationExists>().is_some());

    let entries: Vec<_> = std::fs::read_dir(&index).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        std::fs::read(index.join("keep.txt")).unwrap(),
        b"production data"
    );
}

#[tokio::test]
async fn checkpoints_every_five_thousand_documents() {
    let records = synthetic(12_001);
    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("index");
    let progress = CapturedProgress::default();

    let report = build_index(&index, &records, &IndexSettings::default(), &progress)
        .await
        .unwrap();
    assert_eq!(report.documents, 12_001);
    assert_eq!(report.commits, 3);

    let events = progress.events.lock().unwrap().clone();
    let indexing = events
        .iter()
        .filter(|e| matches!(e, BuildProgressEvent::Indexing { .. }))
        .count();
    // every thousand documents, except where a checkpoint is reported instead
    assert_eq!(indexing, 10);
    let commits: Vec<BuildProgressEvent> = events
        .into_iter()
        .filter(|e| !matches!(e, BuildProgressEvent::Indexing { .. }))
        .collect();
    assert_eq!(
        commits,
        vec![
            BuildProgressEvent::Checkpoint { n: 5000, total: 12_001 },
            BuildProgressEvent::Checkpoint { n: 10_000, total: 12_001 },
            BuildProgressEvent::Done { documents: 12_001, commits: 3 },
        ]
    );
    assert_eq!(document_count(&index).await.unwrap(), 12_001);
}

#[tokio::test]
async fn crash_after_second_checkpoint_keeps_first_ten_thousand() {
    let records = synthetic(12_001);
    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("index");
    let settings = IndexSettings::default();

    let sink = SqliteIndex::create(&index, &settings).await.unwrap();
    let mut builder = IndexBuilder::new(sink, &settings, records.len() as u64, &NoProgress);
    for concept in records.values().take(10_500) {
        builder.add(concept).await.unwrap();
    }
    assert_eq!(builder.commits(), 2);
    // Simulated crash: the open transaction is never committed
    drop(builder);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(document_count(&index).await.unwrap(), 10_000);
    let last_committed = search(&index, 0, Some("id:009999"), None, 20).await.unwrap();
    assert_eq!(last_committed.total, 1);
    let first_lost = search(&index, 0, Some("id:010000"), None, 20).await.unwrap();
    assert_eq!(first_lost.total, 0);
}

#[test]
fn parsing_twice_gives_identical_records() {
    let table = countries();
    let a: RecordSet<RawRelations> = parse_reader(REGISTRY.as_bytes(), &table).unwrap().records;
    let b: RecordSet<RawRelations> = parse_reader(REGISTRY.as_bytes(), &table).unwrap().records;
    assert_eq!(a, b);
}

#[tokio::test]
async fn spelling_off_gives_no_suggestions() {
    let parsed = parse_reader(REGISTRY.as_bytes(), &countries()).unwrap();
    let resolved = resolve(parsed.records).unwrap();
    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("index");
    let settings = IndexSettings {
        spelling: false,
        ..Default::default()
    };
    build_index(&index, &resolved, &settings, &NoProgress)
        .await
        .unwrap();

    let page = search(&index, 0, Some("fundation"), None, 20).await.unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.suggestion, None);

    // Stemmed matching does not depend on the dictionary
    let page = search(&index, 0, Some("sciences"), None, 20).await.unwrap();
    assert_eq!(page.total, 2);
}
