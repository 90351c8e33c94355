//! Streaming SKOS/RDF-XML parser.
//!
//! The taxonomy is read in one forward pass. [`GraphBuilder`] is a small state
//! machine that consumes [`TaxonomyEvent`]s and fills in one concept record at
//! a time; [`parse_reader`] drives it from `quick-xml`. Because the builder only
//! sees events, tests can feed it synthetic sequences without any XML.
//!
//! Elements are matched on their local name, so the namespace prefixes used by
//! a particular export do not matter:
//!
//! | Element | Effect |
//! |---------|--------|
//! | `skos:hasTopConcept` | adds `rdf:resource` id to the top-concept checklist |
//! | `skos:Concept` | opens/closes a record keyed by the `rdf:about` id |
//! | `skos:broader` / `skos:narrower` | appends the `rdf:resource` id |
//! | `skosxl:prefLabel` / `skosxl:altLabel` | routes nested `skosxl:literalForm` text |
//! | `svf:fundingBodyType` / `svf:fundingBodySubType` / `svf:region` | text |
//! | `svf:state` / `svf:country` | `rdf:resource`, else text |
//! | `schema:addressCountry` | country code, resolved to a name |

use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use crate::country::{CountryTable, UNKNOWN_COUNTRY};
use crate::error::{IntegrityError, ParseError};
use crate::models::{RawConcept, RawRelations, RecordSet};

/// Elements the parser acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    HasTopConcept,
    Concept,
    LiteralForm,
    PrefLabel,
    AltLabel,
    Broader,
    Narrower,
    FundingBodyType,
    FundingBodySubType,
    State,
    Region,
    AddressCountry,
    Country,
}

impl Tag {
    pub fn from_local_name(name: &str) -> Option<Tag> {
        Some(match name {
            "hasTopConcept" => Tag::HasTopConcept,
            "Concept" => Tag::Concept,
            "literalForm" => Tag::LiteralForm,
            "prefLabel" => Tag::PrefLabel,
            "altLabel" => Tag::AltLabel,
            "broader" => Tag::Broader,
            "narrower" => Tag::Narrower,
            "fundingBodyType" => Tag::FundingBodyType,
            "fundingBodySubType" => Tag::FundingBodySubType,
            "state" => Tag::State,
            "region" => Tag::Region,
            "addressCountry" => Tag::AddressCountry,
            "country" => Tag::Country,
            _ => return None,
        })
    }

    /// Leaf elements whose text content is captured.
    fn captures_text(self) -> bool {
        matches!(
            self,
            Tag::LiteralForm
                | Tag::FundingBodyType
                | Tag::FundingBodySubType
                | Tag::State
                | Tag::Region
                | Tag::AddressCountry
                | Tag::Country
        )
    }
}

/// One parse event, with element names already reduced to local names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyEvent<'a> {
    Start {
        name: &'a str,
        about: Option<&'a str>,
        resource: Option<&'a str>,
    },
    Text(&'a str),
    End {
        name: &'a str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Preferred,
    Alternate,
}

/// The last path segment of a URI, which the registry uses as the concept id.
pub fn id_from_uri(uri: &str) -> &str {
    let trimmed = uri.trim().trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Parser output before the top-concept check.
#[derive(Debug, Clone, Default)]
pub struct ParsedGraph {
    pub records: RecordSet<RawRelations>,
    /// Identifiers declared via `hasTopConcept`, in document order.
    pub top_concepts: Vec<String>,
    /// Distinct country codes the table could not resolve.
    pub unknown_countries: BTreeSet<String>,
}

/// A verified record set, ready for relationship resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTaxonomy {
    pub records: RecordSet<RawRelations>,
    pub unknown_countries: BTreeSet<String>,
}

impl ParsedGraph {
    /// Fails on the first top concept that was never declared.
    pub fn verify_top_concepts(&self) -> Result<(), IntegrityError> {
        match self
            .top_concepts
            .iter()
            .find(|id| !self.records.contains_key(*id))
        {
            Some(id) => Err(IntegrityError::MissingTopConcept { id: id.clone() }),
            None => Ok(()),
        }
    }

    /// Runs the top-concept check and drops the checklist.
    pub fn into_verified(self) -> Result<ParsedTaxonomy, IntegrityError> {
        self.verify_top_concepts()?;
        Ok(ParsedTaxonomy {
            records: self.records,
            unknown_countries: self.unknown_countries,
        })
    }
}

/// Event-driven record builder.
///
/// Holds at most one open record. Text is buffered per leaf element and only
/// routed to a field when that element closes, so fragmented character data
/// is concatenated rather than overwritten.
pub struct GraphBuilder<'c> {
    countries: &'c CountryTable,
    graph: ParsedGraph,
    current: Option<RawConcept>,
    current_tag: Option<Tag>,
    label: Option<Label>,
    content: String,
    resource: Option<String>,
}

impl<'c> GraphBuilder<'c> {
    pub fn new(countries: &'c CountryTable) -> Self {
        Self {
            countries,
            graph: ParsedGraph::default(),
            current: None,
            current_tag: None,
            label: None,
            content: String::new(),
            resource: None,
        }
    }

    /// Number of records finalized so far.
    pub fn len(&self) -> usize {
        self.graph.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.records.is_empty()
    }

    pub fn handle(&mut self, event: TaxonomyEvent<'_>) -> Result<(), ParseError> {
        match event {
            TaxonomyEvent::Start {
                name,
                about,
                resource,
            } => self.start(name, about, resource),
            TaxonomyEvent::Text(text) => {
                if self.current_tag.is_some_and(Tag::captures_text) {
                    self.content.push_str(text);
                }
                Ok(())
            }
            TaxonomyEvent::End { name } => {
                self.end(name);
                Ok(())
            }
        }
    }

    fn start(
        &mut self,
        name: &str,
        about: Option<&str>,
        resource: Option<&str>,
    ) -> Result<(), ParseError> {
        let tag = Tag::from_local_name(name);
        self.current_tag = tag;
        self.content.clear();
        self.resource = None;

        let Some(tag) = tag else {
            return Ok(());
        };

        match tag {
            Tag::HasTopConcept => {
                let uri = required(name, "rdf:resource", resource)?;
                self.graph.top_concepts.push(id_from_uri(uri).to_string());
            }
            Tag::Concept => {
                let id = id_from_uri(required(name, "rdf:about", about)?).to_string();
                if let Some(open) = &self.current {
                    return Err(ParseError::NestedConcept {
                        outer: open.id.clone(),
                        inner: id,
                    });
                }
                if self.graph.records.contains_key(&id) {
                    return Err(ParseError::DuplicateConcept(id));
                }
                self.current = Some(RawConcept::new(id));
            }
            Tag::Broader | Tag::Narrower => {
                let id = id_from_uri(required(name, "rdf:resource", resource)?).to_string();
                if let Some(record) = self.current.as_mut() {
                    if tag == Tag::Broader {
                        record.broader.push(id);
                    } else {
                        record.narrower.push(id);
                    }
                }
            }
            Tag::PrefLabel => self.label = Some(Label::Preferred),
            Tag::AltLabel => self.label = Some(Label::Alternate),
            Tag::State | Tag::Country => {
                self.resource = resource.map(str::to_string);
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &str) {
        let text = self.content.trim().to_string();
        let resource = self.resource.take();
        self.content.clear();
        self.current_tag = None;

        let Some(tag) = Tag::from_local_name(name) else {
            return;
        };

        match tag {
            Tag::Concept => {
                if let Some(record) = self.current.take() {
                    self.graph.records.insert(record.id.clone(), record);
                }
                self.label = None;
                return;
            }
            Tag::PrefLabel | Tag::AltLabel => {
                self.label = None;
                return;
            }
            _ => {}
        }

        let Some(record) = self.current.as_mut() else {
            return;
        };

        match tag {
            Tag::LiteralForm => match self.label {
                Some(Label::Preferred) => record.name = Some(text),
                Some(Label::Alternate) => record.altnames.push(text),
                None => {}
            },
            Tag::FundingBodyType => record.body_type = Some(text),
            Tag::FundingBodySubType => record.body_sub_type = Some(text),
            Tag::Region => record.region = Some(text),
            Tag::State => record.state = Some(resource.unwrap_or(text)),
            Tag::Country => record.location = Some(resource.unwrap_or(text)),
            Tag::AddressCountry => {
                let country = self.countries.resolve(&text);
                if country == UNKNOWN_COUNTRY && !text.is_empty() {
                    self.graph.unknown_countries.insert(text.clone());
                }
                record.country = Some(country.to_string());
                record.country_code = Some(text);
            }
            _ => {}
        }
    }

    /// Ends the pass. Fails if a concept declaration was left open.
    pub fn finish(self) -> Result<ParsedGraph, ParseError> {
        if let Some(open) = self.current {
            return Err(ParseError::UnclosedConcept(open.id));
        }
        Ok(self.graph)
    }
}

fn required<'a>(
    element: &str,
    attribute: &str,
    value: Option<&'a str>,
) -> Result<&'a str, ParseError> {
    value.ok_or_else(|| ParseError::MissingAttribute {
        element: element.to_string(),
        attribute: attribute.to_string(),
    })
}

fn xml_err(e: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(e.to_string())
}

fn local_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(xml_err)
}

/// Extracts `rdf:about` and `rdf:resource`, matched by local name.
fn rdf_attributes(e: &BytesStart<'_>) -> Result<(Option<String>, Option<String>), ParseError> {
    let mut about = None;
    let mut resource = None;
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        match attr.key.local_name().as_ref() {
            b"about" => about = Some(attr.unescape_value().map_err(xml_err)?.into_owned()),
            b"resource" => resource = Some(attr.unescape_value().map_err(xml_err)?.into_owned()),
            _ => {}
        }
    }
    Ok((about, resource))
}

/// Parses a taxonomy document without running the top-concept check.
pub fn parse_graph<R: BufRead>(source: R, countries: &CountryTable) -> Result<ParsedGraph> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().expand_empty_elements = true;

    let mut builder = GraphBuilder::new(countries);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) => {
                let name = local_name(&e)?;
                let (about, resource) = rdf_attributes(&e)?;
                builder.handle(TaxonomyEvent::Start {
                    name: &name,
                    about: about.as_deref(),
                    resource: resource.as_deref(),
                })?;
            }
            Event::Text(te) => {
                let text = te.unescape().map_err(xml_err)?;
                builder.handle(TaxonomyEvent::Text(&text))?;
            }
            Event::CData(cd) => {
                let text = String::from_utf8_lossy(&cd).into_owned();
                builder.handle(TaxonomyEvent::Text(&text))?;
            }
            Event::End(e) => {
                let name = std::str::from_utf8(e.local_name().as_ref())
                    .map_err(xml_err)?
                    .to_string();
                builder.handle(TaxonomyEvent::End { name: &name })?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(builder.finish()?)
}

/// Parses a taxonomy document and verifies every top concept was declared.
pub fn parse_reader<R: BufRead>(source: R, countries: &CountryTable) -> Result<ParsedTaxonomy> {
    let graph = parse_graph(source, countries)?;
    Ok(graph.into_verified()?)
}

pub fn parse_file(path: &Path, countries: &CountryTable) -> Result<ParsedTaxonomy> {
    use anyhow::Context;
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open taxonomy: {}", path.display()))?;
    parse_reader(std::io::BufReader::new(file), countries)
        .with_context(|| format!("Failed to parse taxonomy: {}", path.display()))
}
