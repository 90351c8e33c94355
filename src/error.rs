//! Typed pipeline errors.
//!
//! Orchestration code propagates these through `anyhow`; the binary downcasts
//! them to choose an exit status (see [`exit_code`]).

use std::path::PathBuf;

/// Exit status when the index destination already exists.
pub const EXIT_DESTINATION_EXISTS: i32 = 2;
/// Exit status when the taxonomy is internally inconsistent.
pub const EXIT_INTEGRITY: i32 = 32;
/// Exit status for any other fatal error.
pub const EXIT_FAILURE: i32 = 1;

/// Structural problems in the taxonomy XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The XML itself could not be read.
    Xml(String),
    /// An element that needs an identifying attribute (`rdf:about` or
    /// `rdf:resource`) did not carry one.
    MissingAttribute { element: String, attribute: String },
    /// A concept declaration opened while another was still open.
    NestedConcept { outer: String, inner: String },
    /// The same identifier was declared twice.
    DuplicateConcept(String),
    /// The document ended inside a concept declaration.
    UnclosedConcept(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Xml(e) => write!(f, "malformed taxonomy XML: {}", e),
            ParseError::MissingAttribute { element, attribute } => {
                write!(f, "<{}> is missing its {} attribute", element, attribute)
            }
            ParseError::NestedConcept { outer, inner } => write!(
                f,
                "concept {} declared inside concept {}",
                inner, outer
            ),
            ParseError::DuplicateConcept(id) => write!(f, "concept {} declared twice", id),
            ParseError::UnclosedConcept(id) => {
                write!(f, "document ended inside concept {}", id)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// The taxonomy references identifiers it never declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// A `hasTopConcept` identifier has no concept declaration.
    MissingTopConcept { id: String },
    /// A broader/narrower reference points at an undeclared identifier.
    DanglingRelation {
        concept: String,
        relation: &'static str,
        target: String,
    },
}

impl std::fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityError::MissingTopConcept { id } => {
                write!(f, "top concept {} is never declared", id)
            }
            IntegrityError::DanglingRelation {
                concept,
                relation,
                target,
            } => write!(
                f,
                "concept {} has {} reference to unknown concept {}",
                concept, relation, target
            ),
        }
    }
}

impl std::error::Error for IntegrityError {}

/// The index destination is already occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationExists {
    pub path: PathBuf,
}

impl std::fmt::Display for DestinationExists {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot overwrite {}: build into a fresh path and swap it in",
            self.path.display()
        )
    }
}

impl std::error::Error for DestinationExists {}

/// Maps an error chain to the process exit status.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<DestinationExists>().is_some() {
        EXIT_DESTINATION_EXISTS
    } else if err.downcast_ref::<IntegrityError>().is_some() {
        EXIT_INTEGRITY
    } else {
        EXIT_FAILURE
    }
}
