//! # fundreg
//!
//! Builds a full-text search index over the Open Funder Registry, a SKOS
//! taxonomy of funding bodies published as RDF/XML.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐
//! │ registry   │──▶│  Parser   │──▶│ Resolver │──▶│  Indexer   │
//! │   .rdf     │   │ (stream)  │   │ ids→names│   │ FTS5+spell │
//! └────────────┘   └────┬─────┘   └──────────┘   └─────┬──────┘
//!                       │ snapshot JSON                 │
//!                       ▼                               ▼
//!                 funders.json                   <index>/index.sqlite
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fundreg build --fetch --index-path data/funders.new   # download, parse, index
//! fundreg build --index-path data/funders.new           # rebuild from snapshot
//! fundreg search "science foundation" --location germany
//! fundreg get 501100001659
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Concept records (raw and resolved) |
//! | [`country`] | ISO3 country code lookup |
//! | [`parser`] | Streaming RDF/XML → record set |
//! | [`resolve`] | Broader/narrower resolution |
//! | [`snapshot`] | Intermediate JSON snapshot |
//! | [`terms`] | Index document and spelling term generation |
//! | [`index`] | Checkpointed index construction |
//! | [`search`] | Queries against a built index |
//! | [`get`] | Single-concept retrieval |
//! | [`fetch`] | Taxonomy download |
//! | [`pipeline`] | The `build`, `parse` and `fetch` commands |
//! | [`progress`] | Build progress reporting |
//! | [`error`] | Error types and exit codes |
//! | [`db`] | Index database connection |
//! | [`migrate`] | Index schema |

pub mod config;
pub mod country;
pub mod db;
pub mod error;
pub mod fetch;
pub mod get;
pub mod index;
pub mod migrate;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod search;
pub mod snapshot;
pub mod terms;
