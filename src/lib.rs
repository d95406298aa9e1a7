//! # tracker-update-engine
//!
//! Write-path engine for an ontology-driven RDF triple store over a
//! relational backing store. Clients submit RDF insert/delete statements
//! inside explicit transactions; the engine decomposes each statement into
//! row operations against an ontology-derived schema, resolves and caches
//! resource identities, materializes blank nodes, keeps a full-text index in
//! sync, and commits or rolls back atomically with savepoint support for
//! nested SPARQL-update sub-transactions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracker_update_engine::{Engine, EngineConfig, ontology::reference_ontology};
//!
//! let ontology = reference_ontology();
//! let mut engine = Engine::open("./store.redb", ontology, EngineConfig::default())?;
//!
//! engine.begin()?;
//! engine.insert_statement(None, "http://example.com/a", "rdf:type", "nie:InformationElement")?;
//! engine.insert_statement(None, "http://example.com/a", "nie:title", "Hello")?;
//! engine.commit()?;
//! # Ok::<(), tracker_update_engine::EngineError>(())
//! ```
//!
//! ## Key Concepts
//!
//! ### Ontology
//!
//! Classes and properties are registered once, in Rust, via
//! [`ontology::OntologyBuilder`]. A small reference ontology
//! ([`ontology::reference_ontology`]) ships with the crate for tests and the
//! CLI demo.
//!
//! ### Statements vs SPARQL text
//!
//! The statement API ([`Engine::insert_statement`] and friends) is the
//! primary surface. [`Engine::execute_update_text`] drives the same API from
//! a tiny line-oriented dialect (see [`sparql_text`]) — not a SPARQL parser.
//!
//! ## Thread Safety
//!
//! [`Engine`] is single-threaded and cooperative: mutating operations take
//! `&mut self`. There is exactly one active transaction per engine instance.
//! Cross-thread access must be synchronized externally.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod error;
mod fts;
mod types;

pub mod engine;
pub mod ontology;
pub mod sparql_text;
pub mod store;

// ============================================================================
// Public API re-exports
// ============================================================================

// Configuration
pub use config::{EngineConfig, SyncMode};

// Error handling
pub use error::{EngineError, Result, StorageError};

// Core types
pub use types::{ModSeq, ResourceId, Value};

// Engine
pub use engine::{Engine, Observer, ObserverEvent, TransactionState};

// Ontology
pub use ontology::{ClassDef, ClassId, Datatype, Ontology, OntologyBuilder, PropertyDef, PropertyId};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common `tracker-update-engine` usage.
///
/// ```rust
/// use tracker_update_engine::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::Engine;
    pub use crate::error::{EngineError, Result};
    pub use crate::ontology::{reference_ontology, Ontology};
    pub use crate::types::{ResourceId, Value};
}
