//! Concrete `redb` realization of the backing-store schema.
//!
//! Fixed tables (the root resource table, its URI index, and the type
//! membership multimap) are compile-time `TableDefinition` constants.
//! Per-class tables
//! and per-property side tables are ontology-driven (their names come from
//! [`crate::ontology::ClassDef::name`] and
//! [`crate::ontology::Ontology::multi_table_name`]), so they are opened
//! through [`class_table`]/[`multi_value_table`] helpers that build a
//! `TableDefinition`/`MultimapTableDefinition` from a borrowed name at the
//! point of use rather than as `'static` constants.

use redb::{MultimapTableDefinition, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::ontology::TYPE_TABLE_NAME;

/// Current schema version. Bumped on breaking changes to the fixed tables.
pub const SCHEMA_VERSION: u32 = 1;

/// Database-level metadata, written once at creation.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("engine_metadata");

/// Key under which [`EngineMetadata`] is stored in [`METADATA_TABLE`].
pub const METADATA_KEY: &str = "engine_metadata";

/// The root `rdfs:Resource` table: id -> bincode-encoded [`ResourceRow`].
pub const ROOT_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("rdfs:Resource");

/// Reverse index: URI -> resource id, for [`crate::engine::resolver`] lookups.
pub const URI_INDEX_TABLE: TableDefinition<&str, u32> = TableDefinition::new("rdfs:Resource_uri_index");

/// Type membership: subject id -> class resource id, one entry per class in
/// the subject's super-class closure — `rdfs:Resource_rdf:type(ID, rdf:type)`.
pub const TYPE_TABLE: MultimapTableDefinition<u32, u32> = MultimapTableDefinition::new(TYPE_TABLE_NAME);

/// Schema-version and creation-time record, written once when a new database
/// file is initialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineMetadata {
    pub schema_version: u32,
    pub created_at: u32,
}

impl EngineMetadata {
    pub fn new(created_at: u32) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            created_at,
        }
    }
}

/// A row in [`ROOT_TABLE`]: everything the root resource table carries
/// besides the id itself (which is the table key).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceRow {
    pub uri: String,
    pub added: u32,
    pub modified: u32,
    pub available: bool,
}

/// Builds the `TableDefinition` for a class table (one row per instance,
/// one column per single-valued property actually set). The row value is a
/// bincode-encoded `BTreeMap<String, Value>` keyed by property column name.
pub fn class_table(name: &str) -> TableDefinition<'_, u32, &[u8]> {
    TableDefinition::new(name)
}

/// Builds the `MultimapTableDefinition` for a multi-valued property's side
/// table: id -> bincode-encoded [`crate::types::Value`], one entry per value.
pub fn multi_value_table(name: &str) -> MultimapTableDefinition<'_, u32, &[u8]> {
    MultimapTableDefinition::new(name)
}
