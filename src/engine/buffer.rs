//! Per-transaction staging: the Update Buffer, its ResourceBuffers, and the
//! per-table operations they accumulate before flush.

use std::collections::{HashMap, HashSet};

use crate::ontology::{ClassId, PropertyId};
use crate::types::{ResourceId, Value};

/// One pending column write (single-valued) or value row (multi-valued)
/// within a [`TableOp`].
#[derive(Clone, Debug)]
pub struct ColumnOp {
    pub column: String,
    /// `Some` for an insert/set; `None` means `SET column = NULL`
    /// (single-valued delete) — unused for multi-valued rows, which instead
    /// use `delete` to distinguish an insert-or-ignore row from a row
    /// removal.
    pub value: Option<Value>,
    pub fts: bool,
    /// Only meaningful when the owning `TableOp.multi` is true.
    pub delete: bool,
}

/// Pending operation against one relational table for one subject.
#[derive(Clone, Debug, Default)]
pub struct TableOp {
    pub insert_row: bool,
    pub delete_row: bool,
    pub multi: bool,
    pub class: Option<ClassId>,
    pub columns: Vec<ColumnOp>,
}

impl TableOp {
    pub fn single() -> Self {
        Self::default()
    }

    pub fn multi() -> Self {
        Self {
            multi: true,
            ..Self::default()
        }
    }
}

/// Ephemeral staging object for one subject within the active transaction.
#[derive(Clone, Debug)]
pub struct ResourceBuffer {
    pub subject: String,
    pub new_subject: Option<String>,
    pub resource_id: ResourceId,
    pub create: bool,
    pub fts_updated: bool,
    /// property -> current value set, in insertion order (dedup applied on
    /// insert; order otherwise irrelevant but kept deterministic for fts
    /// concatenation).
    pub values: HashMap<PropertyId, Vec<Value>>,
    /// table name -> pending op.
    pub table_ops: HashMap<String, TableOp>,
    /// Types currently attached to this subject, including fan-out.
    pub types: Vec<ClassId>,
    /// Properties whose pre-transaction value set has already been loaded.
    pub loaded: HashSet<PropertyId>,
    /// Classes newly attached this transaction, paired with the class's own
    /// resource id, staged for the `rdfs:Resource_rdf:type` side table.
    pub type_attachments: Vec<(ClassId, ResourceId)>,
    /// Classes detached this transaction (rdf:type delete extension; see
    /// design notes), paired with the class's own resource id.
    pub type_detachments: Vec<(ClassId, ResourceId)>,
}

impl ResourceBuffer {
    pub fn new(subject: impl Into<String>, resource_id: ResourceId, create: bool, types: Vec<ClassId>) -> Self {
        Self {
            subject: subject.into(),
            new_subject: None,
            resource_id,
            create,
            fts_updated: false,
            values: HashMap::new(),
            table_ops: HashMap::new(),
            types,
            loaded: HashSet::new(),
            type_attachments: Vec::new(),
            type_detachments: Vec::new(),
        }
    }

    pub fn has_type(&self, class: ClassId) -> bool {
        self.types.contains(&class)
    }

    pub fn table_op(&mut self, table: &str, multi: bool) -> &mut TableOp {
        self.table_ops
            .entry(table.to_string())
            .or_insert_with(|| if multi { TableOp::multi() } else { TableOp::single() })
    }
}

/// Per-transaction mapping from subject URI to its [`ResourceBuffer`],
/// cleared on commit/rollback.
#[derive(Default)]
pub struct UpdateBuffer {
    resources: HashMap<String, ResourceBuffer>,
}

impl UpdateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, subject: &str) -> Option<&ResourceBuffer> {
        self.resources.get(subject)
    }

    pub fn get_mut(&mut self, subject: &str) -> Option<&mut ResourceBuffer> {
        self.resources.get_mut(subject)
    }

    pub fn entry_or_insert_with(
        &mut self,
        subject: &str,
        make: impl FnOnce() -> ResourceBuffer,
    ) -> &mut ResourceBuffer {
        self.resources.entry(subject.to_string()).or_insert_with(make)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceBuffer> {
        self.resources.values()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn clear(&mut self) {
        self.resources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_op_created_lazily_and_reused() {
        let mut buf = ResourceBuffer::new("http://x/a", ResourceId(1), true, vec![]);
        buf.table_op("nie_InformationElement", false).insert_row = true;
        assert!(buf.table_ops.get("nie_InformationElement").unwrap().insert_row);
        buf.table_op("nie_InformationElement", false)
            .columns
            .push(ColumnOp {
                column: "nie_title".into(),
                value: Some(Value::String("x".into())),
                fts: true,
                delete: false,
            });
        assert_eq!(buf.table_ops.get("nie_InformationElement").unwrap().columns.len(), 1);
    }

    #[test]
    fn update_buffer_clear_removes_all_resources() {
        let mut update_buffer = UpdateBuffer::new();
        update_buffer.entry_or_insert_with("http://x/a", || {
            ResourceBuffer::new("http://x/a", ResourceId(1), true, vec![])
        });
        assert!(!update_buffer.is_empty());
        update_buffer.clear();
        assert!(update_buffer.is_empty());
    }
}
