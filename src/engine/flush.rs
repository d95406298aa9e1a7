//! Flush/Commit Engine: walks every staged `ResourceBuffer` at commit time
//! and applies its `TableOp`s against the backing tables, in a fixed order
//! per resource (rename, then table ops, then type membership, then fts).

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::AtomicU32;

use redb::{ReadableTable, WriteTransaction};

use crate::error::Result;
use crate::fts::FtsIndex;
use crate::ontology::{Ontology, PropertyId};
use crate::store::{class_table, multi_value_table, TYPE_TABLE};
use crate::types::{ResourceId, Value};

use super::buffer::{ResourceBuffer, TableOp};
use super::{resolver, Engine};

impl Engine {
    /// Flushes every `ResourceBuffer` staged this transaction, then
    /// synchronizes the fts index if anything was staged against it. Called
    /// from `commit`, after the trailing blank subject has already been
    /// flushed.
    pub(crate) fn flush_all(&mut self) -> Result<()> {
        let txn = require_txn(&self.txn)?;
        for rb in self.buffer.iter() {
            flush_resource(
                txn,
                &self.ontology,
                &mut self.resource_cache,
                &self.modseq_counter,
                &mut self.fts,
                rb,
            )?;
        }
        if self.fts.has_pending() {
            self.fts.commit();
        }
        Ok(())
    }
}

fn require_txn(txn: &Option<WriteTransaction>) -> Result<&WriteTransaction> {
    txn.as_ref()
        .ok_or_else(|| crate::error::EngineError::internal("no active transaction"))
}

/// Applies one resource's staged changes: rename, then table ops, then type
/// membership (instance counters included), then fts staging.
fn flush_resource(
    txn: &WriteTransaction,
    ontology: &Ontology,
    cache: &mut HashMap<String, ResourceId>,
    modseq_counter: &AtomicU32,
    fts: &mut FtsIndex,
    rb: &ResourceBuffer,
) -> Result<()> {
    if let Some(new_uri) = &rb.new_subject {
        let modseq = resolver::next_modseq(modseq_counter);
        resolver::touch(txn, cache, rb.resource_id, modseq, Some(new_uri.as_str()))?;
    }

    for (table_name, op) in &rb.table_ops {
        if op.multi {
            flush_multi_table_op(txn, table_name, rb.resource_id, op)?;
        } else {
            flush_single_table_op(txn, table_name, rb.resource_id, op)?;
        }
    }

    for (class, class_resource_id) in &rb.type_attachments {
        attach_type_row(txn, rb.resource_id, *class_resource_id)?;
        ontology.increment_instance_count(*class);
    }
    for (class, class_resource_id) in &rb.type_detachments {
        detach_type_row(txn, rb.resource_id, *class_resource_id)?;
        ontology.decrement_instance_count(*class);
    }

    if rb.fts_updated {
        for (property, values) in &rb.values {
            if !ontology.property(*property).fts {
                continue;
            }
            stage_fts_text(fts, rb.resource_id, *property, values);
        }
    }

    Ok(())
}

fn attach_type_row(txn: &WriteTransaction, subject: ResourceId, class_resource_id: ResourceId) -> Result<()> {
    let mut table = txn.open_multimap_table(TYPE_TABLE)?;
    table.insert(subject.0, class_resource_id.0)?;
    Ok(())
}

fn detach_type_row(txn: &WriteTransaction, subject: ResourceId, class_resource_id: ResourceId) -> Result<()> {
    let mut table = txn.open_multimap_table(TYPE_TABLE)?;
    table.remove(subject.0, class_resource_id.0)?;
    Ok(())
}

fn stage_fts_text(fts: &mut FtsIndex, resource_id: ResourceId, property: PropertyId, values: &[Value]) {
    let text: String = values
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ");
    fts.stage_text(resource_id, property, text);
}

/// `multi` tables: one row operation per recorded value, insert-or-ignore
/// (redb's multimap set semantics already dedup an exact key/value pair) or
/// removal.
fn flush_multi_table_op(txn: &WriteTransaction, table_name: &str, resource_id: ResourceId, op: &TableOp) -> Result<()> {
    let mut table = txn.open_multimap_table(multi_value_table(table_name))?;
    for column in &op.columns {
        let value = column
            .value
            .as_ref()
            .expect("multi-valued column ops always carry a value");
        let bytes = bincode::serialize(value)?;
        if column.delete {
            table.remove(resource_id.0, bytes.as_slice())?;
        } else {
            table.insert(resource_id.0, bytes.as_slice())?;
        }
    }
    Ok(())
}

/// `single` tables: a row removal (type detach), an insert-or-ignore row
/// (type attach), and/or a column merge pass over the row's bincode-encoded
/// blob (`SET col = value` / `SET col = NULL`).
fn flush_single_table_op(txn: &WriteTransaction, table_name: &str, resource_id: ResourceId, op: &TableOp) -> Result<()> {
    if op.delete_row {
        let mut table = txn.open_table(class_table(table_name))?;
        table.remove(resource_id.0)?;
        return Ok(());
    }

    if op.insert_row {
        let exists = {
            let table = txn.open_table(class_table(table_name))?;
            table.get(resource_id.0)?.is_some()
        };
        if !exists {
            let empty: BTreeMap<String, Value> = BTreeMap::new();
            let bytes = bincode::serialize(&empty)?;
            let mut table = txn.open_table(class_table(table_name))?;
            table.insert(resource_id.0, bytes.as_slice())?;
        }
    }

    if !op.columns.is_empty() {
        let mut row: BTreeMap<String, Value> = {
            let table = txn.open_table(class_table(table_name))?;
            match table.get(resource_id.0)? {
                Some(bytes) => bincode::deserialize(bytes.value())?,
                None => BTreeMap::new(),
            }
        };
        for column in &op.columns {
            match &column.value {
                Some(value) => {
                    row.insert(column.column.clone(), value.clone());
                }
                None => {
                    row.remove(&column.column);
                }
            }
        }
        let bytes = bincode::serialize(&row)?;
        let mut table = txn.open_table(class_table(table_name))?;
        table.insert(resource_id.0, bytes.as_slice())?;
    }

    Ok(())
}
