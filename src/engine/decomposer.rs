//! Ontology Decomposer: translates one `(graph, subject, predicate, object)`
//! statement into staged [`TableOp`]s on the current subject's
//! [`ResourceBuffer`].
//!
//! Written as one `impl Engine` block with direct field access rather than
//! chained `&mut self` sub-methods, so the borrow checker can see the
//! disjoint fields (`ontology`, `txn`, `resource_cache`, `buffer`,
//! `observers`, ...) touched within a single statement's processing.

use redb::{ReadableMultimapTable, ReadableTable, WriteTransaction};

use crate::error::{EngineError, Result};
use crate::ontology::{ClassId, Datatype, Ontology, PropertyDef, PropertyId, RDF_TYPE_PREDICATE, RENAME_PREDICATE};
use crate::sparql_text::ObjectToken;
use crate::store::{class_table, multi_value_table, ROOT_TABLE};
use crate::types::{ResourceId, Value};

use super::buffer::{ColumnOp, ResourceBuffer};
use super::blank::FinalizedBlank;
use super::observer::ObserverEvent;
use super::{resolver, Engine, Op};

impl Engine {
    /// Entry point for every statement, including those replayed from the
    /// blank-node buffer.
    pub(crate) fn decompose(
        &mut self,
        op: Op,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: ObjectToken,
    ) -> Result<()> {
        if subject.starts_with(':') {
            return self.route_blank(op, graph, subject, predicate, object);
        }
        self.decompose_resolved(op, graph, subject, predicate, object)
    }

    /// Finalizes whatever blank subject is still active at commit time and
    /// replays it, mirroring the switch-of-subject path.
    pub(crate) fn blank_flush_remaining(&mut self) -> Result<()> {
        if let Some(finalized) = self.blank.finalize() {
            self.replay_blank(finalized)?;
        }
        Ok(())
    }

    fn route_blank(
        &mut self,
        op: Op,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: ObjectToken,
    ) -> Result<()> {
        let finalized = self
            .blank
            .push(subject, op, graph.map(String::from), predicate.to_string(), object);
        if let Some(finalized) = finalized {
            self.replay_blank(finalized)?;
        }
        Ok(())
    }

    /// Replays a finalized blank subject's buffered statements against its
    /// materialized URI, unless that URI already names a known resource.
    fn replay_blank(&mut self, finalized: FinalizedBlank) -> Result<()> {
        let FinalizedBlank { uri, statements, .. } = finalized;

        let known = {
            let txn = require_txn(&self.txn)?;
            !resolver::resolve(txn, &mut self.resource_cache, &uri)?.is_none()
        };
        if known {
            return Ok(());
        }

        for statement in statements {
            self.decompose_resolved(
                statement.op,
                statement.graph.as_deref(),
                &uri,
                &statement.predicate,
                statement.object,
            )?;
        }
        Ok(())
    }

    fn decompose_resolved(
        &mut self,
        op: Op,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: ObjectToken,
    ) -> Result<()> {
        if predicate == RDF_TYPE_PREDICATE {
            return self.handle_rdf_type(op, graph, subject, object);
        }
        if predicate == RENAME_PREDICATE {
            return self.handle_rename(op, graph, subject, object);
        }

        let property = self
            .ontology
            .property_by_uri(predicate)
            .ok_or_else(|| EngineError::unknown_property(predicate))?;
        check_object_form(self.ontology.property(property), &object)?;
        self.handle_property_value(op, graph, subject, predicate, property, object)
    }

    /// `current_subject`: resolves/creates the resource id, seeds a fresh
    /// `ResourceBuffer` on first touch (type list loaded from the store, or
    /// empty for a brand-new subject), and stamps a fresh modseq.
    fn touch_subject(&mut self, subject: &str) -> Result<ResourceId> {
        let resource_id = {
            let txn = require_txn(&self.txn)?;
            resolver::ensure(
                txn,
                &mut self.resource_cache,
                &self.id_counter,
                &self.modseq_counter,
                subject,
            )?
        };

        if self.buffer.get(subject).is_none() {
            let types = {
                let txn = require_txn(&self.txn)?;
                seed_types(txn, &self.ontology, resource_id)?
            };
            // An empty type list seeded from the store is what makes this
            // subject "new" rather than an update to an existing one.
            let create = types.is_empty();
            self.buffer
                .entry_or_insert_with(subject, || ResourceBuffer::new(subject, resource_id, create, types));
        }

        let modseq = resolver::next_modseq(&self.modseq_counter);
        let txn = require_txn(&self.txn)?;
        resolver::touch(txn, &mut self.resource_cache, resource_id, modseq, None)?;

        Ok(resource_id)
    }

    fn handle_rename(&mut self, op: Op, graph: Option<&str>, subject: &str, object: ObjectToken) -> Result<()> {
        if op == Op::Delete {
            return Err(EngineError::constraint("tracker:uri cannot be deleted"));
        }
        self.touch_subject(subject)?;
        let new_uri = object_text(&object).to_string();

        let rb = self
            .buffer
            .get_mut(subject)
            .expect("touch_subject seeded this buffer");
        rb.new_subject = Some(new_uri.clone());
        let current_types = rb.types.clone();

        let event = ObserverEvent {
            graph,
            subject,
            predicate: RENAME_PREDICATE,
            object: &new_uri,
            current_types: &current_types,
        };
        self.observers.fire_insert(&event);
        Ok(())
    }

    fn handle_rdf_type(&mut self, op: Op, graph: Option<&str>, subject: &str, object: ObjectToken) -> Result<()> {
        let class_uri = object_text(&object).to_string();
        let class = self
            .ontology
            .class_by_uri(&class_uri)
            .ok_or_else(|| EngineError::unknown_class(&class_uri))?;

        self.touch_subject(subject)?;

        match op {
            Op::Insert => self.attach_class(graph, subject, class),
            Op::Delete => self.detach_class(graph, subject, class),
        }
    }

    /// Recursively attaches `class` and its super-classes, each at most
    /// once, staging an `insert_row` on every newly attached class's table
    /// and a side-table row in `rdfs:Resource_rdf:type`. Instance-counter
    /// increments are deferred to flush, so an in-transaction error that
    /// clears the update buffer cannot leave the in-memory counter ahead of
    /// what actually got committed.
    fn attach_class(&mut self, graph: Option<&str>, subject: &str, class: ClassId) -> Result<()> {
        let mut to_attach = vec![class];
        to_attach.extend(self.ontology.class(class).super_classes().iter().copied());

        for class in to_attach {
            let already = self
                .buffer
                .get(subject)
                .map(|rb| rb.has_type(class))
                .unwrap_or(false);
            if already {
                continue;
            }

            let def = self.ontology.class(class);
            let class_uri = def.uri.clone();
            let table_name = def.name.clone();

            let class_resource_id = {
                let txn = require_txn(&self.txn)?;
                resolver::ensure(
                    txn,
                    &mut self.resource_cache,
                    &self.id_counter,
                    &self.modseq_counter,
                    &class_uri,
                )?
            };

            let rb = self
                .buffer
                .get_mut(subject)
                .expect("touch_subject seeded this buffer");
            rb.types.push(class);
            rb.table_op(&table_name, false).insert_row = true;
            rb.type_attachments.push((class, class_resource_id));
            let current_types = rb.types.clone();

            let event = ObserverEvent {
                graph,
                subject,
                predicate: RDF_TYPE_PREDICATE,
                object: &class_uri,
                current_types: &current_types,
            };
            self.observers.fire_insert(&event);
        }
        Ok(())
    }

    /// Minimal symmetric extension for `rdf:type` deletes (insert handles
    /// the full super-class closure; delete detaches exactly the named
    /// class, with no super-class fan-out).
    fn detach_class(&mut self, graph: Option<&str>, subject: &str, class: ClassId) -> Result<()> {
        let already = self
            .buffer
            .get(subject)
            .map(|rb| rb.has_type(class))
            .unwrap_or(false);
        if !already {
            return Ok(());
        }

        let def = self.ontology.class(class);
        let class_uri = def.uri.clone();
        let table_name = def.name.clone();

        let class_resource_id = {
            let txn = require_txn(&self.txn)?;
            resolver::ensure(
                txn,
                &mut self.resource_cache,
                &self.id_counter,
                &self.modseq_counter,
                &class_uri,
            )?
        };

        let rb = self
            .buffer
            .get_mut(subject)
            .expect("checked has_type above");
        rb.types.retain(|&c| c != class);
        rb.table_op(&table_name, false).delete_row = true;
        rb.type_detachments.push((class, class_resource_id));
        let current_types = rb.types.clone();

        let event = ObserverEvent {
            graph,
            subject,
            predicate: RDF_TYPE_PREDICATE,
            object: &class_uri,
            current_types: &current_types,
        };
        self.observers.fire_delete(&event);
        Ok(())
    }

    fn handle_property_value(
        &mut self,
        op: Op,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        property: PropertyId,
        object: ObjectToken,
    ) -> Result<()> {
        let subject_id = self.touch_subject(subject)?;
        self.check_domain(subject, property, predicate)?;
        self.ensure_values_loaded(subject, subject_id, property)?;
        let value = self.coerce_value(property, &object)?;
        match op {
            Op::Insert => self.insert_value(graph, subject, subject_id, predicate, property, value),
            Op::Delete => self.delete_value(graph, subject, subject_id, predicate, property, value),
        }
    }

    /// Deletes the embedded metadata of `subject` while preserving
    /// user-authored annotations: for every class `subject` belongs to,
    /// enumerates that class's embedded properties (`rdf:type` itself is
    /// never embedded) and deletes the subject's current values for each
    /// through the normal delete path, so super-property fan-out, fts
    /// updates, and observer notifications all still happen.
    pub fn delete_resource_description(&mut self, graph: Option<&str>, subject: &str) -> Result<()> {
        let subject_id = self.touch_subject(subject)?;
        let types = self
            .buffer
            .get(subject)
            .map(|rb| rb.types.clone())
            .unwrap_or_default();

        let mut embedded_properties = Vec::new();
        for class in types {
            for (property, def) in self.ontology.properties_of_domain(class) {
                if def.embedded && !embedded_properties.contains(&property) {
                    embedded_properties.push(property);
                }
            }
        }

        for property in embedded_properties {
            self.ensure_values_loaded(subject, subject_id, property)?;
            let values = self
                .buffer
                .get(subject)
                .and_then(|rb| rb.values.get(&property))
                .cloned()
                .unwrap_or_default();
            let predicate = self.ontology.property(property).uri.clone();
            for value in values {
                self.delete_value(graph, subject, subject_id, &predicate, property, value)?;
            }
        }
        Ok(())
    }

    fn check_domain(&self, subject: &str, property: PropertyId, predicate: &str) -> Result<()> {
        let domain = self.ontology.property(property).domain;
        let satisfied = self
            .buffer
            .get(subject)
            .map(|rb| rb.has_type(domain))
            .unwrap_or(false);
        if satisfied {
            Ok(())
        } else {
            Err(EngineError::constraint(format!(
                "subject '{subject}' has no type matching the domain of property '{predicate}'"
            )))
        }
    }

    /// Loads a property's current value set into the `ResourceBuffer` on
    /// first touch. If this is the first fts-indexed property touched on a
    /// subject that already existed
    /// before this transaction, also preloads and stages removal of every
    /// fts-indexed property across the subject's current types, so the
    /// index learns the deletions even for properties this statement never
    /// mentions.
    fn ensure_values_loaded(&mut self, subject: &str, subject_id: ResourceId, property: PropertyId) -> Result<()> {
        if self
            .buffer
            .get(subject)
            .map(|rb| rb.loaded.contains(&property))
            .unwrap_or(false)
        {
            return Ok(());
        }

        let fts = self.ontology.property(property).fts;
        let pre_existing = !self.buffer.get(subject).map(|rb| rb.create).unwrap_or(true);
        let fts_not_yet_touched = self.buffer.get(subject).map(|rb| !rb.fts_updated).unwrap_or(true);

        if fts && pre_existing && fts_not_yet_touched {
            self.preload_fts_properties(subject, subject_id)?;
        }

        if self
            .buffer
            .get(subject)
            .map(|rb| rb.loaded.contains(&property))
            .unwrap_or(false)
        {
            return Ok(());
        }

        let values = {
            let txn = require_txn(&self.txn)?;
            load_property_values(txn, &self.ontology, subject_id, property)?
        };
        let rb = self
            .buffer
            .get_mut(subject)
            .expect("touch_subject seeded this buffer");
        rb.values.insert(property, values);
        rb.loaded.insert(property);
        Ok(())
    }

    fn preload_fts_properties(&mut self, subject: &str, subject_id: ResourceId) -> Result<()> {
        let types = self
            .buffer
            .get(subject)
            .map(|rb| rb.types.clone())
            .unwrap_or_default();

        let mut fts_properties = Vec::new();
        for class in types {
            for (property, _) in self.ontology.fts_properties_of_domain(class) {
                if !fts_properties.contains(&property) {
                    fts_properties.push(property);
                }
            }
        }

        for property in fts_properties {
            let already_loaded = self
                .buffer
                .get(subject)
                .map(|rb| rb.loaded.contains(&property))
                .unwrap_or(false);
            if already_loaded {
                continue;
            }

            let values = {
                let txn = require_txn(&self.txn)?;
                load_property_values(txn, &self.ontology, subject_id, property)?
            };
            let text = concat_text_values(&values);
            if !text.is_empty() {
                self.fts.stage_removal(subject_id, property);
            }

            let rb = self
                .buffer
                .get_mut(subject)
                .expect("touch_subject seeded this buffer");
            rb.values.insert(property, values);
            rb.loaded.insert(property);
            rb.fts_updated = true;
        }
        Ok(())
    }

    fn coerce_value(&mut self, property: PropertyId, object: &ObjectToken) -> Result<Value> {
        let def = self.ontology.property(property);
        let text = object_text(object);
        match def.datatype {
            Datatype::String => Ok(Value::String(text.to_string())),
            Datatype::Integer => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| EngineError::invalid_type(def.uri.clone(), format!("not an integer: {e}"))),
            Datatype::Boolean => Ok(Value::Bool(text == "true")),
            Datatype::Double => text
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|e| EngineError::invalid_type(def.uri.clone(), format!("not a double: {e}"))),
            Datatype::Date | Datatype::DateTime => parse_timestamp(text, def).map(Value::Date),
            Datatype::Resource => {
                let resolved = if text.starts_with(':') {
                    self.resolve_blank_object(text)?
                } else {
                    text.to_string()
                };
                let txn = require_txn(&self.txn)?;
                let id = resolver::ensure(
                    txn,
                    &mut self.resource_cache,
                    &self.id_counter,
                    &self.modseq_counter,
                    &resolved,
                )?;
                Ok(Value::resource(id))
            }
        }
    }

    /// Resolves a blank-node label used as a statement's *object* to its
    /// materialized URI. If `label` is still the blank buffer's active
    /// (un-finalized) subject, flushes it first — mirroring the "object
    /// still in blank buffer" case the decomposer's subject-side replay
    /// already handles.
    fn resolve_blank_object(&mut self, label: &str) -> Result<String> {
        if let Some(uri) = self.blank.materialized_uri(label) {
            return Ok(uri.to_string());
        }
        if self.blank.active_label() == Some(label) {
            if let Some(finalized) = self.blank.finalize() {
                let uri = finalized.uri.clone();
                self.replay_blank(finalized)?;
                return Ok(uri);
            }
        }
        Err(EngineError::constraint(format!(
            "blank node '{label}' referenced before it was defined"
        )))
    }

    fn insert_value(
        &mut self,
        graph: Option<&str>,
        subject: &str,
        subject_id: ResourceId,
        predicate: &str,
        property: PropertyId,
        value: Value,
    ) -> Result<()> {
        let def = self.ontology.property(property);
        let multi = def.multi;
        let domain = def.domain;
        let column_name = def.name.clone();
        let fts = def.fts;
        let super_properties = def.super_properties().to_vec();
        let table_name = if multi {
            self.ontology.multi_table_name(domain, property)
        } else {
            self.ontology.class(domain).name.clone()
        };

        let rb = self
            .buffer
            .get_mut(subject)
            .expect("touch_subject seeded this buffer");
        let values = rb.values.entry(property).or_default();
        if values.contains(&value) {
            return Ok(());
        }
        if !multi && !values.is_empty() {
            return Err(EngineError::constraint(format!(
                "property '{predicate}' is single-valued and already has a value for '{subject}'"
            )));
        }
        values.push(value.clone());

        let table_op = rb.table_op(&table_name, multi);
        table_op.class = Some(domain);
        if !multi {
            table_op.insert_row = true;
        }
        table_op.columns.push(ColumnOp {
            column: column_name,
            value: Some(value.clone()),
            fts,
            delete: false,
        });
        if fts {
            rb.fts_updated = true;
        }
        let current_types = rb.types.clone();

        let object_repr = value_display(&value);
        let event = ObserverEvent {
            graph,
            subject,
            predicate,
            object: &object_repr,
            current_types: &current_types,
        };
        self.observers.fire_insert(&event);

        for super_property in super_properties {
            let super_predicate = self.ontology.property(super_property).uri.clone();
            self.check_domain(subject, super_property, &super_predicate)?;
            self.ensure_values_loaded(subject, subject_id, super_property)?;
            self.insert_value(graph, subject, subject_id, &super_predicate, super_property, value.clone())?;
        }
        Ok(())
    }

    fn delete_value(
        &mut self,
        graph: Option<&str>,
        subject: &str,
        subject_id: ResourceId,
        predicate: &str,
        property: PropertyId,
        value: Value,
    ) -> Result<()> {
        let def = self.ontology.property(property);
        let multi = def.multi;
        let domain = def.domain;
        let column_name = def.name.clone();
        let fts = def.fts;
        let super_properties = def.super_properties().to_vec();
        let table_name = if multi {
            self.ontology.multi_table_name(domain, property)
        } else {
            self.ontology.class(domain).name.clone()
        };

        let rb = self
            .buffer
            .get_mut(subject)
            .expect("touch_subject seeded this buffer");
        let values = rb.values.entry(property).or_default();
        let Some(position) = values.iter().position(|v| v == &value) else {
            return Ok(());
        };
        values.remove(position);

        let table_op = rb.table_op(&table_name, multi);
        table_op.class = Some(domain);
        if multi {
            table_op.columns.push(ColumnOp {
                column: column_name,
                value: Some(value.clone()),
                fts,
                delete: true,
            });
        } else {
            table_op.columns.push(ColumnOp {
                column: column_name,
                value: None,
                fts,
                delete: false,
            });
        }
        if fts {
            rb.fts_updated = true;
        }
        let current_types = rb.types.clone();

        let object_repr = value_display(&value);
        let event = ObserverEvent {
            graph,
            subject,
            predicate,
            object: &object_repr,
            current_types: &current_types,
        };
        self.observers.fire_delete(&event);

        for super_property in super_properties {
            let super_predicate = self.ontology.property(super_property).uri.clone();
            self.ensure_values_loaded(subject, subject_id, super_property)?;
            self.delete_value(graph, subject, subject_id, &super_predicate, super_property, value.clone())?;
        }
        Ok(())
    }
}

fn check_object_form(def: &PropertyDef, object: &ObjectToken) -> Result<()> {
    match object {
        ObjectToken::Uri(_) if !def.datatype.is_resource() => Err(EngineError::invalid_type(
            def.uri.clone(),
            "insert_statement_with_uri used on a non-resource-typed property",
        )),
        ObjectToken::String(_) if def.datatype.is_resource() => Err(EngineError::invalid_type(
            def.uri.clone(),
            "insert_statement_with_string used on a resource-typed property",
        )),
        _ => Ok(()),
    }
}

fn object_text(token: &ObjectToken) -> &str {
    match token {
        ObjectToken::Uri(s) | ObjectToken::String(s) | ObjectToken::Bare(s) => s,
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Date(ts) => ts.to_string(),
    }
}

fn parse_timestamp(text: &str, def: &PropertyDef) -> Result<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| EngineError::invalid_type(def.uri.clone(), "invalid date"))?;
        return Ok(midnight.and_utc().timestamp());
    }
    Err(EngineError::invalid_type(
        def.uri.clone(),
        format!("not a valid ISO-8601 date/datetime: '{text}'"),
    ))
}

fn concat_text_values(values: &[Value]) -> String {
    values
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Borrows just the `txn` field, rather than going through a `&self` method,
/// so callers can combine it with a disjoint `&mut self.<other field>`
/// borrow in the same expression.
fn require_txn(txn: &Option<WriteTransaction>) -> Result<&WriteTransaction> {
    txn.as_ref().ok_or_else(|| EngineError::internal("no active transaction"))
}

/// Reads the subject's current `rdf:type` rows and maps each back to a
/// `ClassId` via the class's own resource URI, seeding a new
/// `ResourceBuffer`'s type list.
fn seed_types(txn: &WriteTransaction, ontology: &Ontology, subject_id: ResourceId) -> Result<Vec<ClassId>> {
    let table = txn.open_multimap_table(crate::store::TYPE_TABLE)?;
    let mut types = Vec::new();
    for entry in table.get(subject_id.0)? {
        let entry = entry?;
        let class_resource_id = ResourceId(entry.value());
        if let Some(class_id) = class_for_resource(txn, ontology, class_resource_id)? {
            types.push(class_id);
        }
    }
    Ok(types)
}

fn class_for_resource(txn: &WriteTransaction, ontology: &Ontology, id: ResourceId) -> Result<Option<ClassId>> {
    let root = txn.open_table(ROOT_TABLE)?;
    match root.get(id.0)? {
        Some(bytes) => {
            let row: crate::store::ResourceRow = bincode::deserialize(bytes.value())?;
            Ok(ontology.class_by_uri(&row.uri))
        }
        None => Ok(None),
    }
}

/// Reads a property's current persisted value set for `subject_id` directly
/// from the store (not the staging buffer) — single-valued properties read
/// their column out of the class table's row blob; multi-valued properties
/// read every row of their side table.
fn load_property_values(
    txn: &WriteTransaction,
    ontology: &Ontology,
    subject_id: ResourceId,
    property: PropertyId,
) -> Result<Vec<Value>> {
    let def = ontology.property(property);
    if def.multi {
        let table_name = ontology.multi_table_name(def.domain, property);
        let table = txn.open_multimap_table(multi_value_table(&table_name))?;
        let mut values = Vec::new();
        for entry in table.get(subject_id.0)? {
            let entry = entry?;
            let value: Value = bincode::deserialize(entry.value())?;
            values.push(value);
        }
        Ok(values)
    } else {
        let class_name = ontology.class(def.domain).name.clone();
        let table = txn.open_table(class_table(&class_name))?;
        match table.get(subject_id.0)? {
            Some(bytes) => {
                let row: std::collections::BTreeMap<String, Value> = bincode::deserialize(bytes.value())?;
                Ok(row.get(&def.name).cloned().into_iter().collect())
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ontology::reference_ontology;

    fn open_engine() -> (Engine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(dir.path().join("t.redb"), reference_ontology(), EngineConfig::default()).unwrap();
        (engine, dir)
    }

    #[test]
    fn create_typed_resource_attaches_super_classes() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nfo:Document")
            .unwrap();
        engine.commit().unwrap();

        engine.begin().unwrap();
        let document = engine.ontology().class_by_uri("nfo:Document").unwrap();
        let information_element = engine.ontology().class_by_uri("nie:InformationElement").unwrap();
        assert_eq!(engine.ontology().instance_count(document), 1);
        assert_eq!(engine.ontology().instance_count(information_element), 1);
        engine.rollback().unwrap();
    }

    #[test]
    fn unknown_class_fails_and_clears_buffer() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        let err = engine.insert_statement(None, "http://x/a", "rdf:type", "nope:Missing");
        assert!(err.is_err());
        engine.rollback().unwrap();
    }

    #[test]
    fn unknown_property_fails() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
            .unwrap();
        let err = engine.insert_statement(None, "http://x/a", "nope:missing", "x");
        assert!(err.is_err());
        engine.rollback().unwrap();
    }

    #[test]
    fn single_valued_conflict_is_constraint_error() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
            .unwrap();
        engine
            .insert_statement(None, "http://x/a", "dc:title", "A")
            .unwrap();
        let err = engine.insert_statement(None, "http://x/a", "dc:title", "B");
        assert!(err.is_err());
        engine.rollback().unwrap();
    }

    #[test]
    fn domain_violation_is_constraint_error() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        let err = engine.insert_statement(None, "http://x/a", "dc:title", "A");
        assert!(err.is_err());
        engine.rollback().unwrap();
    }

    #[test]
    fn multi_valued_insert_is_idempotent() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
            .unwrap();
        engine
            .insert_statement_with_uri(None, "http://x/a", "nao:hasTag", "http://x/t1")
            .unwrap();
        engine
            .insert_statement_with_uri(None, "http://x/a", "nao:hasTag", "http://x/t1")
            .unwrap();
        engine
            .insert_statement_with_uri(None, "http://x/a", "nao:hasTag", "http://x/t2")
            .unwrap();
        engine.commit().unwrap();
    }

    #[test]
    fn insert_with_uri_on_literal_property_is_invalid_type() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
            .unwrap();
        let err = engine.insert_statement_with_uri(None, "http://x/a", "dc:title", "http://x/b");
        assert!(err.is_err());
        engine.rollback().unwrap();
    }

    #[test]
    fn super_property_fan_out_sets_both_values() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
            .unwrap();
        engine
            .insert_statement(None, "http://x/a", "nie:title", "hello")
            .unwrap();
        engine.commit().unwrap();
    }

    #[test]
    fn rename_updates_new_subject_field() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
            .unwrap();
        engine
            .insert_statement(None, "http://x/a", "tracker:uri", "http://x/b")
            .unwrap();
        engine.commit().unwrap();
    }

    #[test]
    fn insert_then_delete_within_one_transaction_is_a_no_op() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
            .unwrap();
        engine
            .insert_statement(None, "http://x/a", "dc:title", "A")
            .unwrap();
        engine
            .delete_statement(None, "http://x/a", "dc:title", "A")
            .unwrap();
        engine.commit().unwrap();
    }

    #[test]
    fn delete_resource_description_clears_embedded_but_keeps_annotations() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine
            .insert_statement(None, "http://x/a", "rdf:type", "nfo:Document")
            .unwrap();
        engine
            .insert_statement(None, "http://x/a", "nfo:fileSize", "1024")
            .unwrap();
        engine
            .insert_statement(None, "http://x/a", "dc:title", "user title")
            .unwrap();
        engine.commit().unwrap();

        engine.begin().unwrap();
        engine.delete_resource_description(None, "http://x/a").unwrap();
        engine.commit().unwrap();

        engine.begin().unwrap();
        // fileSize was embedded and cleared, so re-inserting it is not a conflict.
        engine
            .insert_statement(None, "http://x/a", "nfo:fileSize", "2048")
            .unwrap();
        // dc:title was not embedded and survives, so re-inserting a different
        // value is still a single-valued conflict.
        let err = engine.insert_statement(None, "http://x/a", "dc:title", "other");
        assert!(err.is_err());
        engine.rollback().unwrap();
    }

    #[test]
    fn blank_node_materializes_same_uri_across_transactions() {
        let text = "INSERT :b0 rdf:type nao:Tag\nINSERT :b0 nao:prefLabel \"red\"";

        let (mut engine_a, _dir_a) = open_engine();
        engine_a.begin().unwrap();
        let uris_a = engine_a.execute_update_text_returning_blank_nodes(text).unwrap();
        engine_a.commit().unwrap();

        let (mut engine_b, _dir_b) = open_engine();
        engine_b.begin().unwrap();
        let uris_b = engine_b.execute_update_text_returning_blank_nodes(text).unwrap();
        engine_b.commit().unwrap();

        assert_eq!(uris_a, uris_b);
        assert_eq!(uris_a.len(), 1);
    }

    #[test]
    fn blank_node_used_as_object_flushes_and_resolves() {
        let text = "INSERT http://x/a rdf:type nie:InformationElement\n\
                     INSERT :b0 rdf:type nao:Tag\n\
                     INSERT http://x/a nao:hasTag :b0";

        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine.execute_update_text(text).unwrap();
        engine.commit().unwrap();

        let info_element = engine.ontology().class_by_uri("nie:InformationElement").unwrap();
        let tag = engine.ontology().class_by_uri("nao:Tag").unwrap();
        assert_eq!(engine.ontology().instance_count(info_element), 1);
        assert_eq!(engine.ontology().instance_count(tag), 1);
    }
}
