//! Integration tests for the statement API's concrete write-path scenarios:
//! typed-resource creation, single-valued conflicts, multi-valued dedup,
//! blank-node sharing, and rename via `tracker:uri`.

use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use tracker_update_engine::{ontology::reference_ontology, Engine, EngineConfig, EngineError};

fn open_engine() -> (Engine, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let engine = Engine::open(dir.path().join("store.redb"), reference_ontology(), EngineConfig::default()).unwrap();
    (engine, dir)
}

// ============================================================================
// Scenario 1: create typed resource
// ============================================================================

#[test]
fn create_typed_resource_reaches_super_class_closure() {
    let (mut engine, _dir) = open_engine();
    let document = engine.ontology().class_by_uri("nfo:Document").unwrap();
    let info_element = engine.ontology().class_by_uri("nie:InformationElement").unwrap();

    engine.begin().unwrap();
    engine
        .insert_statement(None, "http://x/a", "rdf:type", "nfo:Document")
        .unwrap();
    engine.commit().unwrap();

    // nfo:Document's super-class nie:InformationElement also gained an
    // instance, even though only the leaf type was inserted.
    assert_eq!(engine.ontology().instance_count(document), 1);
    assert_eq!(engine.ontology().instance_count(info_element), 1);
}

// ============================================================================
// Scenario 2: single-valued conflict
// ============================================================================

#[test]
fn single_valued_conflict_rejects_second_value() {
    let (mut engine, _dir) = open_engine();
    engine.begin().unwrap();
    engine
        .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
        .unwrap();
    engine
        .insert_statement(None, "http://x/a", "nie:title", "A")
        .unwrap();
    let err = engine.insert_statement(None, "http://x/a", "nie:title", "B");
    assert!(matches!(err, Err(EngineError::Constraint(_))));
    engine.rollback().unwrap();
}

// ============================================================================
// Scenario 3: multi-valued dedup
// ============================================================================

#[test]
fn multi_valued_property_deduplicates_repeated_inserts() {
    let (mut engine, _dir) = open_engine();
    let insert_count = Arc::new(Mutex::new(0usize));
    let insert_count_writer = insert_count.clone();
    engine.on_insert(Box::new(move |event| {
        if event.predicate == "nao:hasTag" {
            *insert_count_writer.lock().unwrap() += 1;
        }
    }));

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

    // The repeated t1 insert did not fire a second observer event.
    assert_eq!(*insert_count.lock().unwrap(), 2);
}

// ============================================================================
// Scenario 4: blank-node sharing
// ============================================================================

#[test]
fn blank_node_materializes_same_uri_across_separate_transactions() {
    let (mut engine, _dir) = open_engine();

    engine.begin().unwrap();
    engine
        .insert_statement(None, ":b0", "rdf:type", "nao:Tag")
        .unwrap();
    engine
        .insert_statement(None, ":b0", "nao:prefLabel", "red")
        .unwrap();
    engine.commit().unwrap();

    engine.begin().unwrap();
    engine
        .insert_statement(None, ":b0", "rdf:type", "nao:Tag")
        .unwrap();
    engine
        .insert_statement(None, ":b0", "nao:prefLabel", "red")
        .unwrap();
    engine.commit().unwrap();

    let tag = engine.ontology().class_by_uri("nao:Tag").unwrap();
    // Both transactions resolved to the same materialized resource, so the
    // instance count for nao:Tag is 1, not 2.
    assert_eq!(engine.ontology().instance_count(tag), 1);
}

// ============================================================================
// Scenario 5: rename via tracker:uri
// ============================================================================

#[test]
fn rename_updates_uri_for_the_same_resource() {
    let (mut engine, _dir) = open_engine();
    engine.begin().unwrap();
    engine
        .insert_statement(None, "http://x/a", "rdf:type", "nie:InformationElement")
        .unwrap();
    engine.commit().unwrap();

    engine.begin().unwrap();
    engine
        .insert_statement(None, "http://x/a", "tracker:uri", "http://x/b")
        .unwrap();
    engine.commit().unwrap();

    // The old URI no longer names a resource; a fresh insert against it
    // starts a brand-new subject rather than reusing the renamed one.
    engine.begin().unwrap();
    engine
        .insert_statement(None, "http://x/a", "rdf:type", "nao:Tag")
        .unwrap();
    engine.commit().unwrap();

    let info_element = engine.ontology().class_by_uri("nie:InformationElement").unwrap();
    let tag = engine.ontology().class_by_uri("nao:Tag").unwrap();
    assert_eq!(engine.ontology().instance_count(info_element), 1);
    assert_eq!(engine.ontology().instance_count(tag), 1);
}
