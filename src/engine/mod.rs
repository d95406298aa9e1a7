//! The Engine: transaction state machine, public statement API, and the
//! glue between the Resource ID Resolver, Update Buffer, Ontology
//! Decomposer, Blank-Node Buffer, Flush/Commit Engine, and Observer
//! Registry.

mod blank;
mod buffer;
mod decomposer;
mod flush;
mod observer;
mod resolver;
mod volume;

pub use observer::{Observer, ObserverEvent};

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, Savepoint, WriteTransaction};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result, StorageError};
use crate::ontology::Ontology;
use crate::sparql_text::{self, ObjectToken};
use crate::store::{
    EngineMetadata, METADATA_KEY, METADATA_TABLE, ROOT_TABLE, SCHEMA_VERSION, TYPE_TABLE,
    URI_INDEX_TABLE,
};
use crate::types::ResourceId;

use blank::BlankNodeBuffer;
use buffer::UpdateBuffer;
use observer::ObserverRegistry;

/// Insert or delete, the two mutating entry points every statement goes
/// through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Insert,
    Delete,
}

/// Transaction state machine: `Idle -> InTxn -> (Committing|RollingBack) ->
/// Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    InTxn,
    Committing,
    RollingBack,
}

/// The write-path engine. Single-threaded and cooperative: mutating
/// operations take `&mut self`, and there is exactly one active transaction
/// at a time.
pub struct Engine {
    db: Database,
    ontology: Ontology,
    #[allow(dead_code)] // retained for reopen/tuning; redb manages its own cache
    config: EngineConfig,
    state: TransactionState,
    txn: Option<WriteTransaction>,
    sparql_savepoint: Option<Savepoint>,
    id_counter: AtomicU32,
    modseq_counter: AtomicU32,
    resource_cache: HashMap<String, ResourceId>,
    buffer: UpdateBuffer,
    blank: BlankNodeBuffer,
    observers: ObserverRegistry,
    fts: crate::fts::FtsIndex,
}

impl Engine {
    /// Opens or creates the database at `path`, seeding the resource id and
    /// modseq counters from the existing store.
    #[instrument(skip(ontology, config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, ontology: Ontology, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let db = Database::create(path.as_ref())?;

        {
            let write = db.begin_write()?;
            {
                let _ = write.open_table(ROOT_TABLE)?;
                let _ = write.open_table(URI_INDEX_TABLE)?;
                let _ = write.open_multimap_table(TYPE_TABLE)?;
                let mut metadata_table = write.open_table(METADATA_TABLE)?;
                match metadata_table.get(METADATA_KEY)? {
                    None => {
                        let metadata = EngineMetadata::new(unix_now());
                        let bytes = bincode::serialize(&metadata)?;
                        metadata_table.insert(METADATA_KEY, bytes.as_slice())?;
                        debug!("initialized new engine metadata");
                    }
                    Some(bytes) => {
                        let existing: EngineMetadata = bincode::deserialize(bytes.value())?;
                        if existing.schema_version != SCHEMA_VERSION {
                            warn!(
                                expected = SCHEMA_VERSION,
                                found = existing.schema_version,
                                "schema version mismatch"
                            );
                            return Err(EngineError::Storage(StorageError::SchemaVersionMismatch {
                                expected: SCHEMA_VERSION,
                                found: existing.schema_version,
                            }));
                        }
                    }
                }
            }
            write.commit()?;
        }

        let (max_id, max_modseq) = {
            let read = db.begin_read()?;
            resolver::seed_counters(&read)?
        };
        info!(max_id, max_modseq, "engine opened");

        Ok(Self {
            db,
            ontology,
            config,
            state: TransactionState::Idle,
            txn: None,
            sparql_savepoint: None,
            id_counter: AtomicU32::new(max_id),
            modseq_counter: AtomicU32::new(max_modseq),
            resource_cache: HashMap::new(),
            buffer: UpdateBuffer::new(),
            blank: BlankNodeBuffer::new(),
            observers: ObserverRegistry::new(),
            fts: crate::fts::FtsIndex::new(),
        })
    }

    /// Returns the ontology this engine was opened with.
    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Registers an insert observer. Append-only: there is no way to
    /// unregister.
    pub fn on_insert(&mut self, observer: Observer) {
        self.observers.on_insert(observer);
    }

    /// Registers a delete observer.
    pub fn on_delete(&mut self, observer: Observer) {
        self.observers.on_delete(observer);
    }

    /// Registers a commit observer.
    pub fn on_commit(&mut self, observer: Box<dyn FnMut() + Send>) {
        self.observers.on_commit(observer);
    }

    /// Registers a rollback observer.
    pub fn on_rollback(&mut self, observer: Box<dyn FnMut() + Send>) {
        self.observers.on_rollback(observer);
    }

    /// Begins a new transaction. Valid only from `Idle`.
    #[instrument(skip(self))]
    pub fn begin(&mut self) -> Result<()> {
        self.require_state(TransactionState::Idle)?;
        let txn = self.db.begin_write()?;
        self.txn = Some(txn);
        self.state = TransactionState::InTxn;
        self.fts.init();
        Ok(())
    }

    /// Commits the active transaction: flushes every staged resource in
    /// dependency order, synchronizes the fts index, closes the backing
    /// transaction, clears buffers, and fires commit observers.
    #[instrument(skip(self))]
    pub fn commit(&mut self) -> Result<()> {
        self.require_state(TransactionState::InTxn)?;
        self.state = TransactionState::Committing;

        self.blank_flush_remaining()?;
        self.flush_all()?;

        let txn = self
            .txn
            .take()
            .ok_or_else(|| EngineError::internal("commit: no active transaction"))?;
        txn.commit()?;

        self.buffer.clear();
        self.blank.clear();
        self.sparql_savepoint = None;
        self.state = TransactionState::Idle;
        self.observers.fire_commit();
        Ok(())
    }

    /// Discards all buffers, aborts the backing transaction, calls
    /// `fts_rollback`, and fires rollback observers.
    #[instrument(skip(self))]
    pub fn rollback(&mut self) -> Result<()> {
        self.require_state(TransactionState::InTxn)?;
        self.state = TransactionState::RollingBack;

        if let Some(txn) = self.txn.take() {
            txn.abort()?;
        }
        self.buffer.clear();
        self.blank.clear();
        self.resource_cache.clear();
        self.sparql_savepoint = None;
        self.fts.rollback();

        self.state = TransactionState::Idle;
        self.observers.fire_rollback();
        Ok(())
    }

    fn require_state(&self, expected: TransactionState) -> Result<()> {
        if self.state != expected {
            return Err(EngineError::internal(format!(
                "invalid transaction state: expected {expected:?}, found {:?}",
                self.state
            )));
        }
        Ok(())
    }

    /// `insert_statement`: auto-dispatches between resource-object and
    /// literal-object handling by consulting the ontology datatype.
    pub fn insert_statement(
        &mut self,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<()> {
        self.statement(Op::Insert, graph, subject, predicate, ObjectToken::Bare(object.to_string()))
    }

    /// `insert_statement_with_uri`: bypasses dispatch, enforces the
    /// property's datatype is `resource`.
    pub fn insert_statement_with_uri(
        &mut self,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<()> {
        self.statement(Op::Insert, graph, subject, predicate, ObjectToken::Uri(object.to_string()))
    }

    /// `insert_statement_with_string`: bypasses dispatch, enforces the
    /// property's datatype is not `resource`.
    pub fn insert_statement_with_string(
        &mut self,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<()> {
        self.statement(Op::Insert, graph, subject, predicate, ObjectToken::String(object.to_string()))
    }

    /// `delete_statement`: mirrors `insert_statement`'s auto-dispatch.
    pub fn delete_statement(
        &mut self,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<()> {
        self.statement(Op::Delete, graph, subject, predicate, ObjectToken::Bare(object.to_string()))
    }

    fn statement(
        &mut self,
        op: Op,
        graph: Option<&str>,
        subject: &str,
        predicate: &str,
        object: ObjectToken,
    ) -> Result<()> {
        self.require_state(TransactionState::InTxn)?;
        let result = self.decompose(op, graph, subject, predicate, object);
        if result.is_err() {
            // A decomposer error clears the update buffer, discarding
            // pending staged changes for every subject in this transaction,
            // not just the offending one.
            self.buffer.clear();
        }
        result
    }

    /// Parses and executes a tiny line-oriented update-text dialect (see
    /// [`crate::sparql_text`]), wrapped in a `sparql` savepoint: on failure,
    /// the update buffer is cleared, the savepoint is restored, rollback
    /// observers fire, and the outer transaction stays live; on success the
    /// savepoint is released. Nested savepoints are not supported — a
    /// second call while one is outstanding fails fast.
    #[instrument(skip(self, text))]
    pub fn execute_update_text(&mut self, text: &str) -> Result<()> {
        self.execute_update_text_returning_blank_nodes(text).map(|_| ())
    }

    /// As [`Engine::execute_update_text`], additionally returning the
    /// materialized blank-node URIs produced during execution.
    pub fn execute_update_text_returning_blank_nodes(&mut self, text: &str) -> Result<Vec<String>> {
        self.require_state(TransactionState::InTxn)?;
        if self.sparql_savepoint.is_some() {
            return Err(EngineError::internal("nested sparql savepoints are not supported"));
        }

        let statements = sparql_text::parse(text)?;
        let before = self.blank.materialized_labels();

        let savepoint = {
            let txn = self.active_txn_mut()?;
            txn.ephemeral_savepoint()?
        };
        self.sparql_savepoint = Some(savepoint);

        let mut failed = None;
        for stmt in statements {
            let op = match stmt.op {
                sparql_text::Op::Insert => Op::Insert,
                sparql_text::Op::Delete => Op::Delete,
            };
            let result = self.decompose(op, stmt.graph.as_deref(), &stmt.subject, &stmt.predicate, stmt.object);
            if let Err(e) = result {
                failed = Some(e);
                break;
            }
        }

        if failed.is_none() {
            if let Err(e) = self.blank_flush_remaining() {
                failed = Some(e);
            }
        }

        match failed {
            None => {
                let savepoint = self.sparql_savepoint.take();
                drop(savepoint);
                Ok(self.blank.materialized_since(&before))
            }
            Some(err) => {
                self.buffer.clear();
                if let Some(savepoint) = self.sparql_savepoint.take() {
                    let txn = self.active_txn_mut()?;
                    txn.restore_savepoint(&savepoint)?;
                }
                self.observers.fire_rollback();
                Err(err)
            }
        }
    }

    fn active_txn(&self) -> Result<&WriteTransaction> {
        self.txn.as_ref().ok_or_else(|| EngineError::internal("no active transaction"))
    }

    fn active_txn_mut(&mut self) -> Result<&mut WriteTransaction> {
        self.txn.as_mut().ok_or_else(|| EngineError::internal("no active transaction"))
    }
}

pub(crate) fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::reference_ontology;

    fn open_engine() -> (Engine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(dir.path().join("t.redb"), reference_ontology(), EngineConfig::default()).unwrap();
        (engine, dir)
    }

    #[test]
    fn begin_requires_idle_state() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        assert!(engine.begin().is_err());
    }

    #[test]
    fn commit_requires_active_transaction() {
        let (mut engine, _dir) = open_engine();
        assert!(engine.commit().is_err());
    }

    #[test]
    fn state_returns_to_idle_after_commit() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine.commit().unwrap();
        assert_eq!(engine.state(), TransactionState::Idle);
    }

    #[test]
    fn state_returns_to_idle_after_rollback() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine.rollback().unwrap();
        assert_eq!(engine.state(), TransactionState::Idle);
    }
}
