//! Volume management: fixed update templates over a reserved
//! `tracker:Volume` vocabulary, plus direct `Available` flag maintenance on
//! `rdfs:Resource` (the flag lives on the root resource row itself, not
//! behind any ontology property).

use redb::{ReadableMultimapTable, ReadableTable, WriteTransaction};

use crate::error::{EngineError, Result};
use crate::store::{ResourceRow, ROOT_TABLE, TYPE_TABLE};
use crate::types::ResourceId;

use super::{resolver, Engine};

impl Engine {
    /// Marks `udi` as a mounted volume at `mount_path`: types it
    /// `tracker:Volume`, records the mount point, sets `tracker:isMounted`
    /// true, and flags the volume resource itself available.
    pub fn enable_volume(&mut self, udi: &str, mount_path: &str) -> Result<()> {
        self.insert_statement(None, udi, "rdf:type", "tracker:Volume")?;
        self.insert_statement(None, udi, "tracker:mountPoint", mount_path)?;
        self.set_mounted(udi, true)?;
        self.set_available(udi, true)
    }

    /// Marks `udi` unmounted and unavailable. Resources the volume hosts are
    /// not touched here: deriving their availability transitively from the
    /// volume is a read-path concern this engine does not implement.
    pub fn disable_volume(&mut self, udi: &str) -> Result<()> {
        self.set_mounted(udi, false)?;
        self.set_available(udi, false)
    }

    /// Resets a volume resource already known by URI back to the
    /// unmounted/unavailable state, e.g. at startup before the crawler has
    /// re-reported which volumes are actually present.
    pub fn reset_volume(&mut self, uri: &str) -> Result<()> {
        self.set_mounted(uri, false)?;
        self.set_available(uri, false)
    }

    /// Disables every resource currently typed `tracker:Volume`. Used once
    /// at startup, before individual volumes are re-enabled as the crawler
    /// reports them mounted.
    pub fn disable_all_volumes(&mut self) -> Result<()> {
        let volume_class = match self.ontology().class_by_uri("tracker:Volume") {
            Some(class) => class,
            None => return Ok(()),
        };
        let class_uri = self.ontology().class(volume_class).uri.clone();

        let class_resource_id = {
            let txn = require_txn(&self.txn)?;
            resolver::resolve(txn, &mut self.resource_cache, &class_uri)?
        };
        if class_resource_id.is_none() {
            return Ok(());
        }

        let uris = {
            let txn = require_txn(&self.txn)?;
            volume_uris(txn, class_resource_id)?
        };

        for uri in uris {
            self.disable_volume(&uri)?;
        }
        Ok(())
    }

    /// Sets `tracker:isMounted` to exactly `mounted`, regardless of its
    /// current value: clears both possible booleans (a no-op for whichever
    /// one isn't present) then inserts the target value.
    fn set_mounted(&mut self, uri: &str, mounted: bool) -> Result<()> {
        self.delete_statement(None, uri, "tracker:isMounted", "true")?;
        self.delete_statement(None, uri, "tracker:isMounted", "false")?;
        self.insert_statement(None, uri, "tracker:isMounted", if mounted { "true" } else { "false" })
    }

    fn set_available(&mut self, uri: &str, available: bool) -> Result<()> {
        let id = {
            let txn = require_txn(&self.txn)?;
            resolver::ensure(
                txn,
                &mut self.resource_cache,
                &self.id_counter,
                &self.modseq_counter,
                uri,
            )?
        };
        let txn = require_txn(&self.txn)?;
        resolver::set_available(txn, id, available)
    }
}

fn require_txn(txn: &Option<WriteTransaction>) -> Result<&WriteTransaction> {
    txn.as_ref().ok_or_else(|| EngineError::internal("no active transaction"))
}

/// Every resource's URI currently recorded against `class_resource_id` in
/// `rdfs:Resource_rdf:type`, found by a full scan (volume counts are small
/// and this runs rarely, at startup).
fn volume_uris(txn: &WriteTransaction, class_resource_id: ResourceId) -> Result<Vec<String>> {
    let subjects = {
        let table = txn.open_multimap_table(TYPE_TABLE)?;
        let mut subjects = Vec::new();
        for entry in table.iter()? {
            let (key, values) = entry?;
            for value in values {
                let value = value?;
                if value.value() == class_resource_id.0 {
                    subjects.push(ResourceId(key.value()));
                    break;
                }
            }
        }
        subjects
    };

    let root = txn.open_table(ROOT_TABLE)?;
    let mut uris = Vec::with_capacity(subjects.len());
    for subject in subjects {
        if let Some(bytes) = root.get(subject.0)? {
            let row: ResourceRow = bincode::deserialize(bytes.value())?;
            uris.push(row.uri);
        }
    }
    Ok(uris)
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
    fn enable_then_disable_volume_round_trips() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine.enable_volume("udi:1", "/media/disk").unwrap();
        engine.disable_volume("udi:1").unwrap();
        engine.commit().unwrap();
    }

    #[test]
    fn disable_all_volumes_covers_every_enabled_volume() {
        let (mut engine, _dir) = open_engine();
        engine.begin().unwrap();
        engine.enable_volume("udi:1", "/media/a").unwrap();
        engine.enable_volume("udi:2", "/media/b").unwrap();
        engine.disable_all_volumes().unwrap();
        engine.commit().unwrap();
    }
}
