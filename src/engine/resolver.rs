//! Resource ID Resolver: URI ⇄ integer id, with an in-transaction cache
//! layered over the backing store.
//!
//! Ids and modseqs are allocated from process-wide `AtomicU32` counters,
//! seeded once at [`Engine::open`](super::Engine::open) from a scan of the
//! existing store — safe because there is exactly one writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use redb::{ReadableTable, WriteTransaction};

use super::unix_now;

use crate::error::Result;
use crate::store::{ResourceRow, ROOT_TABLE, URI_INDEX_TABLE};
use crate::types::{ModSeq, ResourceId};

/// Returns an existing resource id for `uri`, or [`ResourceId::NONE`] if it
/// has never been seen. Consults `cache` first, then the store.
pub fn resolve(
    txn: &WriteTransaction,
    cache: &mut HashMap<String, ResourceId>,
    uri: &str,
) -> Result<ResourceId> {
    if let Some(id) = cache.get(uri) {
        return Ok(*id);
    }
    let table = txn.open_table(URI_INDEX_TABLE)?;
    let id = match table.get(uri)? {
        Some(value) => ResourceId(value.value()),
        None => ResourceId::NONE,
    };
    if !id.is_none() {
        cache.insert(uri.to_string(), id);
    }
    Ok(id)
}

/// Returns the existing resource id for `uri`, creating a new
/// `rdfs:Resource` row if absent. Caches the result either way.
pub fn ensure(
    txn: &WriteTransaction,
    cache: &mut HashMap<String, ResourceId>,
    id_counter: &AtomicU32,
    modseq_counter: &AtomicU32,
    uri: &str,
) -> Result<ResourceId> {
    let existing = resolve(txn, cache, uri)?;
    if !existing.is_none() {
        return Ok(existing);
    }

    let id = ResourceId(id_counter.fetch_add(1, Ordering::SeqCst) + 1);
    let modseq = next_modseq(modseq_counter);
    let now = unix_now();

    {
        let mut root = txn.open_table(ROOT_TABLE)?;
        let row = ResourceRow {
            uri: uri.to_string(),
            added: now,
            modified: modseq.0,
            available: true,
        };
        let bytes = bincode::serialize(&row)?;
        root.insert(id.0, bytes.as_slice())?;
    }
    {
        let mut index = txn.open_table(URI_INDEX_TABLE)?;
        index.insert(uri, id.0)?;
    }

    cache.insert(uri.to_string(), id);
    Ok(id)
}

/// Allocates the next modseq, stamped as `tracker:modified` on every
/// resource touched in a transaction.
pub fn next_modseq(modseq_counter: &AtomicU32) -> ModSeq {
    ModSeq(modseq_counter.fetch_add(1, Ordering::SeqCst) + 1)
}

/// Updates `tracker:modified` and, if `new_uri` is set, `Uri`/the reverse
/// index for `id` — the rename itself plus the modseq stamp.
pub fn touch(
    txn: &WriteTransaction,
    cache: &mut HashMap<String, ResourceId>,
    id: ResourceId,
    modseq: ModSeq,
    new_uri: Option<&str>,
) -> Result<()> {
    let mut root = txn.open_table(ROOT_TABLE)?;
    let mut row: ResourceRow = match root.get(id.0)? {
        Some(bytes) => bincode::deserialize(bytes.value())?,
        None => {
            return Err(crate::error::EngineError::internal(format!(
                "touch: resource {id} has no root row"
            )))
        }
    };
    row.modified = modseq.0;
    let old_uri = row.uri.clone();
    if let Some(new_uri) = new_uri {
        row.uri = new_uri.to_string();
    }
    let bytes = bincode::serialize(&row)?;
    root.insert(id.0, bytes.as_slice())?;
    drop(root);

    if let Some(new_uri) = new_uri {
        let mut index = txn.open_table(URI_INDEX_TABLE)?;
        index.remove(old_uri.as_str())?;
        index.insert(new_uri, id.0)?;
        drop(index);
        cache.remove(&old_uri);
        cache.insert(new_uri.to_string(), id);
    }
    Ok(())
}

/// Directly flips the `Available` bit on `id`'s root row. This lives on
/// `rdfs:Resource` itself rather than behind any ontology property, so
/// volume management touches it straight through the resolver rather than
/// the statement API.
pub fn set_available(txn: &WriteTransaction, id: ResourceId, available: bool) -> Result<()> {
    let mut root = txn.open_table(ROOT_TABLE)?;
    let mut row: ResourceRow = match root.get(id.0)? {
        Some(bytes) => bincode::deserialize(bytes.value())?,
        None => {
            return Err(crate::error::EngineError::internal(format!(
                "set_available: resource {id} has no root row"
            )))
        }
    };
    row.available = available;
    let bytes = bincode::serialize(&row)?;
    root.insert(id.0, bytes.as_slice())?;
    Ok(())
}

/// Scans `ROOT_TABLE` for the current maximum id and modseq, used once at
/// [`Engine::open`](super::Engine::open) to seed the process-wide counters.
pub fn seed_counters(txn: &redb::ReadTransaction) -> Result<(u32, u32)> {
    let table = match txn.open_table(ROOT_TABLE) {
        Ok(table) => table,
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok((0, 0)),
        Err(e) => return Err(e.into()),
    };
    let mut max_id = 0u32;
    let mut max_modseq = 0u32;
    for entry in table.iter()? {
        let (key, value) = entry?;
        max_id = max_id.max(key.value());
        let row: ResourceRow = bincode::deserialize(value.value())?;
        max_modseq = max_modseq.max(row.modified);
    }
    Ok((max_id, max_modseq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SCHEMA_VERSION;

    #[test]
    fn schema_version_is_one() {
        assert_eq!(SCHEMA_VERSION, 1);
    }

    #[test]
    fn ensure_then_resolve_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db = redb::Database::create(dir.path().join("t.redb")).unwrap();
        let txn = db.begin_write().unwrap();
        let mut cache = HashMap::new();
        let id_counter = AtomicU32::new(0);
        let modseq_counter = AtomicU32::new(0);
        let id = ensure(&txn, &mut cache, &id_counter, &modseq_counter, "http://x/a").unwrap();
        assert!(!id.is_none());
        let resolved = resolve(&txn, &mut cache, "http://x/a").unwrap();
        assert_eq!(resolved, id);
        let again = ensure(&txn, &mut cache, &id_counter, &modseq_counter, "http://x/a").unwrap();
        assert_eq!(again, id);
    }

    #[test]
    fn touch_renames_uri_and_updates_index() {
        let dir = tempfile::tempdir().unwrap();
        let db = redb::Database::create(dir.path().join("t.redb")).unwrap();
        let txn = db.begin_write().unwrap();
        let mut cache = HashMap::new();
        let id_counter = AtomicU32::new(0);
        let modseq_counter = AtomicU32::new(0);
        let id = ensure(&txn, &mut cache, &id_counter, &modseq_counter, "http://x/a").unwrap();
        let modseq = next_modseq(&modseq_counter);
        touch(&txn, &mut cache, id, modseq, Some("http://x/b")).unwrap();
        assert!(resolve(&txn, &mut cache, "http://x/a").unwrap().is_none());
        assert_eq!(resolve(&txn, &mut cache, "http://x/b").unwrap(), id);
    }
}
