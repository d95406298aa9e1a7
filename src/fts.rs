//! Minimal full-text index, simulating the init/text/commit/rollback
//! contract the real subsystem is assumed to expose (out of scope; see
//! crate docs). Kept in-process and in-memory — there is no on-disk index
//! format here, only the staging/commit protocol the flush engine drives.

use std::collections::HashMap;

use crate::ontology::PropertyId;
use crate::types::ResourceId;

/// Staged, then committed, `(resource, property) -> text` entries.
#[derive(Default, Debug)]
pub struct FtsIndex {
    committed: HashMap<(ResourceId, PropertyId), String>,
    pending: HashMap<(ResourceId, PropertyId), Option<String>>,
}

impl FtsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a staging window for the current transaction. Called once per
    /// `begin()`, mirroring the external index's own transaction lifecycle.
    pub fn init(&mut self) {
        self.pending.clear();
    }

    /// Stages the current text for a property's value set (its current
    /// values joined space-separated). Called once per `(resource,
    /// property)` per flush.
    pub fn stage_text(&mut self, resource_id: ResourceId, property: PropertyId, text: String) {
        self.pending.insert((resource_id, property), Some(text));
    }

    /// Stages removal of a property's indexed text, used for the
    /// preload-then-clear step on first touch of an fts-indexed property on
    /// an existing subject.
    pub fn stage_removal(&mut self, resource_id: ResourceId, property: PropertyId) {
        self.pending.insert((resource_id, property), None);
    }

    /// Applies staged entries durably. Called once after all resources in a
    /// transaction have flushed, if any fts update happened.
    pub fn commit(&mut self) {
        for (key, value) in self.pending.drain() {
            match value {
                Some(text) => {
                    self.committed.insert(key, text);
                }
                None => {
                    self.committed.remove(&key);
                }
            }
        }
    }

    /// Discards staged entries without applying them.
    pub fn rollback(&mut self) {
        self.pending.clear();
    }

    /// Returns the committed text for a resource/property pair, for tests.
    pub fn text_for(&self, resource_id: ResourceId, property: PropertyId) -> Option<&str> {
        self.committed.get(&(resource_id, property)).map(String::as_str)
    }

    /// True if anything is currently staged — the flush engine only calls
    /// `commit()` when this holds.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_text_applies_on_commit() {
        let mut fts = FtsIndex::new();
        fts.init();
        fts.stage_text(ResourceId(1), PropertyId(0), "hello world".into());
        assert!(fts.text_for(ResourceId(1), PropertyId(0)).is_none());
        fts.commit();
        assert_eq!(fts.text_for(ResourceId(1), PropertyId(0)), Some("hello world"));
    }

    #[test]
    fn rollback_discards_staged_entries() {
        let mut fts = FtsIndex::new();
        fts.init();
        fts.stage_text(ResourceId(1), PropertyId(0), "hello".into());
        fts.rollback();
        fts.commit();
        assert!(fts.text_for(ResourceId(1), PropertyId(0)).is_none());
    }

    #[test]
    fn removal_clears_committed_text() {
        let mut fts = FtsIndex::new();
        fts.init();
        fts.stage_text(ResourceId(1), PropertyId(0), "hello".into());
        fts.commit();
        fts.init();
        fts.stage_removal(ResourceId(1), PropertyId(0));
        fts.commit();
        assert!(fts.text_for(ResourceId(1), PropertyId(0)).is_none());
    }
}
