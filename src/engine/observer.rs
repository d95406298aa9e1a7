//! Observer Registry: four append-only, synchronous, registration-order
//! callback lists.

use crate::ontology::ClassId;

/// Payload delivered to insert/delete observers, after the decomposer has
/// successfully staged the change.
#[derive(Clone, Debug)]
pub struct ObserverEvent<'a> {
    pub graph: Option<&'a str>,
    pub subject: &'a str,
    pub predicate: &'a str,
    pub object: &'a str,
    pub current_types: &'a [ClassId],
}

/// A registered callback. Observers must not re-enter the engine with
/// mutating operations — this is a documented caller contract, not
/// something the registry enforces at the type level.
pub type Observer = Box<dyn FnMut(&ObserverEvent) + Send>;

/// Four independent, append-only observer lists.
#[derive(Default)]
pub struct ObserverRegistry {
    inserts: Vec<Observer>,
    deletes: Vec<Observer>,
    commits: Vec<Box<dyn FnMut() + Send>>,
    rollbacks: Vec<Box<dyn FnMut() + Send>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_insert(&mut self, observer: Observer) {
        self.inserts.push(observer);
    }

    pub fn on_delete(&mut self, observer: Observer) {
        self.deletes.push(observer);
    }

    pub fn on_commit(&mut self, observer: Box<dyn FnMut() + Send>) {
        self.commits.push(observer);
    }

    pub fn on_rollback(&mut self, observer: Box<dyn FnMut() + Send>) {
        self.rollbacks.push(observer);
    }

    pub fn fire_insert(&mut self, event: &ObserverEvent) {
        for observer in &mut self.inserts {
            observer(event);
        }
    }

    pub fn fire_delete(&mut self, event: &ObserverEvent) {
        for observer in &mut self.deletes {
            observer(event);
        }
    }

    pub fn fire_commit(&mut self) {
        for observer in &mut self.commits {
            observer();
        }
    }

    pub fn fire_rollback(&mut self) {
        for observer in &mut self.rollbacks {
            observer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn observers_fire_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        let o1 = order.clone();
        registry.on_insert(Box::new(move |_| o1.lock().unwrap().push(1)));
        let o2 = order.clone();
        registry.on_insert(Box::new(move |_| o2.lock().unwrap().push(2)));
        let event = ObserverEvent {
            graph: None,
            subject: "http://x/a",
            predicate: "rdf:type",
            object: "nie:InformationElement",
            current_types: &[],
        };
        registry.fire_insert(&event);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn commit_and_rollback_observers_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = ObserverRegistry::new();
        let c = count.clone();
        registry.on_commit(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        registry.fire_commit();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
