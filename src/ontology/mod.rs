//! The ontology: classes, properties, datatypes, and their transitive
//! super-class/super-property closures.
//!
//! Registration happens once, in Rust, via [`OntologyBuilder`] — there is no
//! dynamic schema loading (out of scope; see crate docs). A small reference
//! ontology ships in [`builtin`] and is exposed as [`reference_ontology`].

mod builtin;

pub use builtin::reference_ontology;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{EngineError, Result};

/// Index of a [`ClassDef`] within an [`Ontology`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub u32);

/// Index of a [`PropertyDef`] within an [`Ontology`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(pub u32);

/// Datatype a literal-valued property's object is coerced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Datatype {
    String,
    Integer,
    Boolean,
    Double,
    Date,
    DateTime,
    /// Object is a URI; the stored value is the resolved resource id.
    Resource,
}

impl Datatype {
    /// True for `Resource`, the only datatype `insert_statement_with_uri`
    /// accepts.
    pub fn is_resource(&self) -> bool {
        matches!(self, Datatype::Resource)
    }
}

/// An ontology class: a relational table (by `name`) plus its super-class
/// chain and live instance count.
#[derive(Clone, Debug)]
pub struct ClassDef {
    pub uri: String,
    /// Relational table name for this class, e.g. `nie_InformationElement`.
    pub name: String,
    direct_super: Vec<ClassId>,
    /// Transitive super-classes, depth-first, each appearing once.
    super_closure: Vec<ClassId>,
}

impl ClassDef {
    pub fn super_classes(&self) -> &[ClassId] {
        &self.super_closure
    }
}

/// An ontology property: a column (single-valued) or side table
/// (multi-valued) of its domain class.
#[derive(Clone, Debug)]
pub struct PropertyDef {
    pub uri: String,
    /// Column name (single-valued) or side-table suffix (multi-valued).
    pub name: String,
    pub domain: ClassId,
    pub datatype: Datatype,
    pub multi: bool,
    pub fts: bool,
    pub embedded: bool,
    direct_super: Vec<PropertyId>,
    /// Transitive super-properties, depth-first, each appearing once.
    super_closure: Vec<PropertyId>,
}

impl PropertyDef {
    pub fn super_properties(&self) -> &[PropertyId] {
        &self.super_closure
    }
}

/// Side table name for the type-membership multimap.
pub const TYPE_TABLE_NAME: &str = "rdfs:Resource_rdf:type";

/// The virtual rename predicate — not a registered property.
pub const RENAME_PREDICATE: &str = "tracker:uri";

/// The type-assertion predicate — not a registered property.
pub const RDF_TYPE_PREDICATE: &str = "rdf:type";

/// The ontology: classes and properties plus their precomputed transitive
/// closures, built once at engine construction.
pub struct Ontology {
    classes: Vec<ClassDef>,
    properties: Vec<PropertyDef>,
    class_by_uri: HashMap<String, ClassId>,
    property_by_uri: HashMap<String, PropertyId>,
    instance_counts: Vec<AtomicU64>,
}

impl Ontology {
    pub fn builder() -> OntologyBuilder {
        OntologyBuilder::default()
    }

    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.0 as usize]
    }

    pub fn property(&self, id: PropertyId) -> &PropertyDef {
        &self.properties[id.0 as usize]
    }

    pub fn class_by_uri(&self, uri: &str) -> Option<ClassId> {
        self.class_by_uri.get(uri).copied()
    }

    pub fn property_by_uri(&self, uri: &str) -> Option<PropertyId> {
        self.property_by_uri.get(uri).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDef)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(i as u32), c))
    }

    pub fn properties(&self) -> impl Iterator<Item = (PropertyId, &PropertyDef)> {
        self.properties
            .iter()
            .enumerate()
            .map(|(i, p)| (PropertyId(i as u32), p))
    }

    /// Properties whose domain is `class`, in registration order.
    pub fn properties_of_domain(&self, class: ClassId) -> impl Iterator<Item = (PropertyId, &PropertyDef)> {
        self.properties().filter(move |(_, p)| p.domain == class)
    }

    /// Every fts-indexed property whose domain matches `class` exactly.
    pub fn fts_properties_of_domain(&self, class: ClassId) -> impl Iterator<Item = (PropertyId, &PropertyDef)> {
        self.properties_of_domain(class).filter(|(_, p)| p.fts)
    }

    pub fn increment_instance_count(&self, id: ClassId) -> u64 {
        self.instance_counts[id.0 as usize].fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Mirrors [`Ontology::increment_instance_count`] for the `rdf:type`
    /// delete extension. Floors at zero rather than wrapping.
    pub fn decrement_instance_count(&self, id: ClassId) -> u64 {
        let counter = &self.instance_counts[id.0 as usize];
        let mut current = counter.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_sub(1);
            match counter.compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn instance_count(&self, id: ClassId) -> u64 {
        self.instance_counts[id.0 as usize].load(Ordering::SeqCst)
    }

    /// Relational side-table name for a multi-valued property of a class:
    /// `C.name_P.name`.
    pub fn multi_table_name(&self, class: ClassId, property: PropertyId) -> String {
        format!("{}_{}", self.class(class).name, self.property(property).name)
    }
}

/// Builder for [`Ontology`]. Classes/properties may reference super-classes
/// and super-properties not yet registered by URI; resolution happens in
/// [`OntologyBuilder::build`].
#[derive(Default)]
pub struct OntologyBuilder {
    classes: Vec<(String, String, Vec<String>)>,
    properties: Vec<(String, String, String, Datatype, bool, bool, bool, Vec<String>)>,
}

impl OntologyBuilder {
    /// Registers a class. `super_classes` are URIs of direct super-classes,
    /// which may be registered before or after this call.
    pub fn class(mut self, uri: &str, name: &str, super_classes: &[&str]) -> Self {
        self.classes.push((
            uri.to_string(),
            name.to_string(),
            super_classes.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Registers a property.
    #[allow(clippy::too_many_arguments)]
    pub fn property(
        mut self,
        uri: &str,
        name: &str,
        domain_uri: &str,
        datatype: Datatype,
        multi: bool,
        fts: bool,
        embedded: bool,
        super_properties: &[&str],
    ) -> Self {
        self.properties.push((
            uri.to_string(),
            name.to_string(),
            domain_uri.to_string(),
            datatype,
            multi,
            fts,
            embedded,
            super_properties.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Resolves super-class/super-property URIs and computes transitive
    /// closures. Fails with [`EngineError::Internal`] if a referenced URI
    /// was never registered — an ontology-authoring bug, not a runtime
    /// condition a caller recovers from.
    pub fn build(self) -> Result<Ontology> {
        let mut class_by_uri = HashMap::new();
        for (i, (uri, _, _)) in self.classes.iter().enumerate() {
            class_by_uri.insert(uri.clone(), ClassId(i as u32));
        }
        let mut property_by_uri = HashMap::new();
        for (i, (uri, ..)) in self.properties.iter().enumerate() {
            property_by_uri.insert(uri.clone(), PropertyId(i as u32));
        }

        let mut classes = Vec::with_capacity(self.classes.len());
        for (uri, name, super_uris) in &self.classes {
            let mut direct_super = Vec::with_capacity(super_uris.len());
            for s in super_uris {
                let id = class_by_uri
                    .get(s)
                    .copied()
                    .ok_or_else(|| EngineError::internal(format!("unregistered super-class: {s}")))?;
                direct_super.push(id);
            }
            classes.push(ClassDef {
                uri: uri.clone(),
                name: name.clone(),
                direct_super,
                super_closure: Vec::new(),
            });
        }
        for i in 0..classes.len() {
            let closure = transitive_closure(i, &classes, |c| &c.direct_super);
            classes[i].super_closure = closure;
        }

        let mut properties = Vec::with_capacity(self.properties.len());
        for (uri, name, domain_uri, datatype, multi, fts, embedded, super_uris) in &self.properties {
            let domain = class_by_uri
                .get(domain_uri)
                .copied()
                .ok_or_else(|| EngineError::internal(format!("unregistered domain class: {domain_uri}")))?;
            let mut direct_super = Vec::with_capacity(super_uris.len());
            for s in super_uris {
                let id = property_by_uri
                    .get(s)
                    .copied()
                    .ok_or_else(|| EngineError::internal(format!("unregistered super-property: {s}")))?;
                direct_super.push(id);
            }
            properties.push(PropertyDef {
                uri: uri.clone(),
                name: name.clone(),
                domain,
                datatype: *datatype,
                multi: *multi,
                fts: *fts,
                embedded: *embedded,
                direct_super,
                super_closure: Vec::new(),
            });
        }
        for i in 0..properties.len() {
            let closure = transitive_closure(i, &properties, |p| &p.direct_super);
            properties[i].super_closure = closure;
        }

        let instance_counts = classes.iter().map(|_| AtomicU64::new(0)).collect();

        Ok(Ontology {
            classes,
            properties,
            class_by_uri,
            property_by_uri,
            instance_counts,
        })
    }
}

/// Depth-first transitive closure over `direct` edges starting at `start`,
/// each node appearing at most once.
fn transitive_closure<T, I, F>(start: usize, nodes: &[T], direct: F) -> Vec<I>
where
    I: Copy + PartialEq + Into<usize>,
    F: Fn(&T) -> &[I],
{
    let mut seen = Vec::new();
    let mut stack: Vec<I> = direct(&nodes[start]).to_vec();
    while let Some(id) = stack.pop() {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        let idx: usize = id.into();
        for &parent in direct(&nodes[idx]) {
            if !seen.contains(&parent) {
                stack.push(parent);
            }
        }
    }
    seen
}

impl From<ClassId> for usize {
    fn from(id: ClassId) -> usize {
        id.0 as usize
    }
}

impl From<PropertyId> for usize {
    fn from(id: PropertyId) -> usize {
        id.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_class_closure_is_transitive() {
        let ont = Ontology::builder()
            .class("a:Base", "a_Base", &[])
            .class("a:Mid", "a_Mid", &["a:Base"])
            .class("a:Leaf", "a_Leaf", &["a:Mid"])
            .build()
            .unwrap();
        let leaf = ont.class_by_uri("a:Leaf").unwrap();
        let closure = ont.class(leaf).super_classes();
        assert!(closure.contains(&ont.class_by_uri("a:Mid").unwrap()));
        assert!(closure.contains(&ont.class_by_uri("a:Base").unwrap()));
    }

    #[test]
    fn unregistered_super_class_is_internal_error() {
        let result = Ontology::builder()
            .class("a:Leaf", "a_Leaf", &["a:Missing"])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn instance_counter_increments() {
        let ont = Ontology::builder().class("a:Base", "a_Base", &[]).build().unwrap();
        let base = ont.class_by_uri("a:Base").unwrap();
        assert_eq!(ont.increment_instance_count(base), 1);
        assert_eq!(ont.increment_instance_count(base), 2);
        assert_eq!(ont.instance_count(base), 2);
    }

    #[test]
    fn multi_table_name_matches_convention() {
        let ont = Ontology::builder()
            .class("nie:IE", "nie_InformationElement", &[])
            .property(
                "nao:hasTag",
                "nao_hasTag",
                "nie:IE",
                Datatype::Resource,
                true,
                false,
                false,
                &[],
            )
            .build()
            .unwrap();
        let class = ont.class_by_uri("nie:IE").unwrap();
        let prop = ont.property_by_uri("nao:hasTag").unwrap();
        assert_eq!(ont.multi_table_name(class, prop), "nie_InformationElement_nao_hasTag");
    }
}
