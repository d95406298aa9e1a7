//! A small reference ontology covering every scenario in the engine's test
//! suite: a base information-element class with a sub-class, a tag class,
//! single- and multi-valued properties of every datatype, one fts-indexed
//! property, one embedded property, and a super-property chain.
//!
//! This is deliberately not a full Nepomuk/Tracker ontology port — it exists
//! to ground tests and the CLI demo.

use super::{Datatype, Ontology};

/// Builds and returns the reference ontology. Panics only on an
/// ontology-authoring bug (a dangling super-class/-property reference),
/// which would be a programming error in this function itself, not a
/// runtime condition.
pub fn reference_ontology() -> Ontology {
    Ontology::builder()
        .class("nie:InformationElement", "nie_InformationElement", &[])
        .class(
            "nfo:Document",
            "nfo_Document",
            &["nie:InformationElement"],
        )
        .class("nao:Tag", "nao_Tag", &[])
        .class("tracker:Volume", "tracker_Volume", &[])
        .property(
            "dc:title",
            "dc_title",
            "nie:InformationElement",
            Datatype::String,
            false,
            false,
            false,
            &[],
        )
        .property(
            "nie:title",
            "nie_title",
            "nie:InformationElement",
            Datatype::String,
            false,
            true,
            false,
            &["dc:title"],
        )
        .property(
            "nie:plainTextContent",
            "nie_plainTextContent",
            "nie:InformationElement",
            Datatype::String,
            false,
            true,
            false,
            &[],
        )
        .property(
            "nao:hasTag",
            "nao_hasTag",
            "nie:InformationElement",
            Datatype::Resource,
            true,
            false,
            false,
            &[],
        )
        .property(
            "nao:isFavorite",
            "nao_isFavorite",
            "nie:InformationElement",
            Datatype::Boolean,
            false,
            false,
            false,
            &[],
        )
        .property(
            "nie:relevanceScore",
            "nie_relevanceScore",
            "nie:InformationElement",
            Datatype::Double,
            false,
            false,
            false,
            &[],
        )
        .property(
            "nao:prefLabel",
            "nao_prefLabel",
            "nao:Tag",
            Datatype::String,
            false,
            false,
            false,
            &[],
        )
        .property(
            "nfo:fileSize",
            "nfo_fileSize",
            "nfo:Document",
            Datatype::Integer,
            false,
            false,
            true,
            &[],
        )
        .property(
            "nfo:fileLastModified",
            "nfo_fileLastModified",
            "nfo:Document",
            Datatype::Date,
            false,
            false,
            true,
            &[],
        )
        .property(
            "tracker:mountPoint",
            "tracker_mountPoint",
            "tracker:Volume",
            Datatype::String,
            false,
            false,
            false,
            &[],
        )
        .property(
            "tracker:isMounted",
            "tracker_isMounted",
            "tracker:Volume",
            Datatype::Boolean,
            false,
            false,
            false,
            &[],
        )
        .build()
        .expect("reference ontology is internally consistent")
}
