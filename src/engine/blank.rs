//! Blank-Node Buffer: accumulates statements for one anonymous subject,
//! materializing a deterministic `urn:uuid:` URI via SHA-1 once the subject
//! changes or the transaction flushes.

use std::collections::{HashMap, HashSet};

use sha1::{Digest, Sha1};

use super::Op;
use crate::sparql_text::ObjectToken;

/// One statement buffered against the currently active blank subject.
#[derive(Clone, Debug)]
pub struct BufferedBlankStatement {
    pub op: Op,
    pub graph: Option<String>,
    pub predicate: String,
    pub object: ObjectToken,
}

/// The raw text of an object token, regardless of its surface form —
/// what the SHA-1 digest is computed over.
fn object_text(token: &ObjectToken) -> &str {
    match token {
        ObjectToken::Uri(s) | ObjectToken::String(s) | ObjectToken::Bare(s) => s,
    }
}

/// A blank subject's materialized URI plus the statements to replay against
/// it, returned when the buffer switches subjects or is explicitly flushed.
#[derive(Clone, Debug)]
pub struct FinalizedBlank {
    pub label: String,
    pub uri: String,
    pub statements: Vec<BufferedBlankStatement>,
}

/// Accumulator for statements whose subject label starts with `:`.
#[derive(Default)]
pub struct BlankNodeBuffer {
    active_label: Option<String>,
    statements: Vec<BufferedBlankStatement>,
    /// label -> materialized URI, persists for the lifetime of the
    /// transaction so later statements referencing the label resolve.
    materialized: HashMap<String, String>,
}

impl BlankNodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the materialized URI for a previously finalized blank label,
    /// if any.
    pub fn materialized_uri(&self, label: &str) -> Option<&str> {
        self.materialized.get(label).map(String::as_str)
    }

    /// The label currently accumulating statements, if any.
    pub fn active_label(&self) -> Option<&str> {
        self.active_label.as_deref()
    }

    /// Snapshot of every label materialized so far this transaction, used by
    /// callers that need to diff "what got materialized during this call"
    /// (e.g. `execute_update_text_returning_blank_nodes`).
    pub fn materialized_labels(&self) -> HashSet<String> {
        self.materialized.keys().cloned().collect()
    }

    /// URIs materialized since `before` was snapshotted, in label order.
    pub fn materialized_since(&self, before: &HashSet<String>) -> Vec<String> {
        let mut labels: Vec<&String> = self
            .materialized
            .keys()
            .filter(|label| !before.contains(*label))
            .collect();
        labels.sort();
        labels
            .into_iter()
            .map(|label| self.materialized[label].clone())
            .collect()
    }

    /// Appends a statement for `label`, finalizing any other blank subject
    /// currently active.
    pub fn push(
        &mut self,
        label: &str,
        op: Op,
        graph: Option<String>,
        predicate: String,
        object: ObjectToken,
    ) -> Option<FinalizedBlank> {
        let finalized = if self.active_label.as_deref() != Some(label) {
            self.finalize()
        } else {
            None
        };
        self.active_label = Some(label.to_string());
        self.statements.push(BufferedBlankStatement {
            op,
            graph,
            predicate,
            object,
        });
        finalized
    }

    /// Finalizes the currently active blank subject, if any: computes its
    /// materialized URI and drains its buffered statements for replay.
    pub fn finalize(&mut self) -> Option<FinalizedBlank> {
        let label = self.active_label.take()?;
        let statements = std::mem::take(&mut self.statements);
        let uri = materialize_uri(&statements);
        self.materialized.insert(label.clone(), uri.clone());
        Some(FinalizedBlank { label, uri, statements })
    }

    /// Clears all buffered and materialized state, on commit/rollback.
    pub fn clear(&mut self) {
        self.active_label = None;
        self.statements.clear();
        self.materialized.clear();
    }
}

/// SHA-1 over the concatenated predicate/object sequence, formatted as a
/// canonical `urn:uuid:` URI from the digest's first 32 hex chars.
///
/// SHA-1 collision is assumed impossible for these small payloads; a wider
/// hash would also work, but this mirrors the original checksum-based
/// deterministic-identity approach.
fn materialize_uri(statements: &[BufferedBlankStatement]) -> String {
    let mut hasher = Sha1::new();
    for statement in statements {
        hasher.update(statement.predicate.as_bytes());
        hasher.update(object_text(&statement.object).as_bytes());
    }
    let digest = hasher.finalize();
    let hex: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "urn:uuid:{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(s: &str) -> ObjectToken {
        ObjectToken::Bare(s.to_string())
    }

    #[test]
    fn materialization_is_deterministic() {
        let mut a = BlankNodeBuffer::new();
        a.push(":b0", Op::Insert, None, "rdf:type".into(), bare("nao:Tag"));
        a.push(":b0", Op::Insert, None, "nao:prefLabel".into(), bare("red"));
        let finalized_a = a.finalize().unwrap();

        let mut b = BlankNodeBuffer::new();
        b.push(":other", Op::Insert, None, "rdf:type".into(), bare("nao:Tag"));
        b.push(":other", Op::Insert, None, "nao:prefLabel".into(), bare("red"));
        let finalized_b = b.finalize().unwrap();

        assert_eq!(finalized_a.uri, finalized_b.uri);
        assert!(finalized_a.uri.starts_with("urn:uuid:"));
    }

    #[test]
    fn switching_subject_finalizes_previous() {
        let mut buf = BlankNodeBuffer::new();
        buf.push(":b0", Op::Insert, None, "rdf:type".into(), bare("nao:Tag"));
        let finalized = buf.push(":b1", Op::Insert, None, "rdf:type".into(), bare("nao:Tag"));
        assert!(finalized.is_some());
        assert_eq!(finalized.unwrap().label, ":b0");
    }

    #[test]
    fn materialized_label_is_remembered() {
        let mut buf = BlankNodeBuffer::new();
        buf.push(":b0", Op::Insert, None, "rdf:type".into(), bare("nao:Tag"));
        let finalized = buf.finalize().unwrap();
        assert_eq!(buf.materialized_uri(":b0"), Some(finalized.uri.as_str()));
    }
}
