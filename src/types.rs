//! Core value and identifier types shared across the update engine.
//!
//! Resource identity in this engine is a small non-zero integer, assigned
//! monotonically within the process — not a UUID. This mirrors the original
//! implementation this engine is modeled on, which hands out resource ids as
//! `guint32`s seeded from `MAX(ID)` over the backing store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a resource (subject or object-as-resource) in the store.
///
/// Never zero: `0` is reserved to mean "no such resource" in lookup results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// Sentinel for "not found" returned by fallible lookups.
    pub const NONE: ResourceId = ResourceId(0);

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing modification stamp, written as `tracker:modified`
/// on every resource touched in a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModSeq(pub u32);

impl fmt::Display for ModSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed literal or resource-reference value, as coerced from a statement's
/// string object per the property's ontology datatype.
///
/// No runtime type reflection: every consumer matches on this tagged
/// variant directly, per the design notes' polymorphism-over-typed-values
/// guidance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    /// Unix timestamp (seconds), used for both `date` and `datetime`
    /// properties and for resource-typed properties (the object's
    /// resolved [`ResourceId`] stored as its integer value).
    Date(i64),
}

impl Value {
    pub fn resource(id: ResourceId) -> Self {
        Value::Date(id.as_u32() as i64)
    }
}

impl PartialEq for Value {
    /// Direct numeric/string comparison. RDF does not define literal
    /// equality precisely for doubles; this engine treats bit-for-bit
    /// numeric equality as the value-set membership test (see spec open
    /// questions) rather than attempting epsilon comparison.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_none_is_zero() {
        assert!(ResourceId::NONE.is_none());
        assert!(!ResourceId(1).is_none());
    }

    #[test]
    fn value_equality_is_direct() {
        assert_eq!(Value::Double(1.0), Value::Double(1.0));
        assert_ne!(Value::Double(0.1 + 0.2), Value::Double(0.3));
        assert_ne!(Value::Int(1), Value::String("1".into()));
    }
}
