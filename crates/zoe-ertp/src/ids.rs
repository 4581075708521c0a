//! Opaque handles for custody objects.
//!
//! Handles are random UUIDs: they carry no structure and cannot be guessed.
//! Every handle indexes an explicit side table owned by its assay.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one assay (issuer). Part of every [`Label`](crate::Label).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssayId(Uuid);

impl AssayId {
    /// Allocate a fresh, unguessable assay identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn value(self) -> Uuid {
        self.0
    }
}

impl Default for AssayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PurseId(Uuid);

impl PurseId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PurseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handles_are_distinct() {
        assert_ne!(AssayId::new(), AssayId::new());
        assert_ne!(PurseId::new(), PurseId::new());
        assert_ne!(PaymentId::new(), PaymentId::new());
    }

    #[test]
    fn assay_id_serializes_transparently() {
        let id = AssayId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
        let back: AssayId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
