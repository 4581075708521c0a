//! Labels: the identity of a kind of value.

use crate::ids::AssayId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `{assay, description}`: which assay issued a quantity and what it is called.
///
/// Labels are write-once. Two labels are the same kind of value exactly
/// when both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    assay: AssayId,
    description: String,
}

impl Label {
    pub fn new(assay: AssayId, description: impl Into<String>) -> Self {
        Self {
            assay,
            description: description.into(),
        }
    }

    pub fn assay(&self) -> AssayId {
        self.assay
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description, self.assay)
    }
}
