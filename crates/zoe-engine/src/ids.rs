//! Opaque handles for Zoe's tables.
//!
//! Each handle is a random UUID with no structure. Holding an id grants
//! nothing by itself; every table lookup still checks the caller's
//! authority where it matters (e.g. instance ownership of offers).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A registered contract factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(Uuid);

impl InstallationId {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn value(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One running contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn value(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One escrowed offer. Retired permanently once the offer completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(Uuid);

impl OfferId {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn value(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
