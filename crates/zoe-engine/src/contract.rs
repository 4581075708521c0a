//! The plug-in boundary for governing contracts.
//!
//! A contract is registered as a trait object, never as source text. When
//! instantiated it receives exactly two things: its own [`ContractFacet`]
//! and the instance terms. It has no other path to Zoe's tables.

use crate::error::ZoeError;
use crate::facet::ContractFacet;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use zoe_ertp::Assay;

/// A contract factory.
pub trait Contract {
    /// Human-readable name, used in logs and errors.
    fn name(&self) -> &str;

    /// Build one running instance.
    ///
    /// The returned assays are registered with Zoe and define the columns
    /// of every reallocation the instance performs.
    fn make_contract(&self, facet: ContractFacet, terms: &Value) -> Result<ContractInstance, ZoeError>;
}

/// What a contract hands back when instantiated.
#[derive(Clone)]
pub struct ContractInstance {
    /// The contract's public object, handed to users via `get_instance`.
    pub contract_object: Rc<dyn Any>,
    pub assays: Vec<Assay>,
}

impl ContractInstance {
    pub fn new(contract_object: Rc<dyn Any>, assays: Vec<Assay>) -> Self {
        Self {
            contract_object,
            assays,
        }
    }
}

impl fmt::Debug for ContractInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractInstance")
            .field("assays", &self.assays)
            .finish_non_exhaustive()
    }
}
