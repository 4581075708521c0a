//! Strategy registry: rebuild extent strategies from `{name, args}`.
//!
//! Strategies never cross a trust boundary as code. A party that receives
//! a descriptor resolves it against its own registry, trusting only that
//! the name denotes the agreed algebra.

use crate::error::ExtentError;
use crate::extent_ops::{
    COLLECTION_EXTENT_OPS, CollectionExtentOps, ExtentOps, NAT_EXTENT_OPS, NatExtentOps,
    UNI_EXTENT_OPS, UniExtentOps,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Transmissible name of an extent strategy plus its constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtentOpsDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl ExtentOpsDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// Builds a strategy from its constructor arguments.
pub type ExtentOpsConstructor = fn(&[Value]) -> Result<Rc<dyn ExtentOps>, ExtentError>;

/// Name-indexed table of strategy constructors.
#[derive(Clone, Default)]
pub struct ExtentOpsRegistry {
    constructors: BTreeMap<String, ExtentOpsConstructor>,
}

impl ExtentOpsRegistry {
    /// A registry with no strategies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the three kernel strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(NAT_EXTENT_OPS, make_nat);
        registry.register(UNI_EXTENT_OPS, make_uni);
        registry.register(COLLECTION_EXTENT_OPS, make_collection);
        registry
    }

    /// Register (or replace) a strategy constructor.
    ///
    /// Returns the constructor previously registered under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: ExtentOpsConstructor,
    ) -> Option<ExtentOpsConstructor> {
        self.constructors.insert(name.into(), constructor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Rebuild a strategy locally from its descriptor.
    pub fn resolve(&self, descriptor: &ExtentOpsDescriptor) -> Result<Rc<dyn ExtentOps>, ExtentError> {
        let constructor = self
            .constructors
            .get(&descriptor.name)
            .ok_or_else(|| ExtentError::UnknownStrategy(descriptor.name.clone()))?;
        constructor(&descriptor.args)
    }
}

impl std::fmt::Debug for ExtentOpsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtentOpsRegistry")
            .field("names", &self.names())
            .finish()
    }
}

fn no_args(name: &str, args: &[Value]) -> Result<(), ExtentError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ExtentError::InvalidStrategyArgs {
            name: name.to_string(),
            reason: format!("expected no arguments, got {}", args.len()),
        })
    }
}

fn make_nat(args: &[Value]) -> Result<Rc<dyn ExtentOps>, ExtentError> {
    no_args(NAT_EXTENT_OPS, args)?;
    Ok(Rc::new(NatExtentOps))
}

fn make_uni(args: &[Value]) -> Result<Rc<dyn ExtentOps>, ExtentError> {
    match args {
        [] => Ok(Rc::new(UniExtentOps::new())),
        [Value::String(key)] => Ok(Rc::new(UniExtentOps::requiring_key(key.clone()))),
        _ => Err(ExtentError::InvalidStrategyArgs {
            name: UNI_EXTENT_OPS.to_string(),
            reason: "expected at most one string argument (a required key)".to_string(),
        }),
    }
}

fn make_collection(args: &[Value]) -> Result<Rc<dyn ExtentOps>, ExtentError> {
    no_args(COLLECTION_EXTENT_OPS, args)?;
    Ok(Rc::new(CollectionExtentOps))
}
