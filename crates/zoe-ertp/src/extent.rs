//! Raw extents: the magnitude or content of a quantity of value.
//!
//! An extent on its own says nothing about *what* it measures. Pairing it
//! with a [`Label`](crate::Label) is the job of [`AssetDescOps`](crate::AssetDescOps);
//! deciding whether it is well-formed is the job of an
//! [`ExtentOps`](crate::ExtentOps) strategy.
//!
//! Wire form is externally tagged:
//!
//! ```json
//! { "nat": 3 }
//! { "uni": null }
//! { "uni": { "offerId": "..." } }
//! { "collection": ["seat-a1", "seat-a2"] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A raw extent, tagged by strategy family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Extent {
    /// A non-negative integer quantity.
    Nat(u64),

    /// Either empty (`None`) or one unique, non-combinable value.
    Uni(Option<Value>),

    /// A set of distinct, comparable elements.
    Collection(Vec<Value>),
}

impl Extent {
    /// Short name of the extent family, used in diagnostics.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Nat(_) => "nat",
            Self::Uni(_) => "uni",
            Self::Collection(_) => "collection",
        }
    }

    /// The natural number, if this is a `Nat` extent.
    pub fn as_nat(&self) -> Option<u64> {
        match self {
            Self::Nat(n) => Some(*n),
            _ => None,
        }
    }

    /// The unique value, if this is a non-empty `Uni` extent.
    pub fn as_uni(&self) -> Option<&Value> {
        match self {
            Self::Uni(value) => value.as_ref(),
            _ => None,
        }
    }

    /// The elements, if this is a `Collection` extent.
    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Self::Collection(items) => Some(items),
            _ => None,
        }
    }
}

impl From<u64> for Extent {
    fn from(value: u64) -> Self {
        Self::Nat(value)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nat(n) => write!(f, "{n}"),
            Self::Uni(None) => write!(f, "uni(empty)"),
            Self::Uni(Some(value)) => write!(f, "uni({value})"),
            Self::Collection(items) => write!(f, "{}", Value::Array(items.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_form_is_externally_tagged() {
        assert_eq!(serde_json::to_value(Extent::Nat(3)).unwrap(), json!({"nat": 3}));
        assert_eq!(serde_json::to_value(Extent::Uni(None)).unwrap(), json!({"uni": null}));
        let parsed: Extent = serde_json::from_value(json!({"collection": ["a", "b"]})).unwrap();
        assert_eq!(parsed, Extent::Collection(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn negative_nat_is_rejected_on_the_wire() {
        assert!(serde_json::from_value::<Extent>(json!({"nat": -1})).is_err());
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Extent::Nat(7).to_string(), "7");
        assert_eq!(Extent::Uni(None).to_string(), "uni(empty)");
        assert_eq!(
            Extent::Collection(vec![json!(1), json!(2)]).to_string(),
            "[1,2]"
        );
    }
}
