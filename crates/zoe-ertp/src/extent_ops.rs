//! Extent strategies: stateless algebra over raw extents.
//!
//! Three families ship with the kernel:
//!
//! - **Nat**: the additive monoid of natural numbers (fungible value)
//! - **Uni**: empty or exactly one unique value (seats, invites, receipts)
//! - **Collection**: sets of distinct elements (non-fungible bundles)
//!
//! Every operation first insists that its operands belong to the strategy,
//! so a strategy never silently coerces an extent of another family.

use crate::error::ExtentError;
use crate::extent::Extent;
use crate::registry::ExtentOpsDescriptor;
use serde_json::Value;
use std::fmt;

pub const NAT_EXTENT_OPS: &str = "natExtentOps";
pub const UNI_EXTENT_OPS: &str = "uniExtentOps";
pub const COLLECTION_EXTENT_OPS: &str = "collectionExtentOps";

/// The algebra a strategy provides over its extents.
///
/// Implementations must be pure: no operation may depend on or mutate
/// state outside its arguments.
pub trait ExtentOps: fmt::Debug {
    /// The `{name, args}` pair a remote party uses to rebuild this strategy.
    fn descriptor(&self) -> ExtentOpsDescriptor;

    /// Validate `extent` for this strategy and return its canonical form.
    fn insist_kind(&self, extent: Extent) -> Result<Extent, ExtentError>;

    /// The identity element.
    fn empty(&self) -> Extent;

    fn is_empty(&self, extent: &Extent) -> Result<bool, ExtentError>;

    /// Whether `part` is a sub-quantity of `whole`.
    fn includes(&self, whole: &Extent, part: &Extent) -> Result<bool, ExtentError>;

    fn equals(&self, left: &Extent, right: &Extent) -> Result<bool, ExtentError> {
        Ok(self.includes(left, right)? && self.includes(right, left)?)
    }

    /// Combine two extents.
    fn with(&self, left: &Extent, right: &Extent) -> Result<Extent, ExtentError>;

    /// Remove `part` from `whole`, failing if `part` is not included.
    fn without(&self, whole: &Extent, part: &Extent) -> Result<Extent, ExtentError>;
}

/// Natural-number extents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NatExtentOps;

impl NatExtentOps {
    fn nat(extent: &Extent) -> Result<u64, ExtentError> {
        extent.as_nat().ok_or(ExtentError::KindMismatch {
            strategy: NAT_EXTENT_OPS,
            found: extent.family(),
        })
    }
}

impl ExtentOps for NatExtentOps {
    fn descriptor(&self) -> ExtentOpsDescriptor {
        ExtentOpsDescriptor::new(NAT_EXTENT_OPS)
    }

    fn insist_kind(&self, extent: Extent) -> Result<Extent, ExtentError> {
        Self::nat(&extent)?;
        Ok(extent)
    }

    fn empty(&self) -> Extent {
        Extent::Nat(0)
    }

    fn is_empty(&self, extent: &Extent) -> Result<bool, ExtentError> {
        Ok(Self::nat(extent)? == 0)
    }

    fn includes(&self, whole: &Extent, part: &Extent) -> Result<bool, ExtentError> {
        Ok(Self::nat(whole)? >= Self::nat(part)?)
    }

    fn with(&self, left: &Extent, right: &Extent) -> Result<Extent, ExtentError> {
        Self::nat(left)?
            .checked_add(Self::nat(right)?)
            .map(Extent::Nat)
            .ok_or_else(|| ExtentError::InvalidExtent {
                strategy: NAT_EXTENT_OPS,
                reason: format!("{left} + {right} overflows"),
            })
    }

    fn without(&self, whole: &Extent, part: &Extent) -> Result<Extent, ExtentError> {
        Self::nat(whole)?
            .checked_sub(Self::nat(part)?)
            .map(Extent::Nat)
            .ok_or_else(|| ExtentError::NotIncluded {
                whole: whole.to_string(),
                part: part.to_string(),
            })
    }
}

/// Unique extents: empty, or exactly one truthy value.
///
/// An optional `required_key` restricts non-empty values to JSON objects
/// carrying that key (escrow receipts require `offerId`, for instance).
#[derive(Debug, Clone, Default)]
pub struct UniExtentOps {
    required_key: Option<String>,
}

impl UniExtentOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// A strategy whose non-empty extents must be objects holding `key`.
    pub fn requiring_key(key: impl Into<String>) -> Self {
        Self {
            required_key: Some(key.into()),
        }
    }

    fn uni(extent: &Extent) -> Result<Option<&Value>, ExtentError> {
        match extent {
            Extent::Uni(value) => Ok(value.as_ref().filter(|v| !v.is_null())),
            other => Err(ExtentError::KindMismatch {
                strategy: UNI_EXTENT_OPS,
                found: other.family(),
            }),
        }
    }

    fn invalid(reason: impl Into<String>) -> ExtentError {
        ExtentError::InvalidExtent {
            strategy: UNI_EXTENT_OPS,
            reason: reason.into(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl ExtentOps for UniExtentOps {
    fn descriptor(&self) -> ExtentOpsDescriptor {
        let descriptor = ExtentOpsDescriptor::new(UNI_EXTENT_OPS);
        match &self.required_key {
            Some(key) => descriptor.with_args(vec![Value::String(key.clone())]),
            None => descriptor,
        }
    }

    fn insist_kind(&self, extent: Extent) -> Result<Extent, ExtentError> {
        let Some(value) = Self::uni(&extent)? else {
            return Ok(Extent::Uni(None));
        };
        if !is_truthy(value) {
            return Err(Self::invalid(format!("{value} is not a truthy value")));
        }
        if let Some(key) = &self.required_key
            && value.get(key).is_none()
        {
            return Err(Self::invalid(format!("{value} is missing required key `{key}`")));
        }
        Ok(Extent::Uni(Some(value.clone())))
    }

    fn empty(&self) -> Extent {
        Extent::Uni(None)
    }

    fn is_empty(&self, extent: &Extent) -> Result<bool, ExtentError> {
        Ok(Self::uni(extent)?.is_none())
    }

    fn includes(&self, whole: &Extent, part: &Extent) -> Result<bool, ExtentError> {
        Ok(match (Self::uni(whole)?, Self::uni(part)?) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(w), Some(p)) => w == p,
        })
    }

    fn with(&self, left: &Extent, right: &Extent) -> Result<Extent, ExtentError> {
        match (Self::uni(left)?, Self::uni(right)?) {
            (None, None) => Ok(Extent::Uni(None)),
            (Some(value), None) | (None, Some(value)) => Ok(Extent::Uni(Some(value.clone()))),
            (Some(_), Some(_)) => Err(ExtentError::NonCombinable),
        }
    }

    fn without(&self, whole: &Extent, part: &Extent) -> Result<Extent, ExtentError> {
        if !self.includes(whole, part)? {
            return Err(ExtentError::NotIncluded {
                whole: whole.to_string(),
                part: part.to_string(),
            });
        }
        if self.is_empty(part)? {
            self.insist_kind(whole.clone())
        } else {
            Ok(Extent::Uni(None))
        }
    }
}

/// Set-like extents over distinct JSON elements.
///
/// `with` is a disjoint union: an element present on both sides is an
/// error, so no sequence of operations can duplicate an item.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionExtentOps;

impl CollectionExtentOps {
    fn items(extent: &Extent) -> Result<&[Value], ExtentError> {
        extent.as_collection().ok_or(ExtentError::KindMismatch {
            strategy: COLLECTION_EXTENT_OPS,
            found: extent.family(),
        })
    }
}

impl ExtentOps for CollectionExtentOps {
    fn descriptor(&self) -> ExtentOpsDescriptor {
        ExtentOpsDescriptor::new(COLLECTION_EXTENT_OPS)
    }

    fn insist_kind(&self, extent: Extent) -> Result<Extent, ExtentError> {
        let items = Self::items(&extent)?;
        for (i, item) in items.iter().enumerate() {
            if item.is_null() {
                return Err(ExtentError::InvalidExtent {
                    strategy: COLLECTION_EXTENT_OPS,
                    reason: format!("element {i} is null"),
                });
            }
            if items[..i].contains(item) {
                return Err(ExtentError::DuplicateElement {
                    element: item.to_string(),
                });
            }
        }
        Ok(extent)
    }

    fn empty(&self) -> Extent {
        Extent::Collection(Vec::new())
    }

    fn is_empty(&self, extent: &Extent) -> Result<bool, ExtentError> {
        Ok(Self::items(extent)?.is_empty())
    }

    fn includes(&self, whole: &Extent, part: &Extent) -> Result<bool, ExtentError> {
        let whole = Self::items(whole)?;
        Ok(Self::items(part)?.iter().all(|item| whole.contains(item)))
    }

    fn with(&self, left: &Extent, right: &Extent) -> Result<Extent, ExtentError> {
        let left = Self::items(left)?;
        let right = Self::items(right)?;
        if let Some(dup) = right.iter().find(|item| left.contains(item)) {
            return Err(ExtentError::DuplicateElement {
                element: dup.to_string(),
            });
        }
        let mut union = left.to_vec();
        union.extend_from_slice(right);
        Ok(Extent::Collection(union))
    }

    fn without(&self, whole: &Extent, part: &Extent) -> Result<Extent, ExtentError> {
        if !self.includes(whole, part)? {
            return Err(ExtentError::NotIncluded {
                whole: whole.to_string(),
                part: part.to_string(),
            });
        }
        let part = Self::items(part)?;
        let remainder = Self::items(whole)?
            .iter()
            .filter(|item| !part.contains(item))
            .cloned()
            .collect();
        Ok(Extent::Collection(remainder))
    }
}
