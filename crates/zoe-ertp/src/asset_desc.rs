//! Asset descriptions: extents bound to a label.
//!
//! An [`AssetDescOps`] is the sole authority for a label. Descriptions it
//! produces carry its brand, so `coerce` recognizes them without
//! re-validating. Anything else (a raw extent, or a description that
//! arrived over the wire) is validated against the bound strategy first.

use crate::error::ErtpError;
use crate::extent::Extent;
use crate::extent_ops::ExtentOps;
use crate::label::Label;
use crate::registry::ExtentOpsDescriptor;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BRAND: AtomicU64 = AtomicU64::new(1);

/// Marks a description as produced by one particular `AssetDescOps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Brand(u64);

impl Brand {
    fn fresh() -> Self {
        Self(NEXT_BRAND.fetch_add(1, Ordering::Relaxed))
    }
}

/// A described quantity: `{label, extent}`.
///
/// Equality compares label and extent only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDesc {
    label: Label,
    extent: Extent,
    #[serde(skip)]
    brand: Option<Brand>,
}

impl AssetDesc {
    /// An unvalidated description, as received from another party.
    ///
    /// It must pass through [`AssetDescOps::coerce`] before it is trusted.
    pub fn alleged(label: Label, extent: Extent) -> Self {
        Self {
            label,
            extent,
            brand: None,
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn into_extent(self) -> Extent {
        self.extent
    }
}

impl PartialEq for AssetDesc {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.extent == other.extent
    }
}

impl Eq for AssetDesc {}

impl std::fmt::Display for AssetDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.extent, self.label.description())
    }
}

/// Anything `coerce` accepts: a description or a bare extent.
#[derive(Debug, Clone)]
pub enum AssetDescLike {
    Desc(AssetDesc),
    Extent(Extent),
}

impl From<AssetDesc> for AssetDescLike {
    fn from(value: AssetDesc) -> Self {
        Self::Desc(value)
    }
}

impl From<&AssetDesc> for AssetDescLike {
    fn from(value: &AssetDesc) -> Self {
        Self::Desc(value.clone())
    }
}

impl From<Extent> for AssetDescLike {
    fn from(value: Extent) -> Self {
        Self::Extent(value)
    }
}

impl From<&Extent> for AssetDescLike {
    fn from(value: &Extent) -> Self {
        Self::Extent(value.clone())
    }
}

impl From<u64> for AssetDescLike {
    fn from(value: u64) -> Self {
        Self::Extent(Extent::Nat(value))
    }
}

/// Binds one label to one extent strategy.
#[derive(Debug, Clone)]
pub struct AssetDescOps {
    label: Label,
    extent_ops: Rc<dyn ExtentOps>,
    brand: Brand,
}

impl AssetDescOps {
    pub fn new(label: Label, extent_ops: Rc<dyn ExtentOps>) -> Self {
        Self {
            label,
            extent_ops,
            brand: Brand::fresh(),
        }
    }

    pub fn get_label(&self) -> &Label {
        &self.label
    }

    pub fn get_extent_ops(&self) -> &Rc<dyn ExtentOps> {
        &self.extent_ops
    }

    /// The `{name, args}` pair for rebuilding the strategy elsewhere.
    pub fn get_extent_ops_descriptor(&self) -> ExtentOpsDescriptor {
        self.extent_ops.descriptor()
    }

    /// Validate a raw extent and wrap it under this label.
    pub fn make(&self, extent: impl Into<Extent>) -> Result<AssetDesc, ErtpError> {
        let extent = self.extent_ops.insist_kind(extent.into())?;
        Ok(self.brand(extent))
    }

    /// Accept a description or raw extent as a genuine description of this label.
    pub fn coerce(&self, candidate: impl Into<AssetDescLike>) -> Result<AssetDesc, ErtpError> {
        match candidate.into() {
            AssetDescLike::Desc(desc) if desc.brand == Some(self.brand) => Ok(desc),
            AssetDescLike::Desc(desc) => {
                if desc.label != self.label {
                    return Err(ErtpError::UnrecognizedLabel {
                        expected: self.label.to_string(),
                        found: desc.label.to_string(),
                    });
                }
                self.make(desc.extent)
            }
            AssetDescLike::Extent(extent) => self.make(extent),
        }
    }

    pub fn extent(&self, candidate: impl Into<AssetDescLike>) -> Result<Extent, ErtpError> {
        Ok(self.coerce(candidate)?.extent)
    }

    pub fn empty(&self) -> AssetDesc {
        self.brand(self.extent_ops.empty())
    }

    pub fn is_empty(&self, candidate: impl Into<AssetDescLike>) -> Result<bool, ErtpError> {
        let desc = self.coerce(candidate)?;
        Ok(self.extent_ops.is_empty(&desc.extent)?)
    }

    pub fn includes(
        &self,
        whole: impl Into<AssetDescLike>,
        part: impl Into<AssetDescLike>,
    ) -> Result<bool, ErtpError> {
        let whole = self.coerce(whole)?;
        let part = self.coerce(part)?;
        Ok(self.extent_ops.includes(&whole.extent, &part.extent)?)
    }

    pub fn equals(
        &self,
        left: impl Into<AssetDescLike>,
        right: impl Into<AssetDescLike>,
    ) -> Result<bool, ErtpError> {
        let left = self.coerce(left)?;
        let right = self.coerce(right)?;
        Ok(self.extent_ops.equals(&left.extent, &right.extent)?)
    }

    pub fn with(
        &self,
        left: impl Into<AssetDescLike>,
        right: impl Into<AssetDescLike>,
    ) -> Result<AssetDesc, ErtpError> {
        let left = self.coerce(left)?;
        let right = self.coerce(right)?;
        let sum = self.extent_ops.with(&left.extent, &right.extent)?;
        Ok(self.brand(sum))
    }

    pub fn without(
        &self,
        whole: impl Into<AssetDescLike>,
        part: impl Into<AssetDescLike>,
    ) -> Result<AssetDesc, ErtpError> {
        let whole = self.coerce(whole)?;
        let part = self.coerce(part)?;
        let remainder = self.extent_ops.without(&whole.extent, &part.extent)?;
        Ok(self.brand(remainder))
    }

    fn brand(&self, extent: Extent) -> AssetDesc {
        AssetDesc {
            label: self.label.clone(),
            extent,
            brand: Some(self.brand),
        }
    }
}
