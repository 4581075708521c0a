//! # zoe-ertp
//!
//! Electronic rights kernel: a generic algebra for conserved, typed
//! quantities of value, and a linear custody layer built on it.
//!
//! This crate is **strategy-agnostic**: it does not prescribe what an
//! extent is (a count, a seat, a set of tickets). It only prescribes how
//! extents combine, compare, and move between holders.
//!
//! ## Architecture
//!
//! ```text
//! ExtentOps            ← Nat / Uni / Collection algebra over raw extents
//!     │
//! ExtentOpsRegistry    ← {name, args} → strategy, rebuilt locally
//!     │
//! AssetDescOps         ← Label + strategy; sole maker of AssetDesc
//!     │
//! Mint → Assay         ← value creation / public validation capability
//!     │
//! Purse, Payment       ← mutable balance cell / linear bearer certificate
//! ```
//!
//! Everything is single-threaded: handles share state through `Rc`, and
//! each operation finishes all fallible checks before it mutates a ledger.

pub mod assay;
pub mod asset_desc;
pub mod error;
pub mod extent;
pub mod extent_ops;
pub mod ids;
pub mod label;
pub mod mint;
pub mod purse;
pub mod registry;

pub use assay::{Assay, Payment};
pub use asset_desc::{AssetDesc, AssetDescLike, AssetDescOps};
pub use error::{ErtpError, ExtentError};
pub use extent::Extent;
pub use extent_ops::{
    COLLECTION_EXTENT_OPS, CollectionExtentOps, ExtentOps, NAT_EXTENT_OPS, NatExtentOps,
    UNI_EXTENT_OPS, UniExtentOps,
};
pub use ids::{AssayId, PaymentId, PurseId};
pub use label::Label;
pub use mint::Mint;
pub use purse::Purse;
pub use registry::{ExtentOpsConstructor, ExtentOpsDescriptor, ExtentOpsRegistry};
