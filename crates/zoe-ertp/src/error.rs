//! Error types for extent algebra and custody operations.

use crate::ids::{AssayId, PaymentId, PurseId};

/// Errors raised by an extent strategy or the strategy registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtentError {
    /// The extent is not well-formed for the strategy.
    #[error("invalid {strategy} extent: {reason}")]
    InvalidExtent {
        strategy: &'static str,
        reason: String,
    },

    /// The extent belongs to a different strategy family.
    #[error("{strategy} cannot operate on a {found} extent")]
    KindMismatch {
        strategy: &'static str,
        found: &'static str,
    },

    /// Two non-empty unique extents were combined.
    #[error("unique extents cannot be combined: both sides are non-empty")]
    NonCombinable,

    /// `without` was asked to remove more than the whole holds.
    #[error("part {part} is not included in {whole}")]
    NotIncluded { whole: String, part: String },

    /// A collection would hold the same element twice.
    #[error("collection element appears more than once: {element}")]
    DuplicateElement { element: String },

    /// No strategy is registered under the requested name.
    #[error("unknown extent ops strategy: {0}")]
    UnknownStrategy(String),

    /// A registered strategy rejected its constructor arguments.
    #[error("invalid arguments for {name}: {reason}")]
    InvalidStrategyArgs { name: String, reason: String },
}

/// Errors raised by asset descriptions and the custody layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErtpError {
    #[error(transparent)]
    Extent(#[from] ExtentError),

    /// An asset description carries a label this assay did not issue.
    #[error("label {found} is not recognized, expected {expected}")]
    UnrecognizedLabel { expected: String, found: String },

    /// A payment or purse from another assay was presented.
    #[error("expected an object of assay {expected}, got one of assay {found}")]
    WrongAssay { expected: AssayId, found: AssayId },

    /// The payment was already withdrawn, claimed, burned, split, or combined.
    #[error("payment {0} has already been used")]
    PaymentConsumed(PaymentId),

    /// The same payment appears twice in one operation.
    #[error("payment {0} was presented more than once")]
    DuplicatePayment(PaymentId),

    #[error("purse {0} does not exist")]
    UnknownPurse(PurseId),

    /// An "exactly" operation was asserted against a different balance.
    #[error("balance mismatch: asserted {asserted}, actual {actual}")]
    BalanceMismatch { asserted: String, actual: String },

    /// A withdrawal asked for more than the purse holds.
    #[error("insufficient funds: requested {requested}, balance {balance}")]
    InsufficientFunds { requested: String, balance: String },

    /// The split amounts do not add up to the payment balance.
    #[error("split amounts total {total}, payment holds {balance}")]
    SplitMismatch { total: String, balance: String },
}
