//! Error type for the escrow host.

use crate::ids::{InstallationId, InstanceId, OfferId};
use zoe_ertp::{AssayId, ErtpError, ExtentError};

/// Errors raised by Zoe's public service, contract facet, and exit handles.
///
/// Validation and invariant failures are always reported before any
/// table or purse is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoeError {
    #[error(transparent)]
    Ertp(#[from] ErtpError),

    /// A payout rule is malformed or uses an unknown kind.
    #[error("invalid payout rule: {0}")]
    InvalidPayoutRule(String),

    /// An exit condition is malformed or uses an unknown kind.
    #[error("invalid exit condition: {0}")]
    InvalidExitCondition(String),

    /// A payment does not match the payout rule at the same position.
    #[error("payment {index} does not match its payout rule: {reason}")]
    PaymentMismatch { index: usize, reason: String },

    #[error("assay {0} is not registered with zoe")]
    UnknownAssay(AssayId),

    #[error("installation {0} does not exist")]
    UnknownInstallation(InstallationId),

    #[error("instance {0} does not exist")]
    UnknownInstance(InstanceId),

    #[error("offer {0} does not exist")]
    UnknownOffer(OfferId),

    /// The offer was already completed or cancelled.
    #[error("offer {0} has already been completed")]
    AlreadyCompleted(OfferId),

    /// The escrow receipt refers to an offer that exited before the contract accepted it.
    #[error("offer {0} was cancelled")]
    OfferCancelled(OfferId),

    #[error("rights are not conserved: {reason}")]
    RightsNotConserved { reason: String },

    #[error("reallocation is not offer safe for offer {0}")]
    OfferNotSafe(OfferId),

    /// Reallocation arguments have the wrong shape.
    #[error("malformed reallocation: {0}")]
    MalformedReallocation(String),

    #[error("offer {0} appears more than once")]
    DuplicateOffer(OfferId),

    /// The offer is bound to a different instance, or to none.
    #[error("offer {offer_id} is not held by instance {instance_id}")]
    OfferNotOwned {
        offer_id: OfferId,
        instance_id: InstanceId,
    },

    /// Offers in one call range over different assays, or over assays the instance does not use.
    #[error("offer {offer_id} has mismatched assays: {reason}")]
    AssayMismatch { offer_id: OfferId, reason: String },

    #[error("invalid escrow receipt: {0}")]
    InvalidEscrowReceipt(String),

    #[error("invalid invite: {0}")]
    InvalidInvite(String),

    #[error("invalid payoff payment: {0}")]
    InvalidPayoffPayment(String),

    /// The payoff for this offer was already handed out.
    #[error("payoff for offer {0} was already taken")]
    PayoffAlreadyTaken(OfferId),

    /// A payoff was presented to the exit handle of another offer.
    #[error("payoff belongs to offer {found}, expected offer {expected}")]
    PayoffMismatch { expected: OfferId, found: OfferId },

    /// Zoe was torn down before the offer completed.
    #[error("payoff for offer {0} will never arrive")]
    PayoffDropped(OfferId),

    /// A facet or exit handle outlived its Zoe service.
    #[error("zoe service is no longer running")]
    ServiceGone,

    #[error("contract {contract} failed: {reason}")]
    ContractFailed { contract: String, reason: String },

    /// A constant-product pool cannot be priced.
    #[error("invalid pool: {0}")]
    InvalidPool(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<ExtentError> for ZoeError {
    fn from(err: ExtentError) -> Self {
        Self::Ertp(ErtpError::Extent(err))
    }
}
