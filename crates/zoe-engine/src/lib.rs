//! # zoe-engine
//!
//! An escrow host that lets untrusted contract code move escrowed value
//! among mutually distrusting players, while two invariants hold on every
//! reallocation no matter what the contract does:
//!
//! - **Rights conservation**: per assay, the touched offers hold the same
//!   total before and after.
//! - **Offer safety**: each touched player either gets back everything
//!   they offered or gets everything they wanted.
//!
//! ## Architecture
//!
//! ```text
//! Zoe (public service)        ContractFacet (one per instance)
//!        │                               │
//!        └──────────────┬────────────────┘
//!                       │
//!                   ZoeInner        ← escrow / reallocate / complete, two-phase
//!                       │
//!        ┌──────────────┼──────────────┐
//!    ZoeState     conservation     offer_safety
//!  (offers, instances,  │               │
//!   assays, invites)    └── zoe_ertp ───┘
//! ```
//!
//! Players escrow through [`Zoe::escrow`] and receive an escrow receipt, a
//! [`Payoff`], and an [`ExitHandle`]. Contracts see only their
//! [`ContractFacet`]. Neither side ever receives Zoe's tables.

pub mod config;
pub mod conservation;
pub mod contract;
pub mod contract_support;
mod engine;
pub mod error;
pub mod exit;
pub mod facet;
pub mod ids;
pub mod notifier;
pub mod offer_safety;
pub mod payoff;
pub mod rules;
pub mod service;
mod state;
pub mod timer;

pub use config::ZoeConfig;
pub use conservation::{are_rights_conserved, conservation_violation};
pub use contract::{Contract, ContractInstance};
pub use contract_support::{
    DEFAULT_FEE_IN_TENTH_OF_PERCENT, SwapQuote, get_input_price, has_valid_payout_rules,
};
pub use error::ZoeError;
pub use exit::{CancelObj, ExitHandle, PayoffPaymentMaker};
pub use facet::{ContractEscrow, ContractFacet, EscrowReceiptRecord};
pub use ids::{InstallationId, InstanceId, OfferId};
pub use notifier::OfferNotifier;
pub use offer_safety::{
    OfferSafety, evaluate_offer_safety, is_offer_safe_for_all, is_offer_safe_for_player,
};
pub use payoff::Payoff;
pub use rules::{ExitCondition, ExitKind, OfferConditions, PayoutRule, PayoutRuleKind};
pub use service::{EscrowResult, InstanceInfo, UnwrappedInvite, Zoe};
pub use state::OfferStatus;
pub use timer::{ManualTimer, Timer, WakeupHandler};
