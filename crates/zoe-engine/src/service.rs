//! The public Zoe service handed to end users.

use crate::config::ZoeConfig;
use crate::contract::Contract;
use crate::engine::ZoeInner;
use crate::error::ZoeError;
use crate::exit::ExitHandle;
use crate::ids::{InstallationId, InstanceId, OfferId};
use crate::notifier::OfferNotifier;
use crate::payoff::Payoff;
use crate::rules::OfferConditions;
use crate::state::OfferStatus;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use zoe_ertp::{Assay, AssayId, Extent, Payment};

/// Everything `escrow` hands back to the player.
#[derive(Debug)]
pub struct EscrowResult {
    /// Proof of escrow, to be given to the contract.
    pub escrow_receipt: Payment,
    pub payoff: Payoff,
    pub exit: ExitHandle,
}

/// A running instance as seen by users.
#[derive(Clone)]
pub struct InstanceInfo {
    pub installation_id: InstallationId,
    pub instance_id: InstanceId,
    /// The contract's public object.
    pub instance: Rc<dyn Any>,
    pub terms: Value,
    pub offer_ids: Vec<OfferId>,
}

impl InstanceInfo {
    /// The contract object as its concrete type.
    pub fn instance_as<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.instance).downcast::<T>().ok()
    }
}

impl fmt::Debug for InstanceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceInfo")
            .field("installation_id", &self.installation_id)
            .field("instance_id", &self.instance_id)
            .field("terms", &self.terms)
            .field("offer_ids", &self.offer_ids)
            .finish_non_exhaustive()
    }
}

/// The contents of a redeemed invite.
pub struct UnwrappedInvite {
    pub offer_id: OfferId,
    /// The invite's extent: the contract's fields plus Zoe's.
    pub extent: Value,
    /// The object the contract bound to this invite.
    pub capability: Rc<dyn Any>,
    /// Payoff of the invite's seat offer.
    pub payoff: Payoff,
}

impl UnwrappedInvite {
    pub fn capability_as<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.capability).downcast::<T>().ok()
    }
}

impl fmt::Debug for UnwrappedInvite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnwrappedInvite")
            .field("offer_id", &self.offer_id)
            .field("extent", &self.extent)
            .finish_non_exhaustive()
    }
}

/// Zoe's public face. Clones share one engine.
#[derive(Clone)]
pub struct Zoe {
    inner: Rc<ZoeInner>,
}

impl Default for Zoe {
    fn default() -> Self {
        Self::new()
    }
}

impl Zoe {
    pub fn new() -> Self {
        Self {
            inner: ZoeInner::new(ZoeConfig::default()),
        }
    }

    pub fn with_config(config: ZoeConfig) -> Result<Self, ZoeError> {
        config.validate()?;
        Ok(Self {
            inner: ZoeInner::new(config),
        })
    }

    pub fn config(&self) -> &ZoeConfig {
        self.inner.config()
    }

    pub fn install(&self, contract: Rc<dyn Contract>) -> InstallationId {
        self.inner.install(contract)
    }

    /// Name of the installed contract.
    pub fn get_installation(&self, installation_id: InstallationId) -> Result<String, ZoeError> {
        self.inner.installation_name(installation_id)
    }

    /// Start a contract. Its assays are registered with Zoe.
    pub fn make_instance(&self, installation_id: InstallationId, terms: Value) -> Result<InstanceInfo, ZoeError> {
        self.inner.make_instance(installation_id, terms)
    }

    pub fn get_instance(&self, instance_id: InstanceId) -> Result<InstanceInfo, ZoeError> {
        self.inner.get_instance(instance_id)
    }

    /// Let Zoe hold escrow in `assay`. Idempotent.
    pub fn add_assay(&self, assay: &Assay) -> AssayId {
        self.inner.add_assay(assay)
    }

    /// Escrow payments under `conditions`.
    ///
    /// `payments` parallels the payout rules: `Some` for every offer rule,
    /// `None` for every want rule. Nothing is deposited unless every
    /// payment matches its rule exactly.
    pub fn escrow(
        &self,
        conditions: OfferConditions,
        payments: &[Option<&Payment>],
    ) -> Result<EscrowResult, ZoeError> {
        self.inner.escrow(conditions, payments)
    }

    /// Burn an invite, returning its extent and the capability bound to it.
    pub fn unwrap_invite(&self, invite: &Payment) -> Result<UnwrappedInvite, ZoeError> {
        self.inner.unwrap_invite(invite)
    }

    /// Burn a payoff payment, returning the parked payoff.
    pub fn redeem_payoff_payment(&self, payment: &Payment) -> Result<Payoff, ZoeError> {
        self.inner.redeem_payoff_payment(payment)
    }

    pub fn is_offer_active(&self, offer_id: OfferId) -> bool {
        self.inner.is_offer_active(offer_id)
    }

    pub fn get_offer_status(&self, offer_ids: &[OfferId]) -> OfferStatus {
        self.inner.get_status_for(offer_ids)
    }

    pub fn get_current_extents(&self, offer_id: OfferId) -> Result<Vec<Extent>, ZoeError> {
        let mut rows = self.inner.get_extents_for(&[offer_id])?;
        Ok(rows.pop().unwrap_or_default())
    }

    /// Follow an offer's allocation as contracts reallocate it.
    pub fn get_offer_notifier(&self, offer_id: OfferId) -> Result<OfferNotifier, ZoeError> {
        self.inner.offer_notifier(offer_id)
    }

    pub fn get_escrow_receipt_assay(&self) -> Assay {
        self.inner.escrow_receipt_assay()
    }

    pub fn get_invite_assay(&self) -> Assay {
        self.inner.invite_assay()
    }

    pub fn get_payout_assay(&self) -> Assay {
        self.inner.payoff_assay()
    }
}

impl fmt::Debug for Zoe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zoe")
            .field("config", self.inner.config())
            .finish_non_exhaustive()
    }
}
