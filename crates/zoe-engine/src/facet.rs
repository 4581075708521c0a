//! The contract facet: the only handle a governing contract has on Zoe.
//!
//! Each facet is scoped to one instance. It can reallocate and complete
//! only offers bound to that instance, and every reallocation is checked
//! for conservation and offer safety before it lands.

use crate::engine::{Caller, ZoeInner};
use crate::error::ZoeError;
use crate::ids::{InstanceId, OfferId};
use crate::payoff::Payoff;
use crate::rules::{OfferConditions, PayoutRule};
use crate::state::OfferStatus;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};
use zoe_ertp::{Assay, AssayId, AssetDescOps, Extent, ExtentOps, Label, Payment};

/// What burning an escrow receipt reveals about the offer behind it.
#[derive(Debug, Clone)]
pub struct EscrowReceiptRecord {
    pub offer_id: OfferId,
    pub conditions: OfferConditions,
}

/// An offer the contract escrowed itself.
#[derive(Debug)]
pub struct ContractEscrow {
    pub offer_id: OfferId,
    pub payoff: Payoff,
}

#[derive(Clone)]
pub struct ContractFacet {
    zoe: Weak<ZoeInner>,
    instance_id: InstanceId,
}

impl ContractFacet {
    pub(crate) fn new(zoe: Weak<ZoeInner>, instance_id: InstanceId) -> Self {
        Self { zoe, instance_id }
    }

    fn zoe(&self) -> Result<Rc<ZoeInner>, ZoeError> {
        self.zoe.upgrade().ok_or(ZoeError::ServiceGone)
    }

    pub fn get_instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Accept an offer: burn its receipt and bind the offer to this instance.
    ///
    /// Fails with [`ZoeError::OfferCancelled`] if the player already left.
    pub fn burn_escrow_receipt(&self, receipt: &Payment) -> Result<EscrowReceiptRecord, ZoeError> {
        self.zoe()?.burn_escrow_receipt(self.instance_id, receipt)
    }

    /// Move value among offers. `new_extents` has one row per offer and one
    /// column per assay, in the offers' assay order.
    pub fn reallocate(&self, offer_ids: &[OfferId], new_extents: Vec<Vec<Extent>>) -> Result<(), ZoeError> {
        self.zoe()?.reallocate(self.instance_id, offer_ids, new_extents)
    }

    /// Pay out the offers' current extents and retire them.
    pub fn complete(&self, offer_ids: &[OfferId]) -> Result<(), ZoeError> {
        self.zoe()?.complete(Caller::Instance(self.instance_id), offer_ids)
    }

    /// A seat: an empty offer over the instance's assays that wants nothing.
    /// Seats made while the contract starts cover every assay it ends up with.
    pub fn escrow_empty_offer(&self) -> Result<ContractEscrow, ZoeError> {
        self.zoe()?.escrow_empty_offer(self.instance_id)
    }

    /// Escrow payments the contract holds, skipping the receipt step.
    ///
    /// While the contract is starting, its assays must be registered with
    /// [`ContractFacet::add_assay`] first.
    pub fn escrow_offer(
        &self,
        conditions: OfferConditions,
        payments: &[Option<&Payment>],
    ) -> Result<ContractEscrow, ZoeError> {
        self.zoe()?.escrow_for_instance(self.instance_id, conditions, payments)
    }

    /// Mint an invite carrying `contract_extent` plus Zoe's own fields
    /// (`offerId`, `instanceId`, `installationId`, `terms`). Unwrapping the
    /// invite later yields `capability`.
    pub fn make_invite(&self, contract_extent: Value, capability: Rc<dyn Any>) -> Result<Payment, ZoeError> {
        self.zoe()?.make_invite(self.instance_id, contract_extent, capability)
    }

    /// Register another assay for this instance.
    pub fn add_assay(&self, assay: &Assay) -> Result<AssayId, ZoeError> {
        self.zoe()?.add_instance_assay(self.instance_id, assay)
    }

    pub fn get_assays(&self) -> Result<Vec<AssayId>, ZoeError> {
        self.zoe()?.instance_assays(self.instance_id)
    }

    /// Current extents of offers bound to this instance.
    ///
    /// Any other live offer fails with [`ZoeError::OfferNotOwned`].
    pub fn get_extents_for(&self, offer_ids: &[OfferId]) -> Result<Vec<Vec<Extent>>, ZoeError> {
        self.zoe()?.instance_extents_for(self.instance_id, offer_ids)
    }

    pub fn get_payout_rules_for(&self, offer_ids: &[OfferId]) -> Result<Vec<Vec<PayoutRule>>, ZoeError> {
        self.zoe()?.instance_payout_rules_for(self.instance_id, offer_ids)
    }

    /// Retired offers of this instance count as inactive.
    pub fn get_status_for(&self, offer_ids: &[OfferId]) -> Result<OfferStatus, ZoeError> {
        self.zoe()?.instance_status_for(self.instance_id, offer_ids)
    }

    pub fn get_extent_ops_array(&self) -> Result<Vec<Rc<dyn ExtentOps>>, ZoeError> {
        self.zoe()?.extent_ops_array(self.instance_id)
    }

    pub fn get_labels(&self) -> Result<Vec<Label>, ZoeError> {
        self.zoe()?.labels(self.instance_id)
    }

    pub fn get_asset_desc_ops_array(&self) -> Result<Vec<AssetDescOps>, ZoeError> {
        self.zoe()?.asset_desc_ops_array(self.instance_id)
    }
}

impl fmt::Debug for ContractFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractFacet")
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}
