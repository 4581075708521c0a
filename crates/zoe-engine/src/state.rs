//! Zoe's bookkeeping tables.
//!
//! This is storage only. Lookups resolve handles to records; mutators
//! apply changes the engine has already validated. No invariant is
//! checked here.

use crate::contract::Contract;
use crate::error::ZoeError;
use crate::ids::{InstallationId, InstanceId, OfferId};
use crate::payoff::{Payoff, PayoffSender};
use crate::rules::{OfferConditions, PayoutRule};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tokio::sync::watch;
use zoe_ertp::{Assay, AssayId, AssetDesc, AssetDescOps, Extent, ExtentOps, Label, PaymentId, Purse};

/// An assay Zoe can hold in escrow, with the purse that backs all offers of it.
pub(crate) struct AssayRecord {
    pub(crate) assay: Assay,
    pub(crate) purse: Purse,
}

impl AssayRecord {
    pub(crate) fn desc_ops(&self) -> &AssetDescOps {
        self.assay.get_desc_ops()
    }

    pub(crate) fn extent_ops(&self) -> Rc<dyn ExtentOps> {
        Rc::clone(self.desc_ops().get_extent_ops())
    }

    pub(crate) fn label(&self) -> &Label {
        self.assay.get_label()
    }
}

pub(crate) struct InstanceRecord {
    pub(crate) installation_id: InstallationId,
    /// `None` while the contract is still being built.
    pub(crate) contract_object: Option<Rc<dyn Any>>,
    pub(crate) terms: Value,
    pub(crate) assays: Vec<AssayId>,
    pub(crate) offer_ids: BTreeSet<OfferId>,
}

pub(crate) struct OfferRecord {
    /// The instance allowed to reallocate and complete this offer.
    pub(crate) instance_id: Option<InstanceId>,
    pub(crate) assays: Vec<AssayId>,
    pub(crate) conditions: OfferConditions,
    pub(crate) extents: Vec<Extent>,
    pub(crate) active: bool,
    pub(crate) payoff: Option<PayoffSender>,
    /// Empty offers a contract made for itself or for an invite.
    pub(crate) seat: bool,
    /// The escrow receipt, until a contract burns it.
    pub(crate) receipt: Option<PaymentId>,
    pub(crate) notifier: watch::Sender<Vec<Extent>>,
}

impl OfferRecord {
    pub(crate) fn new(
        instance_id: Option<InstanceId>,
        assays: Vec<AssayId>,
        conditions: OfferConditions,
        extents: Vec<Extent>,
        payoff: PayoffSender,
    ) -> Self {
        let (notifier, _) = watch::channel(extents.clone());
        Self {
            instance_id,
            assays,
            conditions,
            extents,
            active: true,
            payoff: Some(payoff),
            seat: false,
            receipt: None,
            notifier,
        }
    }

    fn publish(&mut self, extents: Vec<Extent>) {
        self.notifier.send_replace(extents.clone());
        self.extents = extents;
    }
}

/// A minted invite's bound capability and the payoff of its seat offer.
pub(crate) struct InviteRecord {
    pub(crate) invite: PaymentId,
    pub(crate) capability: Rc<dyn Any>,
    pub(crate) payoff: Payoff,
}

/// Partition of a set of offers by whether they can still be reallocated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OfferStatus {
    pub active: Vec<OfferId>,
    pub inactive: Vec<OfferId>,
}

#[derive(Default)]
pub(crate) struct ZoeState {
    installations: BTreeMap<InstallationId, Rc<dyn Contract>>,
    instances: BTreeMap<InstanceId, InstanceRecord>,
    offers: BTreeMap<OfferId, OfferRecord>,
    retired: BTreeSet<OfferId>,
    /// Receipts revoked when their offer left before being accepted.
    revoked_receipts: BTreeMap<PaymentId, OfferId>,
    assays: BTreeMap<AssayId, AssayRecord>,
    invites: BTreeMap<OfferId, InviteRecord>,
    parked_payoffs: BTreeMap<OfferId, Payoff>,
}

impl ZoeState {
    // ---- installations and instances ----

    pub(crate) fn insert_installation(&mut self, contract: Rc<dyn Contract>) -> InstallationId {
        let id = InstallationId::new();
        self.installations.insert(id, contract);
        id
    }

    pub(crate) fn installation(&self, id: InstallationId) -> Result<Rc<dyn Contract>, ZoeError> {
        self.installations
            .get(&id)
            .cloned()
            .ok_or(ZoeError::UnknownInstallation(id))
    }

    pub(crate) fn insert_instance(&mut self, id: InstanceId, record: InstanceRecord) {
        self.instances.insert(id, record);
    }

    pub(crate) fn remove_instance(&mut self, id: InstanceId) -> Option<InstanceRecord> {
        self.instances.remove(&id)
    }

    pub(crate) fn instance(&self, id: InstanceId) -> Result<&InstanceRecord, ZoeError> {
        self.instances.get(&id).ok_or(ZoeError::UnknownInstance(id))
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> Result<&mut InstanceRecord, ZoeError> {
        self.instances.get_mut(&id).ok_or(ZoeError::UnknownInstance(id))
    }

    // ---- assays ----

    /// Register an assay with a fresh backing purse. Registering twice is a no-op.
    pub(crate) fn insert_assay(&mut self, assay: &Assay) -> AssayId {
        let id = assay.id();
        self.assays.entry(id).or_insert_with(|| AssayRecord {
            purse: assay.make_empty_purse("zoe escrow"),
            assay: assay.clone(),
        });
        id
    }

    pub(crate) fn assay(&self, id: AssayId) -> Result<&AssayRecord, ZoeError> {
        self.assays.get(&id).ok_or(ZoeError::UnknownAssay(id))
    }

    pub(crate) fn extent_ops_for(&self, assays: &[AssayId]) -> Result<Vec<Rc<dyn ExtentOps>>, ZoeError> {
        assays
            .iter()
            .map(|id| Ok(self.assay(*id)?.extent_ops()))
            .collect()
    }

    // ---- offers ----

    /// Lookup one live offer. Retired offers report `AlreadyCompleted`.
    pub(crate) fn offer(&self, id: OfferId) -> Result<&OfferRecord, ZoeError> {
        match self.offers.get(&id) {
            Some(record) => Ok(record),
            None if self.retired.contains(&id) => Err(ZoeError::AlreadyCompleted(id)),
            None => Err(ZoeError::UnknownOffer(id)),
        }
    }

    pub(crate) fn offer_mut(&mut self, id: OfferId) -> Result<&mut OfferRecord, ZoeError> {
        if self.retired.contains(&id) {
            return Err(ZoeError::AlreadyCompleted(id));
        }
        self.offers.get_mut(&id).ok_or(ZoeError::UnknownOffer(id))
    }

    #[cfg(test)]
    pub(crate) fn is_retired(&self, id: OfferId) -> bool {
        self.retired.contains(&id)
    }

    /// Fails with `OfferNotOwned` unless every live offer in `ids` is bound
    /// to `instance_id`. Retired ids pass.
    pub(crate) fn insist_owned_by(&self, instance_id: InstanceId, ids: &[OfferId]) -> Result<(), ZoeError> {
        for id in ids {
            match self.offers.get(id) {
                Some(record) if record.instance_id != Some(instance_id) => {
                    return Err(ZoeError::OfferNotOwned {
                        offer_id: *id,
                        instance_id,
                    });
                }
                Some(_) => {}
                None if self.retired.contains(id) => {}
                None => return Err(ZoeError::UnknownOffer(*id)),
            }
        }
        Ok(())
    }

    pub(crate) fn get_extents_for(&self, ids: &[OfferId]) -> Result<Vec<Vec<Extent>>, ZoeError> {
        ids.iter()
            .map(|id| Ok(self.offer(*id)?.extents.clone()))
            .collect()
    }

    pub(crate) fn get_payout_rules_for(&self, ids: &[OfferId]) -> Result<Vec<Vec<PayoutRule>>, ZoeError> {
        ids.iter()
            .map(|id| Ok(self.offer(*id)?.conditions.payout_rules.clone()))
            .collect()
    }

    /// Offers that are unknown or retired count as inactive.
    pub(crate) fn get_status_for(&self, ids: &[OfferId]) -> OfferStatus {
        let mut status = OfferStatus::default();
        for id in ids {
            match self.offers.get(id) {
                Some(record) if record.active => status.active.push(*id),
                _ => status.inactive.push(*id),
            }
        }
        status
    }

    pub(crate) fn record_offer(&mut self, id: OfferId, record: OfferRecord) {
        if let Some(instance_id) = record.instance_id {
            if let Some(instance) = self.instances.get_mut(&instance_id) {
                instance.offer_ids.insert(id);
            }
        }
        self.offers.insert(id, record);
    }

    /// Attach an offer to the instance that accepted it.
    pub(crate) fn bind_offer(&mut self, id: OfferId, instance_id: InstanceId) -> Result<(), ZoeError> {
        self.offer_mut(id)?.instance_id = Some(instance_id);
        self.instance_mut(instance_id)?.offer_ids.insert(id);
        Ok(())
    }

    pub(crate) fn set_extents_for(&mut self, ids: &[OfferId], extents: Vec<Vec<Extent>>) -> Result<(), ZoeError> {
        for (id, row) in ids.iter().zip(extents) {
            self.offer_mut(*id)?.publish(row);
        }
        Ok(())
    }

    /// Stretch the instance's seats over every assay it now uses. A column
    /// a seat lacked holds nothing and wants nothing.
    pub(crate) fn widen_seats(&mut self, instance_id: InstanceId) -> Result<(), ZoeError> {
        let instance = self.instance(instance_id)?;
        let assays = instance.assays.clone();
        let offer_ids: Vec<OfferId> = instance.offer_ids.iter().copied().collect();
        let empties = assays
            .iter()
            .map(|id| Ok(self.assay(*id)?.desc_ops().empty()))
            .collect::<Result<Vec<AssetDesc>, ZoeError>>()?;

        for id in offer_ids {
            let Some(record) = self.offers.get_mut(&id) else {
                continue;
            };
            if !record.seat || record.assays == assays {
                continue;
            }
            let mut rules = Vec::with_capacity(assays.len());
            let mut extents = Vec::with_capacity(assays.len());
            for (assay_id, empty) in assays.iter().zip(&empties) {
                match record.assays.iter().position(|held| held == assay_id) {
                    Some(column) => {
                        rules.push(record.conditions.payout_rules[column].clone());
                        extents.push(record.extents[column].clone());
                    }
                    None => {
                        rules.push(PayoutRule::want_at_least(empty.clone()));
                        extents.push(empty.extent().clone());
                    }
                }
            }
            record.assays = assays.clone();
            record.conditions.payout_rules = rules;
            record.publish(extents);
        }
        Ok(())
    }

    pub(crate) fn set_offers_as_inactive(&mut self, ids: &[OfferId]) -> Result<(), ZoeError> {
        for id in ids {
            self.offer_mut(*id)?.active = false;
        }
        Ok(())
    }

    /// Delete offer records and retire their ids for good.
    pub(crate) fn remove_offers(&mut self, ids: &[OfferId]) -> Vec<(OfferId, OfferRecord)> {
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.offers.remove(id) {
                if let Some(instance) = record
                    .instance_id
                    .and_then(|instance_id| self.instances.get_mut(&instance_id))
                {
                    instance.offer_ids.remove(id);
                }
                removed.push((*id, record));
            }
            self.retired.insert(*id);
        }
        removed
    }

    pub(crate) fn revoke_receipt(&mut self, receipt: PaymentId, offer_id: OfferId) {
        self.revoked_receipts.insert(receipt, offer_id);
    }

    pub(crate) fn revoked_receipt(&self, receipt: PaymentId) -> Option<OfferId> {
        self.revoked_receipts.get(&receipt).copied()
    }

    // ---- invites and parked payoffs ----

    pub(crate) fn insert_invite(&mut self, offer_id: OfferId, record: InviteRecord) {
        self.invites.insert(offer_id, record);
    }

    pub(crate) fn take_invite(&mut self, offer_id: OfferId) -> Option<InviteRecord> {
        self.invites.remove(&offer_id)
    }

    pub(crate) fn contains_invite(&self, offer_id: OfferId) -> bool {
        self.invites.contains_key(&offer_id)
    }

    pub(crate) fn park_payoff(&mut self, payoff: Payoff) -> Result<(), ZoeError> {
        let offer_id = payoff.offer_id();
        if self.parked_payoffs.contains_key(&offer_id) {
            return Err(ZoeError::PayoffAlreadyTaken(offer_id));
        }
        self.parked_payoffs.insert(offer_id, payoff);
        Ok(())
    }

    pub(crate) fn has_parked_payoff(&self, offer_id: OfferId) -> bool {
        self.parked_payoffs.contains_key(&offer_id)
    }

    pub(crate) fn take_parked_payoff(&mut self, offer_id: OfferId) -> Result<Payoff, ZoeError> {
        self.parked_payoffs
            .remove(&offer_id)
            .ok_or(ZoeError::PayoffAlreadyTaken(offer_id))
    }
}
