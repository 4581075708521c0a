//! The escrow engine shared by the public service and every contract facet.
//!
//! Every operation runs in two phases. The first reads Zoe's tables and the
//! assay ledgers, performs every check that can fail, and prepares the new
//! values. The second applies them. Contract code, timers, and payoff
//! receivers are never invoked while the tables are borrowed.

use crate::config::ZoeConfig;
use crate::conservation::conservation_violation;
use crate::contract::Contract;
use crate::error::ZoeError;
use crate::exit::{CancelObj, ExitHandle, PayoffPaymentMaker};
use crate::facet::{ContractEscrow, ContractFacet, EscrowReceiptRecord};
use crate::ids::{InstallationId, InstanceId, OfferId};
use crate::notifier::OfferNotifier;
use crate::offer_safety::is_offer_safe_for_player;
use crate::payoff::Payoff;
use crate::rules::{ExitCondition, ExitKind, OfferConditions, PayoutRule};
use crate::service::{EscrowResult, InstanceInfo, UnwrappedInvite};
use crate::state::{InstanceRecord, InviteRecord, OfferRecord, OfferStatus, ZoeState};
use crate::timer::Timer;
use serde_json::{Value, json};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use zoe_ertp::{
    Assay, AssayId, AssetDesc, AssetDescOps, ErtpError, Extent, ExtentOps, Label, Mint, Payment,
    PaymentId, UniExtentOps,
};

const OFFER_ID_KEY: &str = "offerId";

/// Who is asking. Facets may only touch offers bound to their instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Caller {
    Zoe,
    Instance(InstanceId),
}

/// An escrow that passed validation and is ready to commit.
struct PreparedEscrow {
    instance_id: Option<InstanceId>,
    assays: Vec<AssayId>,
    conditions: OfferConditions,
    extents: Vec<Extent>,
    seat: bool,
}

/// Result of committing an escrow.
struct Escrowed {
    offer_id: OfferId,
    payoff: Payoff,
    receipt: Option<Payment>,
}

pub(crate) struct ZoeInner {
    config: ZoeConfig,
    state: RefCell<ZoeState>,
    escrow_receipt_mint: Mint,
    invite_mint: Mint,
    payoff_mint: Mint,
}

impl ZoeInner {
    pub(crate) fn new(config: ZoeConfig) -> Rc<Self> {
        let offer_keyed = || Rc::new(UniExtentOps::requiring_key(OFFER_ID_KEY));
        Rc::new(Self {
            escrow_receipt_mint: Mint::new(config.escrow_receipt_description.clone(), offer_keyed()),
            invite_mint: Mint::new(config.invite_description.clone(), offer_keyed()),
            payoff_mint: Mint::new(config.payoff_description.clone(), offer_keyed()),
            state: RefCell::new(ZoeState::default()),
            config,
        })
    }

    pub(crate) fn config(&self) -> &ZoeConfig {
        &self.config
    }

    pub(crate) fn escrow_receipt_assay(&self) -> Assay {
        self.escrow_receipt_mint.get_assay()
    }

    pub(crate) fn invite_assay(&self) -> Assay {
        self.invite_mint.get_assay()
    }

    pub(crate) fn payoff_assay(&self) -> Assay {
        self.payoff_mint.get_assay()
    }

    // ---- installations and instances ----

    pub(crate) fn install(&self, contract: Rc<dyn Contract>) -> InstallationId {
        let name = contract.name().to_string();
        let id = self.state.borrow_mut().insert_installation(contract);
        tracing::info!(installation_id = %id, contract = %name, "installed contract");
        id
    }

    pub(crate) fn installation_name(&self, id: InstallationId) -> Result<String, ZoeError> {
        Ok(self.state.borrow().installation(id)?.name().to_string())
    }

    pub(crate) fn make_instance(
        self: &Rc<Self>,
        installation_id: InstallationId,
        terms: Value,
    ) -> Result<InstanceInfo, ZoeError> {
        let contract = self.state.borrow().installation(installation_id)?;
        let instance_id = InstanceId::new();
        self.state.borrow_mut().insert_instance(
            instance_id,
            InstanceRecord {
                installation_id,
                contract_object: None,
                terms: terms.clone(),
                assays: Vec::new(),
                offer_ids: BTreeSet::new(),
            },
        );

        let facet = ContractFacet::new(Rc::downgrade(self), instance_id);
        let built = match contract.make_contract(facet, &terms) {
            Ok(built) => built,
            Err(err) => {
                self.abandon_instance(instance_id);
                tracing::warn!(
                    installation_id = %installation_id,
                    contract = %contract.name(),
                    error = %err,
                    "contract failed to start"
                );
                return Err(ZoeError::ContractFailed {
                    contract: contract.name().to_string(),
                    reason: err.to_string(),
                });
            }
        };

        {
            let mut state = self.state.borrow_mut();
            let mut assays = Vec::with_capacity(built.assays.len());
            for assay in &built.assays {
                let id = state.insert_assay(assay);
                if !assays.contains(&id) {
                    assays.push(id);
                }
            }
            let record = state.instance_mut(instance_id)?;
            // Assays the contract registered while starting up keep their place after its own.
            for id in std::mem::take(&mut record.assays) {
                if !assays.contains(&id) {
                    assays.push(id);
                }
            }
            record.assays = assays;
            record.contract_object = Some(built.contract_object);
            // Seats made during startup only saw the assays registered so far.
            state.widen_seats(instance_id)?;
        }

        tracing::info!(
            installation_id = %installation_id,
            instance_id = %instance_id,
            contract = %contract.name(),
            "started contract instance"
        );
        self.get_instance(instance_id)
    }

    /// Drop a half-built instance and every offer it created.
    fn abandon_instance(&self, instance_id: InstanceId) {
        // Capabilities are dropped only after the tables are released.
        let _discarded = {
            let mut state = self.state.borrow_mut();
            let Some(record) = state.remove_instance(instance_id) else {
                return;
            };
            let offer_ids: Vec<OfferId> = record.offer_ids.into_iter().collect();
            let invites: Vec<_> = offer_ids.iter().filter_map(|id| state.take_invite(*id)).collect();
            for invite in &invites {
                self.revoke(&self.invite_mint, invite.invite);
            }
            (invites, state.remove_offers(&offer_ids))
        };
    }

    /// Free the ledger slot of a payment Zoe minted and nobody will redeem.
    fn revoke(&self, mint: &Mint, payment: PaymentId) {
        if let Err(err) = mint.revoke(payment) {
            tracing::debug!(payment = %payment, error = %err, "payment was already consumed");
        }
    }

    pub(crate) fn get_instance(&self, instance_id: InstanceId) -> Result<InstanceInfo, ZoeError> {
        let state = self.state.borrow();
        let record = state.instance(instance_id)?;
        let instance = record
            .contract_object
            .clone()
            .ok_or(ZoeError::UnknownInstance(instance_id))?;
        Ok(InstanceInfo {
            installation_id: record.installation_id,
            instance_id,
            instance,
            terms: record.terms.clone(),
            offer_ids: record.offer_ids.iter().copied().collect(),
        })
    }

    // ---- assays ----

    pub(crate) fn add_assay(&self, assay: &Assay) -> AssayId {
        let id = self.state.borrow_mut().insert_assay(assay);
        tracing::debug!(assay = %id, description = %assay.get_label().description(), "registered assay");
        id
    }

    pub(crate) fn add_instance_assay(&self, instance_id: InstanceId, assay: &Assay) -> Result<AssayId, ZoeError> {
        let mut state = self.state.borrow_mut();
        state.instance(instance_id)?;
        let id = state.insert_assay(assay);
        let record = state.instance_mut(instance_id)?;
        if !record.assays.contains(&id) {
            record.assays.push(id);
        }
        tracing::debug!(instance_id = %instance_id, assay = %id, "added assay to instance");
        Ok(id)
    }

    pub(crate) fn instance_assays(&self, instance_id: InstanceId) -> Result<Vec<AssayId>, ZoeError> {
        Ok(self.state.borrow().instance(instance_id)?.assays.clone())
    }

    pub(crate) fn extent_ops_array(&self, instance_id: InstanceId) -> Result<Vec<Rc<dyn ExtentOps>>, ZoeError> {
        let state = self.state.borrow();
        state.extent_ops_for(&state.instance(instance_id)?.assays)
    }

    pub(crate) fn labels(&self, instance_id: InstanceId) -> Result<Vec<Label>, ZoeError> {
        let state = self.state.borrow();
        state
            .instance(instance_id)?
            .assays
            .iter()
            .map(|id| Ok(state.assay(*id)?.label().clone()))
            .collect()
    }

    pub(crate) fn asset_desc_ops_array(&self, instance_id: InstanceId) -> Result<Vec<AssetDescOps>, ZoeError> {
        let state = self.state.borrow();
        state
            .instance(instance_id)?
            .assays
            .iter()
            .map(|id| Ok(state.assay(*id)?.desc_ops().clone()))
            .collect()
    }

    // ---- offers: reads ----

    pub(crate) fn get_extents_for(&self, offer_ids: &[OfferId]) -> Result<Vec<Vec<Extent>>, ZoeError> {
        self.state.borrow().get_extents_for(offer_ids)
    }

    pub(crate) fn get_status_for(&self, offer_ids: &[OfferId]) -> OfferStatus {
        self.state.borrow().get_status_for(offer_ids)
    }

    /// Reads on behalf of a contract see only offers bound to its instance.
    pub(crate) fn instance_extents_for(
        &self,
        instance_id: InstanceId,
        offer_ids: &[OfferId],
    ) -> Result<Vec<Vec<Extent>>, ZoeError> {
        let state = self.state.borrow();
        state.insist_owned_by(instance_id, offer_ids)?;
        state.get_extents_for(offer_ids)
    }

    pub(crate) fn instance_payout_rules_for(
        &self,
        instance_id: InstanceId,
        offer_ids: &[OfferId],
    ) -> Result<Vec<Vec<PayoutRule>>, ZoeError> {
        let state = self.state.borrow();
        state.insist_owned_by(instance_id, offer_ids)?;
        state.get_payout_rules_for(offer_ids)
    }

    pub(crate) fn instance_status_for(
        &self,
        instance_id: InstanceId,
        offer_ids: &[OfferId],
    ) -> Result<OfferStatus, ZoeError> {
        let state = self.state.borrow();
        state.insist_owned_by(instance_id, offer_ids)?;
        Ok(state.get_status_for(offer_ids))
    }

    pub(crate) fn offer_notifier(&self, offer_id: OfferId) -> Result<OfferNotifier, ZoeError> {
        let state = self.state.borrow();
        let record = state.offer(offer_id)?;
        Ok(OfferNotifier::new(offer_id, record.notifier.subscribe()))
    }

    pub(crate) fn is_offer_active(&self, offer_id: OfferId) -> bool {
        !self.get_status_for(&[offer_id]).active.is_empty()
    }

    // ---- escrow ----

    /// Escrow on behalf of a user: deposit payments, record the offer, mint
    /// its receipt, and hand back the exit handle its condition calls for.
    pub(crate) fn escrow(
        self: &Rc<Self>,
        conditions: OfferConditions,
        payments: &[Option<&Payment>],
    ) -> Result<EscrowResult, ZoeError> {
        if conditions.payout_rules.is_empty() {
            return Err(ZoeError::InvalidPayoutRule(
                "an offer needs at least one payout rule".to_string(),
            ));
        }
        let exit_kind = conditions.exit.kind();
        let prepared = self.prepare_escrow(None, conditions, payments)?;
        let escrowed = self.commit_escrow(prepared, payments, OfferId::new(), true)?;
        let escrow_receipt = escrowed.receipt.ok_or_else(|| {
            ZoeError::InvalidEscrowReceipt("receipt was not minted".to_string())
        })?;

        let zoe = Rc::downgrade(self);
        let exit = match exit_kind {
            ExitKind::OnDemand => ExitHandle::Cancel(CancelObj::new(zoe, escrowed.offer_id)),
            ExitKind::NoExit | ExitKind::AfterDeadline => {
                ExitHandle::PayoffPayment(PayoffPaymentMaker::new(zoe, escrowed.offer_id))
            }
        };
        Ok(EscrowResult {
            escrow_receipt,
            payoff: escrowed.payoff,
            exit,
        })
    }

    /// Escrow on behalf of a contract. The offer is bound to the instance at once.
    pub(crate) fn escrow_for_instance(
        self: &Rc<Self>,
        instance_id: InstanceId,
        conditions: OfferConditions,
        payments: &[Option<&Payment>],
    ) -> Result<ContractEscrow, ZoeError> {
        self.state.borrow().instance(instance_id)?;
        let prepared = self.prepare_escrow(Some(instance_id), conditions, payments)?;
        let escrowed = self.commit_escrow(prepared, payments, OfferId::new(), false)?;
        Ok(ContractEscrow {
            offer_id: escrowed.offer_id,
            payoff: escrowed.payoff,
        })
    }

    /// A zero-balance offer over the instance's assays that wants nothing.
    pub(crate) fn escrow_empty_offer(self: &Rc<Self>, instance_id: InstanceId) -> Result<ContractEscrow, ZoeError> {
        let prepared = self.prepare_empty_offer(instance_id)?;
        let escrowed = self.commit_escrow(prepared, &[], OfferId::new(), false)?;
        Ok(ContractEscrow {
            offer_id: escrowed.offer_id,
            payoff: escrowed.payoff,
        })
    }

    fn prepare_empty_offer(&self, instance_id: InstanceId) -> Result<PreparedEscrow, ZoeError> {
        let state = self.state.borrow();
        let assays = state.instance(instance_id)?.assays.clone();
        let mut payout_rules = Vec::with_capacity(assays.len());
        let mut extents = Vec::with_capacity(assays.len());
        for id in &assays {
            let empty = state.assay(*id)?.desc_ops().empty();
            extents.push(empty.extent().clone());
            payout_rules.push(PayoutRule::want_at_least(empty));
        }
        Ok(PreparedEscrow {
            instance_id: Some(instance_id),
            assays,
            conditions: OfferConditions::new(payout_rules, ExitCondition::NoExit),
            extents,
            seat: true,
        })
    }

    fn prepare_escrow(
        &self,
        instance_id: Option<InstanceId>,
        conditions: OfferConditions,
        payments: &[Option<&Payment>],
    ) -> Result<PreparedEscrow, ZoeError> {
        let rules = &conditions.payout_rules;
        if payments.len() != rules.len() {
            return Err(ZoeError::PaymentMismatch {
                index: payments.len().min(rules.len()),
                reason: format!("{} payments for {} payout rules", payments.len(), rules.len()),
            });
        }

        let state = self.state.borrow();
        let mut assays = Vec::with_capacity(rules.len());
        let mut payout_rules = Vec::with_capacity(rules.len());
        let mut extents = Vec::with_capacity(rules.len());
        let mut seen = BTreeSet::new();
        for (index, (rule, payment)) in rules.iter().zip(payments).enumerate() {
            let assay_id = rule.asset_desc.label().assay();
            let record = state.assay(assay_id)?;
            if assays.contains(&assay_id) {
                return Err(ZoeError::InvalidPayoutRule(format!(
                    "assay {assay_id} appears in more than one payout rule"
                )));
            }
            let ops = record.desc_ops();
            let desc = ops.coerce(&rule.asset_desc)?;

            match (rule.kind.is_offer(), payment) {
                (true, Some(payment)) => {
                    if payment.get_assay() != record.assay {
                        return Err(ZoeError::PaymentMismatch {
                            index,
                            reason: format!("payment is not a {} payment", record.label()),
                        });
                    }
                    if !seen.insert(payment.id()) {
                        return Err(ErtpError::DuplicatePayment(payment.id()).into());
                    }
                    let balance = payment.get_balance()?;
                    if !ops.equals(&balance, &desc)? {
                        return Err(ZoeError::PaymentMismatch {
                            index,
                            reason: format!("payment holds {balance}, rule offers {desc}"),
                        });
                    }
                    // The backing purse must be able to absorb the deposit.
                    ops.with(record.purse.get_balance()?, &desc)?;
                    extents.push(desc.extent().clone());
                }
                (true, None) => {
                    return Err(ZoeError::PaymentMismatch {
                        index,
                        reason: format!("{} requires a payment", rule.kind),
                    });
                }
                (false, Some(_)) => {
                    return Err(ZoeError::PaymentMismatch {
                        index,
                        reason: format!("{} takes no payment", rule.kind),
                    });
                }
                (false, None) => extents.push(ops.empty().into_extent()),
            }
            assays.push(assay_id);
            payout_rules.push(PayoutRule::new(rule.kind, desc));
        }

        Ok(PreparedEscrow {
            instance_id,
            assays,
            conditions: OfferConditions::new(payout_rules, conditions.exit),
            extents,
            seat: false,
        })
    }

    fn commit_escrow(
        self: &Rc<Self>,
        prepared: PreparedEscrow,
        payments: &[Option<&Payment>],
        offer_id: OfferId,
        mint_receipt: bool,
    ) -> Result<Escrowed, ZoeError> {
        let receipt_desc = if mint_receipt {
            let conditions = serde_json::to_value(&prepared.conditions)
                .map_err(|err| ZoeError::InvalidPayoutRule(err.to_string()))?;
            let extent = Extent::Uni(Some(json!({ OFFER_ID_KEY: offer_id, "conditions": conditions })));
            Some(self.escrow_receipt_assay().get_desc_ops().make(extent)?)
        } else {
            None
        };

        let PreparedEscrow {
            instance_id,
            assays,
            conditions,
            extents,
            seat,
        } = prepared;
        let deadline = match &conditions.exit {
            ExitCondition::AfterDeadline { deadline, timer } => Some((*deadline, Rc::clone(timer))),
            _ => None,
        };
        let (sender, payoff) = Payoff::channel(offer_id);

        let receipt = {
            let mut state = self.state.borrow_mut();
            for ((assay_id, rule), payment) in assays.iter().zip(&conditions.payout_rules).zip(payments) {
                if let Some(payment) = payment {
                    state.assay(*assay_id)?.purse.deposit_exactly(&rule.asset_desc, payment)?;
                }
            }
            let receipt = receipt_desc
                .map(|desc| self.escrow_receipt_mint.mint_payment(desc, "escrow receipt"))
                .transpose()?;
            let mut record = OfferRecord::new(instance_id, assays, conditions, extents, sender);
            record.seat = seat;
            record.receipt = receipt.as_ref().map(Payment::id);
            state.record_offer(offer_id, record);
            receipt
        };

        if let Some((deadline, timer)) = deadline {
            self.schedule_deadline(offer_id, deadline, timer.as_ref());
        }

        match instance_id {
            Some(instance_id) => {
                tracing::info!(offer_id = %offer_id, instance_id = %instance_id, "contract escrowed offer")
            }
            None => tracing::info!(offer_id = %offer_id, "escrowed offer"),
        }
        Ok(Escrowed {
            offer_id,
            payoff,
            receipt,
        })
    }

    fn schedule_deadline(self: &Rc<Self>, offer_id: OfferId, deadline: u64, timer: &dyn Timer) {
        let zoe = Rc::downgrade(self);
        timer.set_wakeup(
            deadline,
            Box::new(move |now| {
                let Some(zoe) = zoe.upgrade() else {
                    return;
                };
                if !zoe.is_offer_active(offer_id) {
                    tracing::debug!(offer_id = %offer_id, now, "deadline passed after offer completed");
                    return;
                }
                match zoe.complete(Caller::Zoe, &[offer_id]) {
                    Ok(()) => tracing::info!(offer_id = %offer_id, now, "deadline reached, offer completed"),
                    Err(err) => tracing::warn!(offer_id = %offer_id, error = %err, "deadline completion failed"),
                }
            }),
        );
        tracing::debug!(offer_id = %offer_id, deadline, "scheduled deadline exit");
    }

    // ---- escrow receipts ----

    pub(crate) fn burn_escrow_receipt(
        &self,
        instance_id: InstanceId,
        receipt: &Payment,
    ) -> Result<EscrowReceiptRecord, ZoeError> {
        let receipt_assay = self.escrow_receipt_assay();
        if receipt.get_assay() != receipt_assay {
            return Err(ZoeError::InvalidEscrowReceipt(
                "payment was not issued by zoe's escrow receipt assay".to_string(),
            ));
        }
        let balance = match receipt.get_balance() {
            Err(ErtpError::PaymentConsumed(id)) => {
                return Err(match self.state.borrow().revoked_receipt(id) {
                    Some(offer_id) => ZoeError::OfferCancelled(offer_id),
                    None => ErtpError::PaymentConsumed(id).into(),
                });
            }
            other => other?,
        };
        let offer_id = offer_id_in(balance.extent())
            .ok_or_else(|| ZoeError::InvalidEscrowReceipt("receipt names no offer".to_string()))?;

        let mut state = self.state.borrow_mut();
        state.instance(instance_id)?;
        let record = match state.offer(offer_id) {
            Ok(record) if record.active => record,
            Ok(_) | Err(ZoeError::AlreadyCompleted(_)) => return Err(ZoeError::OfferCancelled(offer_id)),
            Err(err) => return Err(err),
        };
        if let Some(owner) = record.instance_id {
            if owner != instance_id {
                return Err(ZoeError::OfferNotOwned {
                    offer_id,
                    instance_id,
                });
            }
        }
        let conditions = record.conditions.clone();

        receipt_assay.burn_all(receipt)?;
        state.bind_offer(offer_id, instance_id)?;
        state.offer_mut(offer_id)?.receipt = None;
        tracing::debug!(offer_id = %offer_id, instance_id = %instance_id, "accepted escrow receipt");
        Ok(EscrowReceiptRecord {
            offer_id,
            conditions,
        })
    }

    // ---- reallocate ----

    /// Replace the extents of `offer_ids` with `new_extents`, provided rights
    /// are conserved and every touched offer stays safe.
    pub(crate) fn reallocate(
        &self,
        instance_id: InstanceId,
        offer_ids: &[OfferId],
        new_extents: Vec<Vec<Extent>>,
    ) -> Result<(), ZoeError> {
        insist_distinct(offer_ids)?;
        if new_extents.len() != offer_ids.len() {
            return Err(ZoeError::MalformedReallocation(format!(
                "{} offers but {} rows of extents",
                offer_ids.len(),
                new_extents.len()
            )));
        }
        let Some(first) = offer_ids.first() else {
            return Ok(());
        };

        let mut state = self.state.borrow_mut();
        let instance_assays = state.instance(instance_id)?.assays.clone();
        let assays = state.offer(*first)?.assays.clone();
        for id in offer_ids {
            let record = state.offer(*id)?;
            if !record.active {
                return Err(ZoeError::AlreadyCompleted(*id));
            }
            if record.instance_id != Some(instance_id) {
                return Err(ZoeError::OfferNotOwned {
                    offer_id: *id,
                    instance_id,
                });
            }
            if record.assays != assays {
                return Err(ZoeError::AssayMismatch {
                    offer_id: *id,
                    reason: "offers in one reallocation must range over the same assays".to_string(),
                });
            }
            if let Some(foreign) = record.assays.iter().find(|a| !instance_assays.contains(a)) {
                return Err(ZoeError::AssayMismatch {
                    offer_id: *id,
                    reason: format!("assay {foreign} is not used by instance {instance_id}"),
                });
            }
        }

        let extent_ops = state.extent_ops_for(&assays)?;
        let mut proposed = Vec::with_capacity(new_extents.len());
        for row in new_extents {
            if row.len() != assays.len() {
                return Err(ZoeError::MalformedReallocation(format!(
                    "row has {} extents, expected {}",
                    row.len(),
                    assays.len()
                )));
            }
            let row = row
                .into_iter()
                .zip(&extent_ops)
                .map(|(extent, ops)| ops.insist_kind(extent))
                .collect::<Result<Vec<_>, _>>()?;
            proposed.push(row);
        }

        let current = state.get_extents_for(offer_ids)?;
        if let Some(reason) = conservation_violation(&extent_ops, &current, &proposed)? {
            tracing::warn!(instance_id = %instance_id, %reason, "rejected reallocation");
            return Err(ZoeError::RightsNotConserved { reason });
        }
        let rules = state.get_payout_rules_for(offer_ids)?;
        for ((id, rules), row) in offer_ids.iter().zip(&rules).zip(&proposed) {
            if !is_offer_safe_for_player(&extent_ops, rules, row)? {
                tracing::warn!(instance_id = %instance_id, offer_id = %id, "rejected unsafe reallocation");
                return Err(ZoeError::OfferNotSafe(*id));
            }
        }

        state.set_extents_for(offer_ids, proposed)?;
        tracing::debug!(instance_id = %instance_id, offers = offer_ids.len(), "reallocated");
        Ok(())
    }

    // ---- complete ----

    /// Pay out and retire offers.
    pub(crate) fn complete(&self, caller: Caller, offer_ids: &[OfferId]) -> Result<(), ZoeError> {
        insist_distinct(offer_ids)?;
        let mut state = self.state.borrow_mut();

        let mut owed: BTreeMap<AssayId, AssetDesc> = BTreeMap::new();
        for id in offer_ids {
            let record = state.offer(*id)?;
            if !record.active {
                return Err(ZoeError::AlreadyCompleted(*id));
            }
            if let Caller::Instance(instance_id) = caller {
                if record.instance_id != Some(instance_id) {
                    return Err(ZoeError::OfferNotOwned {
                        offer_id: *id,
                        instance_id,
                    });
                }
            }
            for (assay_id, extent) in record.assays.iter().zip(&record.extents) {
                let ops = state.assay(*assay_id)?.desc_ops();
                let total = match owed.remove(assay_id) {
                    Some(total) => ops.with(total, extent)?,
                    None => ops.make(extent.clone())?,
                };
                owed.insert(*assay_id, total);
            }
        }
        for (assay_id, total) in &owed {
            let record = state.assay(*assay_id)?;
            let balance = record.purse.get_balance()?;
            if !record.desc_ops().includes(&balance, total)? {
                return Err(ErtpError::InsufficientFunds {
                    requested: total.to_string(),
                    balance: balance.to_string(),
                }
                .into());
            }
        }

        state.set_offers_as_inactive(offer_ids)?;
        let mut payouts = Vec::with_capacity(offer_ids.len());
        let mut unclaimed_invites = BTreeMap::new();
        for id in offer_ids {
            let record = state.offer(*id)?;
            let mut pays_nothing = true;
            let mut payments = Vec::with_capacity(record.assays.len());
            for (assay_id, extent) in record.assays.iter().zip(&record.extents) {
                let assay = state.assay(*assay_id)?;
                pays_nothing &= assay.extent_ops().is_empty(extent)?;
                payments.push(assay.purse.withdraw(extent, "payoff")?);
            }
            payouts.push(payments);
            // An unredeemed invite to an empty payout is retired with its seat.
            if pays_nothing {
                if let Some(invite) = state.take_invite(*id) {
                    unclaimed_invites.insert(*id, invite);
                }
            }
        }
        let removed = state.remove_offers(offer_ids);
        for (offer_id, record) in &removed {
            if let Some(receipt) = record.receipt {
                self.revoke(&self.escrow_receipt_mint, receipt);
                state.revoke_receipt(receipt, *offer_id);
            }
        }
        drop(state);

        for ((offer_id, mut record), payments) in removed.into_iter().zip(payouts) {
            if let Some(invite) = unclaimed_invites.remove(&offer_id) {
                self.revoke(&self.invite_mint, invite.invite);
                self.reclaim(offer_id, payments);
                tracing::debug!(offer_id = %offer_id, "retired unredeemed invite");
                continue;
            }
            let undelivered = match record.payoff.take() {
                Some(sender) => sender.send(payments).err(),
                None => Some(payments),
            };
            if let Some(payments) = undelivered {
                tracing::warn!(offer_id = %offer_id, "payoff receiver is gone, returning value to escrow");
                self.reclaim(offer_id, payments);
            }
        }
        tracing::info!(offers = offer_ids.len(), "completed offers");
        Ok(())
    }

    /// Return payments nobody can receive to their backing purses.
    fn reclaim(&self, offer_id: OfferId, payments: Vec<Payment>) {
        let state = self.state.borrow();
        for payment in payments {
            let result = state
                .assay(payment.get_assay().id())
                .and_then(|record| Ok(record.purse.deposit_all(&payment)?));
            if let Err(err) = result {
                tracing::warn!(offer_id = %offer_id, error = %err, "failed to reclaim payoff payment");
            }
        }
    }

    // ---- invites ----

    pub(crate) fn make_invite(
        self: &Rc<Self>,
        instance_id: InstanceId,
        contract_extent: Value,
        capability: Rc<dyn Any>,
    ) -> Result<Payment, ZoeError> {
        let Value::Object(mut fields) = contract_extent else {
            return Err(ZoeError::InvalidInvite(
                "invite extent must be a JSON object".to_string(),
            ));
        };
        let (installation_id, terms) = {
            let state = self.state.borrow();
            let record = state.instance(instance_id)?;
            (record.installation_id, record.terms.clone())
        };
        let prepared = self.prepare_empty_offer(instance_id)?;
        let offer_id = OfferId::new();
        fields.insert(OFFER_ID_KEY.to_string(), json!(offer_id));
        fields.insert("instanceId".to_string(), json!(instance_id));
        fields.insert("installationId".to_string(), json!(installation_id));
        fields.insert("terms".to_string(), terms);
        let desc = self
            .invite_assay()
            .get_desc_ops()
            .make(Extent::Uni(Some(Value::Object(fields))))?;

        let escrowed = self.commit_escrow(prepared, &[], offer_id, false)?;
        let invite = self.invite_mint.mint_payment(desc, "invite")?;
        self.state.borrow_mut().insert_invite(
            offer_id,
            InviteRecord {
                invite: invite.id(),
                capability,
                payoff: escrowed.payoff,
            },
        );
        tracing::info!(offer_id = %offer_id, instance_id = %instance_id, "minted invite");
        Ok(invite)
    }

    pub(crate) fn unwrap_invite(&self, invite: &Payment) -> Result<UnwrappedInvite, ZoeError> {
        let invite_assay = self.invite_assay();
        if invite.get_assay() != invite_assay {
            return Err(ZoeError::InvalidInvite(
                "payment was not issued by zoe's invite assay".to_string(),
            ));
        }
        let balance = invite.get_balance()?;
        let offer_id = offer_id_in(balance.extent())
            .ok_or_else(|| ZoeError::InvalidInvite("invite names no offer".to_string()))?;

        let mut state = self.state.borrow_mut();
        if !state.contains_invite(offer_id) {
            return Err(ZoeError::InvalidInvite(format!(
                "invite for offer {offer_id} was already redeemed"
            )));
        }
        invite_assay.burn_all(invite)?;
        let record = state
            .take_invite(offer_id)
            .ok_or_else(|| ZoeError::InvalidInvite(format!("invite for offer {offer_id} vanished")))?;
        let extent = match balance.into_extent() {
            Extent::Uni(Some(value)) => value,
            other => {
                return Err(ZoeError::InvalidInvite(format!("unexpected invite extent {other}")));
            }
        };
        tracing::debug!(offer_id = %offer_id, "unwrapped invite");
        Ok(UnwrappedInvite {
            offer_id,
            extent,
            capability: record.capability,
            payoff: record.payoff,
        })
    }

    // ---- payoff payments ----

    pub(crate) fn make_payoff_payment(&self, offer_id: OfferId, payoff: Payoff) -> Result<Payment, ZoeError> {
        if payoff.offer_id() != offer_id {
            return Err(ZoeError::PayoffMismatch {
                expected: offer_id,
                found: payoff.offer_id(),
            });
        }
        let desc = self
            .payoff_assay()
            .get_desc_ops()
            .make(Extent::Uni(Some(json!({ OFFER_ID_KEY: offer_id }))))?;
        self.state.borrow_mut().park_payoff(payoff)?;
        let payment = self.payoff_mint.mint_payment(desc, "payoff")?;
        tracing::debug!(offer_id = %offer_id, "parked payoff behind a payment");
        Ok(payment)
    }

    pub(crate) fn redeem_payoff_payment(&self, payment: &Payment) -> Result<Payoff, ZoeError> {
        let payoff_assay = self.payoff_assay();
        if payment.get_assay() != payoff_assay {
            return Err(ErtpError::WrongAssay {
                expected: payoff_assay.id(),
                found: payment.get_assay().id(),
            }
            .into());
        }
        let balance = payment.get_balance()?;
        let offer_id = offer_id_in(balance.extent()).ok_or_else(|| {
            ZoeError::InvalidPayoffPayment("payoff payment names no offer".to_string())
        })?;

        let mut state = self.state.borrow_mut();
        if !state.has_parked_payoff(offer_id) {
            return Err(ZoeError::PayoffAlreadyTaken(offer_id));
        }
        payoff_assay.burn_all(payment)?;
        state.take_parked_payoff(offer_id)
    }
}

fn insist_distinct(offer_ids: &[OfferId]) -> Result<(), ZoeError> {
    let mut seen = BTreeSet::new();
    for id in offer_ids {
        if !seen.insert(*id) {
            return Err(ZoeError::DuplicateOffer(*id));
        }
    }
    Ok(())
}

/// The offer id carried by a receipt, invite, or payoff extent.
fn offer_id_in(extent: &Extent) -> Option<OfferId> {
    let value = extent.as_uni()?.get(OFFER_ID_KEY)?;
    serde_json::from_value(value.clone()).ok()
}
