//! Assays and payments.
//!
//! An [`Assay`] is the public face of one kind of value: anyone holding it
//! can validate, split, combine, claim, or burn payments of that kind. The
//! balances themselves live in the assay's ledger, an explicit table keyed
//! by opaque handles. Consuming a payment removes its slot; nothing relies
//! on drop order or garbage collection for correctness.
//!
//! Every operation validates first and commits last. Once the first slot
//! is mutated, no later step can fail.

use crate::asset_desc::{AssetDesc, AssetDescLike, AssetDescOps};
use crate::error::ErtpError;
use crate::extent_ops::ExtentOps;
use crate::ids::{AssayId, PaymentId, PurseId};
use crate::label::Label;
use crate::purse::Purse;
use crate::registry::ExtentOpsDescriptor;
use std::cell::{RefCell, RefMut};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// One holder's balance.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) name: String,
    pub(crate) balance: AssetDesc,
}

/// Balances of every live purse and payment of one assay.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    purses: HashMap<PurseId, Slot>,
    payments: HashMap<PaymentId, Slot>,
}

impl Ledger {
    pub(crate) fn payment(&self, id: PaymentId) -> Result<&Slot, ErtpError> {
        self.payments.get(&id).ok_or(ErtpError::PaymentConsumed(id))
    }

    pub(crate) fn remove_payment(&mut self, id: PaymentId) -> Result<Slot, ErtpError> {
        self.payments.remove(&id).ok_or(ErtpError::PaymentConsumed(id))
    }

    pub(crate) fn insert_payment(&mut self, slot: Slot) -> PaymentId {
        let id = PaymentId::new();
        self.payments.insert(id, slot);
        id
    }

    pub(crate) fn purse(&self, id: PurseId) -> Result<&Slot, ErtpError> {
        self.purses.get(&id).ok_or(ErtpError::UnknownPurse(id))
    }

    pub(crate) fn purse_mut(&mut self, id: PurseId) -> Result<&mut Slot, ErtpError> {
        self.purses.get_mut(&id).ok_or(ErtpError::UnknownPurse(id))
    }

    pub(crate) fn insert_purse(&mut self, slot: Slot) -> PurseId {
        let id = PurseId::new();
        self.purses.insert(id, slot);
        id
    }
}

struct AssayCore {
    id: AssayId,
    desc_ops: AssetDescOps,
    ledger: RefCell<Ledger>,
}

/// Public capability for one kind of value.
///
/// Cloning an `Assay` clones the capability, not the ledger.
#[derive(Clone)]
pub struct Assay {
    core: Rc<AssayCore>,
}

impl Assay {
    pub(crate) fn create(description: String, extent_ops: Rc<dyn ExtentOps>) -> Self {
        let id = AssayId::new();
        let desc_ops = AssetDescOps::new(Label::new(id, description), extent_ops);
        Self {
            core: Rc::new(AssayCore {
                id,
                desc_ops,
                ledger: RefCell::new(Ledger::default()),
            }),
        }
    }

    pub fn id(&self) -> AssayId {
        self.core.id
    }

    pub fn get_label(&self) -> &Label {
        self.core.desc_ops.get_label()
    }

    pub fn get_desc_ops(&self) -> &AssetDescOps {
        &self.core.desc_ops
    }

    pub fn get_extent_ops_descriptor(&self) -> ExtentOpsDescriptor {
        self.core.desc_ops.get_extent_ops_descriptor()
    }

    pub fn make_empty_purse(&self, name: impl Into<String>) -> Purse {
        let slot = Slot {
            name: name.into(),
            balance: self.core.desc_ops.empty(),
        };
        let id = self.ledger().insert_purse(slot);
        Purse::new(id, self.clone())
    }

    /// Whether `payment` is an unspent payment of this assay.
    pub fn is_live(&self, payment: &Payment) -> bool {
        payment.assay.id() == self.id() && self.ledger().payment(payment.id).is_ok()
    }

    /// Merge payments into one, destroying the inputs.
    pub fn combine(&self, payments: &[&Payment], name: impl Into<String>) -> Result<Payment, ErtpError> {
        let mut ledger = self.ledger();
        let mut seen = BTreeSet::new();
        let mut total = self.core.desc_ops.empty();
        for payment in payments {
            self.insist_owned(payment)?;
            if !seen.insert(payment.id) {
                return Err(ErtpError::DuplicatePayment(payment.id));
            }
            let balance = &ledger.payment(payment.id)?.balance;
            total = self.core.desc_ops.with(&total, balance)?;
        }

        for payment in payments {
            ledger.remove_payment(payment.id)?;
        }
        let id = ledger.insert_payment(Slot {
            name: name.into(),
            balance: total,
        });
        Ok(Payment::new(id, self.clone()))
    }

    /// Split a payment into new payments with exactly the given balances.
    pub fn split(&self, payment: &Payment, descs: &[AssetDesc]) -> Result<Vec<Payment>, ErtpError> {
        self.insist_owned(payment)?;
        let mut ledger = self.ledger();
        let source = ledger.payment(payment.id)?;
        let ops = &self.core.desc_ops;

        let mut parts = Vec::with_capacity(descs.len());
        let mut total = ops.empty();
        for desc in descs {
            let part = ops.coerce(desc)?;
            total = ops.with(&total, &part)?;
            parts.push(part);
        }
        if !ops.equals(&total, &source.balance)? {
            return Err(ErtpError::SplitMismatch {
                total: total.to_string(),
                balance: source.balance.to_string(),
            });
        }

        let source = ledger.remove_payment(payment.id)?;
        let payments = parts
            .into_iter()
            .map(|balance| {
                let id = ledger.insert_payment(Slot {
                    name: source.name.clone(),
                    balance,
                });
                Payment::new(id, self.clone())
            })
            .collect();
        Ok(payments)
    }

    /// Exchange a payment for a fresh one, asserting its balance.
    pub fn claim_exactly(
        &self,
        desc: impl Into<AssetDescLike>,
        payment: &Payment,
        name: impl Into<String>,
    ) -> Result<Payment, ErtpError> {
        let asserted = self.core.desc_ops.coerce(desc)?;
        self.insist_owned(payment)?;
        let mut ledger = self.ledger();
        self.insist_balance(&asserted, &ledger.payment(payment.id)?.balance)?;
        let source = ledger.remove_payment(payment.id)?;
        let id = ledger.insert_payment(Slot {
            name: name.into(),
            balance: source.balance,
        });
        Ok(Payment::new(id, self.clone()))
    }

    /// Exchange a payment for a fresh one with the same balance.
    pub fn claim_all(&self, payment: &Payment, name: impl Into<String>) -> Result<Payment, ErtpError> {
        self.insist_owned(payment)?;
        let mut ledger = self.ledger();
        let source = ledger.remove_payment(payment.id)?;
        let id = ledger.insert_payment(Slot {
            name: name.into(),
            balance: source.balance,
        });
        Ok(Payment::new(id, self.clone()))
    }

    /// Destroy a payment, asserting its balance. Returns what was burned.
    pub fn burn_exactly(
        &self,
        desc: impl Into<AssetDescLike>,
        payment: &Payment,
    ) -> Result<AssetDesc, ErtpError> {
        let asserted = self.core.desc_ops.coerce(desc)?;
        self.insist_owned(payment)?;
        let mut ledger = self.ledger();
        self.insist_balance(&asserted, &ledger.payment(payment.id)?.balance)?;
        let burned = ledger.remove_payment(payment.id)?.balance;
        tracing::debug!(assay = %self.id(), burned = %burned, "burned payment");
        Ok(burned)
    }

    /// Destroy a payment. Returns what was burned.
    pub fn burn_all(&self, payment: &Payment) -> Result<AssetDesc, ErtpError> {
        self.insist_owned(payment)?;
        let burned = self.ledger().remove_payment(payment.id)?.balance;
        tracing::debug!(assay = %self.id(), burned = %burned, "burned payment");
        Ok(burned)
    }

    pub(crate) fn ledger(&self) -> RefMut<'_, Ledger> {
        self.core.ledger.borrow_mut()
    }

    pub(crate) fn insist_owned(&self, payment: &Payment) -> Result<(), ErtpError> {
        if payment.assay.id() == self.id() {
            Ok(())
        } else {
            Err(ErtpError::WrongAssay {
                expected: self.id(),
                found: payment.assay.id(),
            })
        }
    }

    pub(crate) fn insist_balance(
        &self,
        asserted: &AssetDesc,
        actual: &AssetDesc,
    ) -> Result<(), ErtpError> {
        if self.core.desc_ops.equals(asserted, actual)? {
            Ok(())
        } else {
            Err(ErtpError::BalanceMismatch {
                asserted: asserted.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

impl PartialEq for Assay {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Assay {}

impl fmt::Debug for Assay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assay")
            .field("label", self.get_label())
            .finish()
    }
}

/// A linear, single-use bearer certificate.
///
/// Payments are not `Clone`. Any operation that takes a payment destroys
/// it; afterwards every use fails with [`ErtpError::PaymentConsumed`].
pub struct Payment {
    id: PaymentId,
    assay: Assay,
}

impl Payment {
    pub(crate) fn new(id: PaymentId, assay: Assay) -> Self {
        Self { id, assay }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn get_assay(&self) -> Assay {
        self.assay.clone()
    }

    pub fn get_balance(&self) -> Result<AssetDesc, ErtpError> {
        Ok(self.assay.ledger().payment(self.id)?.balance.clone())
    }

    pub fn get_name(&self) -> Result<String, ErtpError> {
        Ok(self.assay.ledger().payment(self.id)?.name.clone())
    }
}

impl fmt::Debug for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payment")
            .field("id", &self.id)
            .field("assay", &self.assay.get_label().description())
            .finish()
    }
}
