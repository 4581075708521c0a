//! Purses: long-lived, mutable balance cells.

use crate::assay::{Assay, Payment, Slot};
use crate::asset_desc::{AssetDesc, AssetDescLike};
use crate::error::ErtpError;
use crate::ids::PurseId;
use std::fmt;

/// A balance holder. Cloning shares the same balance.
#[derive(Clone)]
pub struct Purse {
    id: PurseId,
    assay: Assay,
}

impl Purse {
    pub(crate) fn new(id: PurseId, assay: Assay) -> Self {
        Self { id, assay }
    }

    pub fn id(&self) -> PurseId {
        self.id
    }

    pub fn get_assay(&self) -> Assay {
        self.assay.clone()
    }

    pub fn get_name(&self) -> Result<String, ErtpError> {
        Ok(self.assay.ledger().purse(self.id)?.name.clone())
    }

    pub fn get_balance(&self) -> Result<AssetDesc, ErtpError> {
        Ok(self.assay.ledger().purse(self.id)?.balance.clone())
    }

    /// Deposit a payment whose balance must equal `desc`. Returns the amount deposited.
    pub fn deposit_exactly(
        &self,
        desc: impl Into<AssetDescLike>,
        payment: &Payment,
    ) -> Result<AssetDesc, ErtpError> {
        let asserted = self.assay.get_desc_ops().coerce(desc)?;
        self.assay.insist_owned(payment)?;
        let mut ledger = self.assay.ledger();
        let amount = ledger.payment(payment.id())?.balance.clone();
        self.assay.insist_balance(&asserted, &amount)?;
        let updated = self
            .assay
            .get_desc_ops()
            .with(&ledger.purse(self.id)?.balance, &amount)?;

        ledger.remove_payment(payment.id())?;
        ledger.purse_mut(self.id)?.balance = updated;
        Ok(amount)
    }

    /// Deposit a payment in full. Returns the amount deposited.
    pub fn deposit_all(&self, payment: &Payment) -> Result<AssetDesc, ErtpError> {
        self.assay.insist_owned(payment)?;
        let mut ledger = self.assay.ledger();
        let amount = ledger.payment(payment.id())?.balance.clone();
        let updated = self
            .assay
            .get_desc_ops()
            .with(&ledger.purse(self.id)?.balance, &amount)?;

        ledger.remove_payment(payment.id())?;
        ledger.purse_mut(self.id)?.balance = updated;
        Ok(amount)
    }

    /// Move `desc` out of the purse into a fresh payment.
    pub fn withdraw(
        &self,
        desc: impl Into<AssetDescLike>,
        name: impl Into<String>,
    ) -> Result<Payment, ErtpError> {
        let ops = self.assay.get_desc_ops();
        let amount = ops.coerce(desc)?;
        let mut ledger = self.assay.ledger();
        let balance = &ledger.purse(self.id)?.balance;
        if !ops.includes(balance, &amount)? {
            return Err(ErtpError::InsufficientFunds {
                requested: amount.to_string(),
                balance: balance.to_string(),
            });
        }
        let remainder = ops.without(balance, &amount)?;

        ledger.purse_mut(self.id)?.balance = remainder;
        let id = ledger.insert_payment(Slot {
            name: name.into(),
            balance: amount,
        });
        Ok(Payment::new(id, self.assay.clone()))
    }

    /// Empty the purse into a fresh payment.
    pub fn withdraw_all(&self, name: impl Into<String>) -> Result<Payment, ErtpError> {
        let balance = self.get_balance()?;
        self.withdraw(balance, name)
    }
}

impl fmt::Debug for Purse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Purse")
            .field("id", &self.id)
            .field("assay", &self.assay.get_label().description())
            .finish()
    }
}
