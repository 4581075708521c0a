//! Mints: the sole authority able to create value of one kind.

use crate::assay::{Assay, Payment, Slot};
use crate::asset_desc::{AssetDesc, AssetDescLike};
use crate::error::ErtpError;
use crate::extent_ops::{ExtentOps, NatExtentOps};
use crate::ids::PaymentId;
use crate::purse::Purse;
use crate::registry::{ExtentOpsDescriptor, ExtentOpsRegistry};
use std::rc::Rc;

/// Creates new value for exactly one assay.
///
/// A mint is never cloned or transferred; whoever holds it controls supply.
#[derive(Debug)]
pub struct Mint {
    assay: Assay,
}

impl Mint {
    /// Create a mint and its assay over the given strategy.
    pub fn new(description: impl Into<String>, extent_ops: Rc<dyn ExtentOps>) -> Self {
        Self {
            assay: Assay::create(description.into(), extent_ops),
        }
    }

    /// Create a mint over a strategy resolved from a registry.
    pub fn from_descriptor(
        description: impl Into<String>,
        descriptor: &ExtentOpsDescriptor,
        registry: &ExtentOpsRegistry,
    ) -> Result<Self, ErtpError> {
        let extent_ops = registry.resolve(descriptor)?;
        Ok(Self::new(description, extent_ops))
    }

    /// Shorthand for a fungible mint over natural numbers.
    pub fn nat(description: impl Into<String>) -> Self {
        Self::new(description, Rc::new(NatExtentOps))
    }

    pub fn get_assay(&self) -> Assay {
        self.assay.clone()
    }

    /// Create new value in a fresh purse.
    pub fn mint(
        &self,
        initial: impl Into<AssetDescLike>,
        name: impl Into<String>,
    ) -> Result<Purse, ErtpError> {
        let balance = self.assay.get_desc_ops().coerce(initial)?;
        let name = name.into();
        tracing::debug!(assay = %self.assay.id(), minted = %balance, purse = %name, "minted purse");
        let id = self.assay.ledger().insert_purse(Slot { name, balance });
        Ok(Purse::new(id, self.assay.clone()))
    }

    /// Create new value directly as a payment.
    pub fn mint_payment(
        &self,
        initial: impl Into<AssetDescLike>,
        name: impl Into<String>,
    ) -> Result<Payment, ErtpError> {
        let balance = self.assay.get_desc_ops().coerce(initial)?;
        let name = name.into();
        tracing::debug!(assay = %self.assay.id(), minted = %balance, payment = %name, "minted payment");
        let id = self.assay.ledger().insert_payment(Slot { name, balance });
        Ok(Payment::new(id, self.assay.clone()))
    }

    /// Destroy an outstanding payment of this assay, wherever it is held.
    ///
    /// Only the mint can do this. Returns the revoked balance; a payment
    /// that was already consumed reports [`ErtpError::PaymentConsumed`].
    pub fn revoke(&self, payment: PaymentId) -> Result<AssetDesc, ErtpError> {
        let revoked = self.assay.ledger().remove_payment(payment)?.balance;
        tracing::debug!(assay = %self.assay.id(), revoked = %revoked, "revoked payment");
        Ok(revoked)
    }
}
