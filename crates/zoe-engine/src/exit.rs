//! Exit handles returned by escrow.

use crate::engine::{Caller, ZoeInner};
use crate::error::ZoeError;
use crate::ids::OfferId;
use crate::payoff::Payoff;
use std::fmt;
use std::rc::{Rc, Weak};
use zoe_ertp::Payment;

/// The capability an escrowing player receives alongside their payoff.
#[derive(Debug, Clone)]
pub enum ExitHandle {
    /// `onDemand` offers: leave at any time.
    Cancel(CancelObj),
    /// `noExit` and `afterDeadline` offers: turn the payoff into a transferable payment.
    PayoffPayment(PayoffPaymentMaker),
}

impl ExitHandle {
    pub fn cancel_obj(&self) -> Option<&CancelObj> {
        match self {
            Self::Cancel(cancel) => Some(cancel),
            Self::PayoffPayment(_) => None,
        }
    }

    pub fn payoff_payment_maker(&self) -> Option<&PayoffPaymentMaker> {
        match self {
            Self::PayoffPayment(maker) => Some(maker),
            Self::Cancel(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct CancelObj {
    zoe: Weak<ZoeInner>,
    offer_id: OfferId,
}

impl CancelObj {
    pub(crate) fn new(zoe: Weak<ZoeInner>, offer_id: OfferId) -> Self {
        Self { zoe, offer_id }
    }

    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    /// Complete the offer now, paying out its current extents.
    ///
    /// Fails with [`ZoeError::AlreadyCompleted`] once the offer is done.
    pub fn cancel(&self) -> Result<(), ZoeError> {
        let zoe = self.zoe.upgrade().ok_or(ZoeError::ServiceGone)?;
        zoe.complete(Caller::Zoe, &[self.offer_id])?;
        tracing::info!(offer_id = %self.offer_id, "offer cancelled by player");
        Ok(())
    }
}

impl fmt::Debug for CancelObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelObj")
            .field("offer_id", &self.offer_id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct PayoffPaymentMaker {
    zoe: Weak<ZoeInner>,
    offer_id: OfferId,
}

impl PayoffPaymentMaker {
    pub(crate) fn new(zoe: Weak<ZoeInner>, offer_id: OfferId) -> Self {
        Self { zoe, offer_id }
    }

    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    /// Park this offer's payoff inside Zoe and return a payoff-assay
    /// payment that redeems it via `Zoe::redeem_payoff_payment`.
    pub fn make_payoff_payment(&self, payoff: Payoff) -> Result<Payment, ZoeError> {
        let zoe: Rc<ZoeInner> = self.zoe.upgrade().ok_or(ZoeError::ServiceGone)?;
        zoe.make_payoff_payment(self.offer_id, payoff)
    }
}

impl fmt::Debug for PayoffPaymentMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayoffPaymentMaker")
            .field("offer_id", &self.offer_id)
            .finish_non_exhaustive()
    }
}
