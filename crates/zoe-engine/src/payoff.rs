//! Payoffs: the eventual payments of one offer.

use crate::error::ZoeError;
use crate::ids::OfferId;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use zoe_ertp::Payment;

pub(crate) type PayoffSender = oneshot::Sender<Vec<Payment>>;

/// Resolves to one payment per assay of the offer once it completes.
///
/// Resolves to [`ZoeError::PayoffDropped`] if Zoe is dropped first.
pub struct Payoff {
    offer_id: OfferId,
    receiver: oneshot::Receiver<Vec<Payment>>,
}

impl Payoff {
    pub(crate) fn channel(offer_id: OfferId) -> (PayoffSender, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { offer_id, receiver })
    }

    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    /// Take the payments without waiting, if the offer has completed.
    pub fn try_take(&mut self) -> Result<Option<Vec<Payment>>, ZoeError> {
        match self.receiver.try_recv() {
            Ok(payments) => Ok(Some(payments)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(ZoeError::PayoffDropped(self.offer_id)),
        }
    }
}

impl Future for Payoff {
    type Output = Result<Vec<Payment>, ZoeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let offer_id = this.offer_id;
        Pin::new(&mut this.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| ZoeError::PayoffDropped(offer_id)))
    }
}

impl fmt::Debug for Payoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payoff")
            .field("offer_id", &self.offer_id)
            .finish_non_exhaustive()
    }
}
