//! Per-offer allocation updates.

use crate::ids::OfferId;
use tokio::sync::watch;
use zoe_ertp::Extent;

/// Watches one offer's current allocation.
///
/// Every change Zoe makes to the offer's extents is published here. The
/// stream ends once the offer completes or exits.
#[derive(Debug, Clone)]
pub struct OfferNotifier {
    offer_id: OfferId,
    receiver: watch::Receiver<Vec<Extent>>,
}

impl OfferNotifier {
    pub(crate) fn new(offer_id: OfferId, receiver: watch::Receiver<Vec<Extent>>) -> Self {
        Self { offer_id, receiver }
    }

    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    /// The most recently published extents.
    pub fn current(&self) -> Vec<Extent> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next allocation not yet seen by this notifier.
    ///
    /// Returns `None` once the offer is gone and every update was observed.
    pub async fn next_update(&mut self) -> Option<Vec<Extent>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Whether the offer has completed or exited.
    pub fn is_done(&self) -> bool {
        self.receiver.has_changed().is_err()
    }
}
