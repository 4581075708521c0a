//! Offer safety: every player either gets back what they offered or gets
//! what they wanted.
//!
//! The check is holistic, not per rule. A player is made whole on refund
//! when every offer-kind rule is honoured, and on winnings when every
//! want-kind rule is honoured. Either one is enough; both at once is fine.
//! A side with no rules of its kind cannot make the player whole, so an
//! offer that only wants something is safe only when it gets it.

use crate::error::ZoeError;
use crate::rules::{PayoutRule, PayoutRuleKind};
use std::rc::Rc;
use zoe_ertp::{Extent, ExtentOps};

/// Result of checking one player's proposed extents against their rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferSafety {
    pub refund_ok: bool,
    pub winnings_ok: bool,
}

impl OfferSafety {
    pub fn is_safe(self) -> bool {
        self.refund_ok || self.winnings_ok
    }
}

/// Evaluate both halves of the safety predicate for one player.
///
/// `extent_ops`, `payout_rules`, and `extents` are parallel arrays, one
/// element per assay.
pub fn evaluate_offer_safety(
    extent_ops: &[Rc<dyn ExtentOps>],
    payout_rules: &[PayoutRule],
    extents: &[Extent],
) -> Result<OfferSafety, ZoeError> {
    if extent_ops.len() != payout_rules.len() || payout_rules.len() != extents.len() {
        return Err(ZoeError::MalformedReallocation(format!(
            "{} assays, {} payout rules, {} extents",
            extent_ops.len(),
            payout_rules.len(),
            extents.len()
        )));
    }

    let mut offers = 0usize;
    let mut wants = 0usize;
    let mut refund_ok = true;
    let mut winnings_ok = true;
    for ((ops, rule), extent) in extent_ops.iter().zip(payout_rules).zip(extents) {
        let stated = rule.asset_desc.extent();
        match rule.kind {
            PayoutRuleKind::OfferExactly => {
                offers += 1;
                refund_ok &= ops.equals(extent, stated)?;
            }
            PayoutRuleKind::OfferAtMost => {
                offers += 1;
                refund_ok &= ops.includes(extent, stated)?;
            }
            PayoutRuleKind::WantExactly => {
                wants += 1;
                winnings_ok &= ops.equals(extent, stated)?;
            }
            PayoutRuleKind::WantAtLeast => {
                wants += 1;
                winnings_ok &= ops.includes(extent, stated)?;
            }
        }
    }

    Ok(OfferSafety {
        refund_ok: offers > 0 && refund_ok,
        winnings_ok: wants > 0 && winnings_ok,
    })
}

pub fn is_offer_safe_for_player(
    extent_ops: &[Rc<dyn ExtentOps>],
    payout_rules: &[PayoutRule],
    extents: &[Extent],
) -> Result<bool, ZoeError> {
    Ok(evaluate_offer_safety(extent_ops, payout_rules, extents)?.is_safe())
}

/// Whether the reallocation is safe for every player. `payout_rules` and
/// `extents` are matrices with one row per player.
pub fn is_offer_safe_for_all(
    extent_ops: &[Rc<dyn ExtentOps>],
    payout_rules: &[Vec<PayoutRule>],
    extents: &[Vec<Extent>],
) -> Result<bool, ZoeError> {
    if payout_rules.len() != extents.len() {
        return Err(ZoeError::MalformedReallocation(format!(
            "{} players have payout rules but {} have extents",
            payout_rules.len(),
            extents.len()
        )));
    }
    for (rules, row) in payout_rules.iter().zip(extents) {
        if !is_offer_safe_for_player(extent_ops, rules, row)? {
            return Ok(false);
        }
    }
    Ok(true)
}
