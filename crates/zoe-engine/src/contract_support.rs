//! Helpers for governing contracts.
//!
//! Nothing here is trusted by Zoe: a contract that miscomputes a price
//! still cannot break conservation or offer safety.

use crate::error::ZoeError;
use crate::rules::{PayoutRule, PayoutRuleKind};
use serde::Serialize;
use zoe_ertp::Assay;

/// Default swap fee: 3 tenths of a percent.
pub const DEFAULT_FEE_IN_TENTH_OF_PERCENT: u64 = 3;

/// A constant-product swap quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub token_out: u64,
    pub fee: u64,
    pub new_input_reserve: u64,
    pub new_output_reserve: u64,
}

/// Price `input` tokens against a pool holding `input_reserve` and
/// `output_reserve`.
///
/// The fee is `floor(input / 1000) * fee_in_tenth_of_percent` and stays in
/// the pool. The product of the reserves never decreases.
pub fn get_input_price(
    input: u64,
    input_reserve: u64,
    output_reserve: u64,
    fee_in_tenth_of_percent: u64,
) -> Result<SwapQuote, ZoeError> {
    if input_reserve == 0 || output_reserve == 0 {
        return Err(ZoeError::InvalidPool("reserves must be non-zero".to_string()));
    }
    let overflow = || ZoeError::InvalidPool("reserves out of range".to_string());

    let fee = u128::from(input / 1000) * u128::from(fee_in_tenth_of_percent);
    let invariant = u128::from(input_reserve) * u128::from(output_reserve);
    let new_input_reserve = u128::from(input_reserve) + u128::from(input);
    let effective = new_input_reserve.saturating_sub(fee).max(1);
    let new_output_reserve = invariant / effective;
    let token_out = u128::from(output_reserve).saturating_sub(new_output_reserve);

    Ok(SwapQuote {
        token_out: u64::try_from(token_out).map_err(|_| overflow())?,
        fee: u64::try_from(fee).map_err(|_| overflow())?,
        new_input_reserve: u64::try_from(new_input_reserve).map_err(|_| overflow())?,
        new_output_reserve: u64::try_from(new_output_reserve).map_err(|_| overflow())?,
    })
}

/// Whether `payout_rules` has exactly the given kinds over exactly the
/// given assays, position by position.
pub fn has_valid_payout_rules(kinds: &[PayoutRuleKind], assays: &[Assay], payout_rules: &[PayoutRule]) -> bool {
    kinds.len() == payout_rules.len()
        && assays.len() == payout_rules.len()
        && payout_rules
            .iter()
            .zip(kinds)
            .zip(assays)
            .all(|((rule, kind), assay)| rule.kind == *kind && rule.asset_desc.label() == assay.get_label())
}
