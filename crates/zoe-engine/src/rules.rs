//! Payout rules and exit conditions: what a player escrows, what they
//! want, and when they may leave.
//!
//! Wire forms:
//!
//! ```text
//! payout rule     {"kind": "offerExactly" | "offerAtMost" | "wantExactly" | "wantAtLeast",
//!                  "assetDesc": {"label": {...}, "extent": {...}}}
//! exit condition  {"kind": "noExit" | "onDemand" | "afterDeadline", "deadline"?: u64}
//! ```

use crate::error::ZoeError;
use crate::timer::Timer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use zoe_ertp::AssetDesc;

/// How a payout rule constrains its assay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayoutRuleKind {
    OfferExactly,
    OfferAtMost,
    WantExactly,
    WantAtLeast,
}

impl PayoutRuleKind {
    pub const ALL: [Self; 4] = [
        Self::OfferExactly,
        Self::OfferAtMost,
        Self::WantExactly,
        Self::WantAtLeast,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OfferExactly => "offerExactly",
            Self::OfferAtMost => "offerAtMost",
            Self::WantExactly => "wantExactly",
            Self::WantAtLeast => "wantAtLeast",
        }
    }

    /// Whether the player pays in under this rule.
    pub fn is_offer(self) -> bool {
        matches!(self, Self::OfferExactly | Self::OfferAtMost)
    }

    pub fn is_want(self) -> bool {
        !self.is_offer()
    }
}

impl fmt::Display for PayoutRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutRuleKind {
    type Err = ZoeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ZoeError::InvalidPayoutRule(format!("unknown kind: {s}")))
    }
}

/// One element of an offer: a kind over one assay's asset description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRule {
    pub kind: PayoutRuleKind,
    pub asset_desc: AssetDesc,
}

impl PayoutRule {
    pub fn new(kind: PayoutRuleKind, asset_desc: AssetDesc) -> Self {
        Self { kind, asset_desc }
    }

    pub fn offer_exactly(asset_desc: AssetDesc) -> Self {
        Self::new(PayoutRuleKind::OfferExactly, asset_desc)
    }

    pub fn offer_at_most(asset_desc: AssetDesc) -> Self {
        Self::new(PayoutRuleKind::OfferAtMost, asset_desc)
    }

    pub fn want_exactly(asset_desc: AssetDesc) -> Self {
        Self::new(PayoutRuleKind::WantExactly, asset_desc)
    }

    pub fn want_at_least(asset_desc: AssetDesc) -> Self {
        Self::new(PayoutRuleKind::WantAtLeast, asset_desc)
    }

    /// Parse one rule from its wire form.
    ///
    /// The asset description stays alleged until escrow coerces it through
    /// the assay it names.
    pub fn from_wire(value: &Value) -> Result<Self, ZoeError> {
        let object = value
            .as_object()
            .ok_or_else(|| ZoeError::InvalidPayoutRule("expected an object".to_string()))?;
        let kind = object
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| ZoeError::InvalidPayoutRule("missing kind".to_string()))?
            .parse()?;
        let asset_desc = object
            .get("assetDesc")
            .ok_or_else(|| ZoeError::InvalidPayoutRule("missing assetDesc".to_string()))?;
        let asset_desc = AssetDesc::deserialize(asset_desc)
            .map_err(|err| ZoeError::InvalidPayoutRule(format!("invalid assetDesc: {err}")))?;
        Ok(Self::new(kind, asset_desc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitKind {
    NoExit,
    OnDemand,
    AfterDeadline,
}

impl ExitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoExit => "noExit",
            Self::OnDemand => "onDemand",
            Self::AfterDeadline => "afterDeadline",
        }
    }
}

impl FromStr for ExitKind {
    type Err = ZoeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::NoExit, Self::OnDemand, Self::AfterDeadline]
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ZoeError::InvalidExitCondition(format!("unknown kind: {s}")))
    }
}

/// When a player may leave an offer.
#[derive(Clone)]
pub enum ExitCondition {
    /// Only the contract can complete the offer.
    NoExit,
    /// The player holds a cancel capability.
    OnDemand,
    /// Zoe completes the offer when `timer` reaches `deadline`.
    AfterDeadline { deadline: u64, timer: Rc<dyn Timer> },
}

#[derive(Serialize)]
struct ExitConditionWire {
    kind: ExitKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<u64>,
}

impl ExitCondition {
    pub fn kind(&self) -> ExitKind {
        match self {
            Self::NoExit => ExitKind::NoExit,
            Self::OnDemand => ExitKind::OnDemand,
            Self::AfterDeadline { .. } => ExitKind::AfterDeadline,
        }
    }

    pub fn deadline(&self) -> Option<u64> {
        match self {
            Self::AfterDeadline { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Parse an exit condition from its wire form.
    ///
    /// Timers are capabilities, not data, so an `afterDeadline` exit takes
    /// its timer from the caller.
    pub fn from_wire(value: &Value, timer: Option<Rc<dyn Timer>>) -> Result<Self, ZoeError> {
        let object = value
            .as_object()
            .ok_or_else(|| ZoeError::InvalidExitCondition("expected an object".to_string()))?;
        let kind: ExitKind = object
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| ZoeError::InvalidExitCondition("missing kind".to_string()))?
            .parse()?;
        match kind {
            ExitKind::NoExit => Ok(Self::NoExit),
            ExitKind::OnDemand => Ok(Self::OnDemand),
            ExitKind::AfterDeadline => {
                let deadline = object.get("deadline").and_then(Value::as_u64).ok_or_else(|| {
                    ZoeError::InvalidExitCondition(
                        "afterDeadline requires a non-negative integer deadline".to_string(),
                    )
                })?;
                let timer = timer.ok_or_else(|| {
                    ZoeError::InvalidExitCondition("afterDeadline requires a timer".to_string())
                })?;
                Ok(Self::AfterDeadline { deadline, timer })
            }
        }
    }
}

impl fmt::Debug for ExitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExit => f.write_str("NoExit"),
            Self::OnDemand => f.write_str("OnDemand"),
            Self::AfterDeadline { deadline, .. } => f
                .debug_struct("AfterDeadline")
                .field("deadline", deadline)
                .finish_non_exhaustive(),
        }
    }
}

impl Serialize for ExitCondition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ExitConditionWire {
            kind: self.kind(),
            deadline: self.deadline(),
        }
        .serialize(serializer)
    }
}

/// Everything a player states when escrowing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferConditions {
    pub payout_rules: Vec<PayoutRule>,
    pub exit: ExitCondition,
}

impl OfferConditions {
    pub fn new(payout_rules: Vec<PayoutRule>, exit: ExitCondition) -> Self {
        Self { payout_rules, exit }
    }

    /// Parse `{"payoutRules": [...], "exit": {...}}`.
    pub fn from_wire(value: &Value, timer: Option<Rc<dyn Timer>>) -> Result<Self, ZoeError> {
        let rules = value
            .get("payoutRules")
            .and_then(Value::as_array)
            .ok_or_else(|| ZoeError::InvalidPayoutRule("payoutRules must be an array".to_string()))?;
        let payout_rules = rules
            .iter()
            .map(PayoutRule::from_wire)
            .collect::<Result<Vec<_>, _>>()?;
        let exit = match value.get("exit") {
            Some(exit) => ExitCondition::from_wire(exit, timer)?,
            None => ExitCondition::OnDemand,
        };
        Ok(Self::new(payout_rules, exit))
    }
}
