//! Offline reallocation gate.
//!
//! Scenario files describe assays by strategy descriptor, and offers by
//! payout rules plus current and proposed extents, one per assay:
//!
//! ```json
//! {
//!   "assays": [{ "description": "moola", "extentOps": { "name": "natExtentOps" } }],
//!   "offers": [{
//!     "name": "alice",
//!     "payoutRules": [{ "kind": "offerExactly", "extent": { "nat": 3 } }],
//!     "current": [{ "nat": 3 }],
//!     "proposed": [{ "nat": 3 }]
//!   }]
//! }
//! ```

use crate::support::{print_json_or_exit, read_json_or_exit, yes_no};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::rc::Rc;
use zoe_engine::{
    OfferSafety, PayoutRule, PayoutRuleKind, ZoeError, conservation_violation,
    evaluate_offer_safety,
};
use zoe_ertp::{AssetDescOps, Extent, ExtentOps, ExtentOpsDescriptor, ExtentOpsRegistry, Mint};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Scenario {
    assays: Vec<AssaySpec>,
    offers: Vec<OfferSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AssaySpec {
    description: String,
    extent_ops: ExtentOpsDescriptor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OfferSpec {
    name: String,
    payout_rules: Vec<RuleSpec>,
    current: Vec<Extent>,
    proposed: Vec<Extent>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    kind: PayoutRuleKind,
    extent: Extent,
}

struct OfferVerdict {
    name: String,
    safety: OfferSafety,
}

struct Report {
    assays: Vec<String>,
    conservation_violation: Option<String>,
    offers: Vec<OfferVerdict>,
}

impl Report {
    fn accepted(&self) -> bool {
        self.conservation_violation.is_none() && self.offers.iter().all(|offer| offer.safety.is_safe())
    }
}

pub fn run(scenario: String, json_output: bool) {
    let scenario_path = PathBuf::from(scenario);
    let raw = read_json_or_exit(&scenario_path, "scenario");
    let parsed: Scenario = serde_json::from_value(raw).unwrap_or_else(|err| {
        eprintln!(
            "error: invalid scenario {}: {err}",
            scenario_path.display()
        );
        std::process::exit(2);
    });
    let report = evaluate(&parsed).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        std::process::exit(2);
    });
    let accepted = report.accepted();
    tracing::debug!(offers = report.offers.len(), accepted, "evaluated reallocation scenario");

    if json_output {
        let offers: Vec<Value> = report
            .offers
            .iter()
            .map(|offer| {
                json!({
                    "name": offer.name,
                    "refundOk": offer.safety.refund_ok,
                    "winningsOk": offer.safety.winnings_ok,
                    "safe": offer.safety.is_safe(),
                })
            })
            .collect();
        let payload = json!({
            "scenario": scenario_path.display().to_string(),
            "assays": report.assays,
            "conserved": report.conservation_violation.is_none(),
            "conservationViolation": report.conservation_violation,
            "offers": offers,
            "accepted": accepted,
        });
        print_json_or_exit(&payload, "check-reallocation");
    } else {
        println!("zoe check-reallocation");
        println!("  Scenario: {}", scenario_path.display());
        println!("  Assays: {}", report.assays.join(", "));
        match &report.conservation_violation {
            None => println!("  Rights conserved: yes"),
            Some(reason) => println!("  Rights conserved: no ({reason})"),
        }
        for offer in &report.offers {
            println!(
                "  Offer {}: {} (refund: {}, winnings: {})",
                offer.name,
                if offer.safety.is_safe() { "safe" } else { "unsafe" },
                yes_no(offer.safety.refund_ok),
                yes_no(offer.safety.winnings_ok),
            );
        }
        println!(
            "  Verdict: {}",
            if accepted { "accepted" } else { "rejected" }
        );
    }

    if !accepted {
        std::process::exit(1);
    }
}

fn evaluate(scenario: &Scenario) -> Result<Report, ZoeError> {
    let registry = ExtentOpsRegistry::with_defaults();
    let desc_ops = scenario
        .assays
        .iter()
        .map(|assay| {
            let mint = Mint::from_descriptor(&assay.description, &assay.extent_ops, &registry)?;
            Ok(mint.get_assay().get_desc_ops().clone())
        })
        .collect::<Result<Vec<AssetDescOps>, ZoeError>>()?;
    let extent_ops: Vec<Rc<dyn ExtentOps>> = desc_ops
        .iter()
        .map(|ops| Rc::clone(ops.get_extent_ops()))
        .collect();

    let mut rules = Vec::with_capacity(scenario.offers.len());
    let mut current = Vec::with_capacity(scenario.offers.len());
    let mut proposed = Vec::with_capacity(scenario.offers.len());
    for offer in &scenario.offers {
        if offer.payout_rules.len() != desc_ops.len() {
            return Err(ZoeError::MalformedReallocation(format!(
                "offer {} has {} payout rules for {} assays",
                offer.name,
                offer.payout_rules.len(),
                desc_ops.len()
            )));
        }
        let offer_rules = offer
            .payout_rules
            .iter()
            .zip(&desc_ops)
            .map(|(rule, ops)| Ok(PayoutRule::new(rule.kind, ops.make(rule.extent.clone())?)))
            .collect::<Result<Vec<_>, ZoeError>>()?;
        rules.push(offer_rules);
        current.push(insist_row(&extent_ops, &offer.name, &offer.current)?);
        proposed.push(insist_row(&extent_ops, &offer.name, &offer.proposed)?);
    }

    let violation = conservation_violation(&extent_ops, &current, &proposed)?;
    let offers = scenario
        .offers
        .iter()
        .zip(&rules)
        .zip(&proposed)
        .map(|((offer, rules), row)| {
            Ok(OfferVerdict {
                name: offer.name.clone(),
                safety: evaluate_offer_safety(&extent_ops, rules, row)?,
            })
        })
        .collect::<Result<Vec<_>, ZoeError>>()?;

    Ok(Report {
        assays: scenario.assays.iter().map(|assay| assay.description.clone()).collect(),
        conservation_violation: violation,
        offers,
    })
}

fn insist_row(extent_ops: &[Rc<dyn ExtentOps>], name: &str, row: &[Extent]) -> Result<Vec<Extent>, ZoeError> {
    if row.len() != extent_ops.len() {
        return Err(ZoeError::MalformedReallocation(format!(
            "offer {name} has {} extents for {} assays",
            row.len(),
            extent_ops.len()
        )));
    }
    row.iter()
        .zip(extent_ops)
        .map(|(extent, ops)| Ok(ops.insist_kind(extent.clone())?))
        .collect()
}
