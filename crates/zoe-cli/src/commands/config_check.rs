use crate::support::print_json_or_exit;
use serde_json::json;
use zoe_engine::{Zoe, ZoeConfig};

pub fn run(config: Option<String>, json_output: bool) {
    let loaded = match &config {
        Some(path) => ZoeConfig::load(path),
        None => Ok(ZoeConfig::default()),
    };
    let zoe = loaded.and_then(Zoe::with_config).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        std::process::exit(1);
    });

    let labels = [
        zoe.get_escrow_receipt_assay(),
        zoe.get_invite_assay(),
        zoe.get_payout_assay(),
    ]
    .map(|assay| assay.get_label().description().to_string());

    if json_output {
        let payload = json!({
            "configPath": config,
            "valid": true,
            "config": zoe.config(),
            "assays": labels,
        });
        print_json_or_exit(&payload, "config-check");
        return;
    }

    println!("zoe config-check");
    println!(
        "  Source: {}",
        config.as_deref().unwrap_or("(defaults)")
    );
    println!("  Escrow receipts: {}", labels[0]);
    println!("  Invites: {}", labels[1]);
    println!("  Payoffs: {}", labels[2]);
}
