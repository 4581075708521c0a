//! Zoe configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use crate::error::ZoeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Descriptions of the three assays Zoe mints internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoeConfig {
    pub escrow_receipt_description: String,
    pub invite_description: String,
    pub payoff_description: String,
}

impl Default for ZoeConfig {
    fn default() -> Self {
        Self {
            escrow_receipt_description: "zoeEscrowReceipts".to_string(),
            invite_description: "zoeInvites".to_string(),
            payoff_description: "zoePayoffs".to_string(),
        }
    }
}

impl ZoeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ZoeError> {
        let config: Self =
            toml::from_str(input).map_err(|err| ZoeError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ZoeError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|err| {
            ZoeError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ZoeError> {
        for (field, value) in [
            ("escrowReceiptDescription", &self.escrow_receipt_description),
            ("inviteDescription", &self.invite_description),
            ("payoffDescription", &self.payoff_description),
        ] {
            if value.trim().is_empty() {
                return Err(ZoeError::InvalidConfig(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}
