use clap::{Parser, Subcommand};
use zoe_engine::DEFAULT_FEE_IN_TENTH_OF_PERCENT;

#[derive(Parser)]
#[command(
    name = "zoe",
    about = "Zoe: offline checks for offer-safe escrow and reallocation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a proposed reallocation for rights conservation and offer safety
    CheckReallocation {
        /// Path to a reallocation scenario JSON file
        scenario: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Quote a constant-product swap against a two-asset pool
    Quote {
        /// Tokens paid into the pool
        #[arg(long)]
        input: u64,

        /// Pool reserve of the input token
        #[arg(long)]
        input_reserve: u64,

        /// Pool reserve of the output token
        #[arg(long)]
        output_reserve: u64,

        /// Fee in tenths of a percent
        #[arg(long, default_value_t = DEFAULT_FEE_IN_TENTH_OF_PERCENT)]
        fee: u64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and validate a Zoe configuration file
    ConfigCheck {
        /// Path to a TOML config (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
