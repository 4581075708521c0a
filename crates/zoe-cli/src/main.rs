//! Zoe CLI: the `zoe` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Reports go to stdout, so logs stay on stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckReallocation { scenario, json } => {
            commands::check_reallocation::run(scenario, json)
        }

        Commands::Quote {
            input,
            input_reserve,
            output_reserve,
            fee,
            json,
        } => commands::quote::run(commands::quote::Args {
            input,
            input_reserve,
            output_reserve,
            fee,
            json,
        }),

        Commands::ConfigCheck { config, json } => commands::config_check::run(config, json),
    }
}
