//! cfgcat CLI: the `cfgcat` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Check {
            catalog,
            pins,
            kind,
            config,
            local_authority,
            strict_pids,
            fix,
            json,
        } => commands::check::run(commands::check::Args {
            catalog,
            pins,
            kind,
            config,
            local_authority,
            strict_pids,
            fix,
            json,
        }),

        Commands::Areas { catalog, json } => commands::areas::run(catalog, json),

        Commands::Kinds { json } => commands::kinds::run(json),
    }
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
