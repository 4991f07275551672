use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cfgcat",
    about = "Versioned configuration catalog: consistency checks gating activation and release",
    version
)]
pub struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. `debug` or `cfgcat_check=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a consistency check over a catalog snapshot
    Check {
        /// Path to the catalog snapshot (JSON)
        #[arg(long, default_value = "catalog.json")]
        catalog: String,

        /// Pin an area to a version: `<area pid>:<version>` (repeatable)
        #[arg(long = "pin", value_name = "PID:VERSION")]
        pins: Vec<String>,

        /// Kind of check; decides which findings block dependency persistence
        #[arg(long, default_value = "consistency-check")]
        kind: String,

        /// Check policy file (TOML)
        #[arg(long)]
        config: Option<String>,

        /// Pid of the authority owning local areas (overrides the config file)
        #[arg(long)]
        local_authority: Option<String>,

        /// Report duplicate pids across areas as interference errors
        #[arg(long)]
        strict_pids: bool,

        /// Apply automatic repairs, then check again
        #[arg(long)]
        fix: bool,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List configuration areas with their versions and recorded dependencies
    Areas {
        /// Path to the catalog snapshot (JSON)
        #[arg(long, default_value = "catalog.json")]
        catalog: String,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List the kinds of consistency check and what blocks each of them
    Kinds {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}
