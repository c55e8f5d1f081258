use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "claims-cache")]
#[command(about = "Inspect claims cache keys and configuration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the cache key digest of a credential
    Digest(DigestArgs),
    /// Load and validate a configuration file
    CheckConfig(CheckConfigArgs),
    /// Show how long a credential with the given lifetime would stay cached
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct DigestArgs {
    /// Credential to hash (reads stdin when omitted)
    pub credential: Option<String>,

    /// Print only the short prefix used in log lines
    #[arg(long)]
    pub short: bool,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Path to a TOML file with a [claims_cache] table
    pub path: PathBuf,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Remaining credential lifetime (e.g. "2h", "30s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub expires_in: Duration,

    /// Treat the credential as already expired by --expires-in
    #[arg(long)]
    pub expired: bool,

    /// Maximum retention (overrides the config file)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub max_ttl: Option<Duration>,

    /// Configuration file to take max_ttl from
    #[arg(long, env = "CLAIMS_CACHE_CONFIG")]
    pub config: Option<PathBuf>,
}
