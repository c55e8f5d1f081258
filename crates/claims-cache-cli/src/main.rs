mod cli;
mod commands;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing(&cli.log_level);

    match &cli.command {
        Commands::Digest(args) => commands::digest(args)?,
        Commands::CheckConfig(args) => commands::check_config(args)?,
        Commands::Simulate(args) => commands::simulate(args)?,
    }

    Ok(())
}
