//! Stakeout CLI - run evidence-graph investigations from the command line.

use clap::Parser;
use serde::Serialize;
use stakeout_cli::{commands, Cli, Command};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> stakeout_cli::Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Analyze(args) => emit(&commands::execute_analyze(args)?, cli.pretty),
        Command::Score(args) => emit(&commands::execute_score(args)?, cli.pretty),
        Command::Replay(args) => emit(&commands::execute_replay(args)?, cli.pretty),
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> stakeout_cli::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
