//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use stakeout_gatekeeper::Mode;

/// Stakeout CLI - run evidence-graph investigations from observation batches.
#[derive(Debug, Parser)]
#[command(name = "stakeout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run an investigation over a batch file and emit the report
    Analyze(AnalyzeArgs),

    /// Score a bare feature payload against the configured weights
    Score(ScoreArgs),

    /// Rebuild a run from a replay log and emit the report
    Replay(ReplayArgs),
}

/// Arguments for the analyze command.
#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Input JSON file with observation batches ("-" for stdin)
    pub input: String,

    /// Completeness mode
    #[arg(short, long, value_enum, default_value = "standard")]
    pub mode: ModeArg,

    /// Scoring configuration TOML (defaults ship built in)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Calibrated threshold table TOML
    #[arg(long)]
    pub calibration: Option<String>,

    /// Infrastructure denylist TOML
    #[arg(long)]
    pub denylist: Option<String>,

    /// Write the run's replay log to this file
    #[arg(long)]
    pub replay_out: Option<String>,
}

/// Arguments for the score command.
#[derive(Debug, Parser)]
pub struct ScoreArgs {
    /// Input JSON file with feature values ("-" for stdin)
    pub input: String,

    /// Scoring configuration TOML (defaults ship built in)
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Arguments for the replay command.
#[derive(Debug, Parser)]
pub struct ReplayArgs {
    /// Replay log file, JSON lines ("-" for stdin)
    pub input: String,

    /// Completeness mode
    #[arg(short, long, value_enum, default_value = "standard")]
    pub mode: ModeArg,

    /// Chain the log was recorded for
    #[arg(long, default_value = "bsc")]
    pub chain: String,
}

/// Completeness mode argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ModeArg {
    /// Fast pass over readily available evidence
    Quick,
    /// The default investigation depth
    Standard,
    /// Exhaustive pass
    Deep,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Quick => Mode::Quick,
            ModeArg::Standard => Mode::Standard,
            ModeArg::Deep => Mode::Deep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_command_parses() {
        let cli = Cli::parse_from(["stakeout", "analyze", "batches.json", "--mode", "deep"]);
        match cli.command {
            Command::Analyze(args) => {
                assert_eq!(args.input, "batches.json");
                assert!(matches!(args.mode, ModeArg::Deep));
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_score_command_parses() {
        let cli = Cli::parse_from(["stakeout", "score", "-", "--config", "scoring.toml"]);
        match cli.command {
            Command::Score(args) => {
                assert_eq!(args.input, "-");
                assert_eq!(args.config.as_deref(), Some("scoring.toml"));
            }
            _ => panic!("Expected Score command"),
        }
    }

    #[test]
    fn test_mode_conversion() {
        let mode: Mode = ModeArg::Standard.into();
        assert_eq!(mode, Mode::Standard);
    }
}
