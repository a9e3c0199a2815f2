//! Stakeout CLI library.
//!
//! A thin collaborator around the investigation engine: it parses arguments,
//! loads observation batches and configuration from disk, and serializes the
//! engine's reports. No analysis logic lives here.

pub mod cli;
pub mod commands;
pub mod error;
pub mod input;

pub use cli::{AnalyzeArgs, Cli, Command, ModeArg, ReplayArgs, ScoreArgs};
pub use error::{CliError, Result};
