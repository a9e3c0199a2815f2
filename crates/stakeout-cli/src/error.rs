//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] stakeout_engine::EngineError),

    /// Scoring configuration failed validation
    #[error(transparent)]
    ScoringConfig(#[from] stakeout_scorer::ConfigError),

    /// Scoring failed
    #[error(transparent)]
    Scorer(#[from] stakeout_scorer::ScorerError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
