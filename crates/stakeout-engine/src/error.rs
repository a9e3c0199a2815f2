//! Engine error taxonomy
//!
//! Acquisition failures are deliberately absent: they are recorded as gaps
//! on the investigation and degrade confidence, they never surface as
//! errors. Integrity failures are logged and skipped at ingestion.
//! Configuration errors are fatal at startup.

use thiserror::Error;

/// Errors that can occur during engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid configuration; fatal before any scoring
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Scoring configuration failed load-time validation
    #[error(transparent)]
    ScoringConfig(#[from] stakeout_scorer::ConfigError),

    /// Graph operation failed
    #[error(transparent)]
    Graph(#[from] stakeout_graph::GraphError),

    /// Scoring failed
    #[error(transparent)]
    Scorer(#[from] stakeout_scorer::ScorerError),

    /// Replay log could not be read or did not reproduce state
    #[error("Replay log error: {0}")]
    Replay(String),
}
