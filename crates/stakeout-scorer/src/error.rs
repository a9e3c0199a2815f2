//! Scorer error types

use stakeout_domain::EntityId;
use thiserror::Error;

/// Configuration errors, raised at load time
///
/// A bad weight table must never survive to score time; scoring assumes a
/// validated configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A weight group does not sum to 1 within epsilon
    #[error("Invalid weight configuration: {group} weights sum to {sum}, expected 1.0 ± {epsilon}")]
    InvalidWeightConfiguration {
        /// Which weight group failed
        group: String,
        /// Actual sum
        sum: f64,
        /// Allowed deviation
        epsilon: f64,
    },

    /// Threshold ordering or range violated
    #[error("Invalid threshold configuration: {0}")]
    InvalidThresholds(String),

    /// TOML could not be parsed
    #[error("Failed to parse scoring configuration: {0}")]
    Parse(String),
}

/// Errors raised while scoring
#[derive(Error, Debug)]
pub enum ScorerError {
    /// Scoring was requested for an entity with no extracted features
    #[error("No features extracted for {0}; run feature extraction first")]
    IncompleteFeature(EntityId),

    /// A feature input was non-finite or outside [0, 1]
    #[error("Feature '{name}' out of range [0, 1]: {value}")]
    FeatureOutOfRange {
        /// Feature name
        name: String,
        /// Offending value
        value: f64,
    },
}
