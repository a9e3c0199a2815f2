//! Graph error types

use stakeout_domain::EntityId;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// Referenced entity does not exist in this graph
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Denylist configuration could not be parsed
    #[error("Denylist configuration error: {0}")]
    Config(String),
}
