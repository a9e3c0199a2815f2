//! Trait definitions for the acquisition boundary
//!
//! The acquisition layer (RPC clients, explorers, social fetchers) lives
//! outside the core. Its entire contract is: return normalized observations
//! or a typed failure. The core never retries and performs no network I/O;
//! retry, backoff, and endpoint rotation are the acquisition layer's job.

use crate::{EvidenceDomain, ObservationDraft};
use std::fmt;

/// Typed acquisition failure
///
/// Any variant means "no observation available"; the core responds by
/// marking the batch's evidence domain Unknown and lowering the run's
/// confidence ceiling. It never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Endpoint throttled the request
    RateLimited,
    /// Credentials rejected
    Unauthorized,
    /// Endpoint unreachable or erroring
    Unavailable,
    /// Response could not be normalized
    Malformed(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::RateLimited => write!(f, "rate limited"),
            FetchError::Unauthorized => write!(f, "unauthorized"),
            FetchError::Unavailable => write!(f, "unavailable"),
            FetchError::Malformed(detail) => write!(f, "malformed response: {}", detail),
        }
    }
}

impl std::error::Error for FetchError {}

/// A batch of normalized observations from one source
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBatch {
    /// Source descriptor (endpoint, account, or file the batch came from)
    pub source: String,
    /// Evidence domain the batch contributes to
    pub domain: EvidenceDomain,
    /// Normalized observations, acquisition order
    pub observations: Vec<ObservationDraft>,
}

/// One acquisition source, as seen from the core
///
/// Implemented by the infrastructure layer; results arrive already resolved,
/// so the core needs no timeout logic of its own.
pub trait ObservationSource {
    /// Stable descriptor of this source for gap reporting
    fn descriptor(&self) -> &str;

    /// Evidence domain this source contributes to
    fn domain(&self) -> EvidenceDomain;

    /// Fetch the next batch of normalized observations
    fn fetch(&mut self) -> Result<ObservationBatch, FetchError>;
}
