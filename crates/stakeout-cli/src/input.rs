//! Input file formats
//!
//! The analyze input is what an acquisition layer would hand the engine,
//! flattened to a file: batches of normalized observations plus any fetch
//! failures it already knows about. The score input is a bare feature
//! payload for spot-checking weights.

use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use stakeout_domain::{
    EvidenceDomain, FetchError, ObservationBatch, ObservationDraft, SourceTier,
};
use stakeout_engine::PayloadDto;

/// One observation in the input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationInput {
    /// URL the observation was fetched from
    pub source_url: String,
    /// Fetch timestamp
    pub fetched_at: u64,
    /// Source tier ("p0"/"p1"/"p2")
    pub tier: String,
    /// Normalized payload
    pub payload: PayloadDto,
}

/// One batch in the input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    /// Source descriptor
    pub source: String,
    /// Evidence domain the batch contributes to
    pub domain: String,
    /// Observations, acquisition order
    pub observations: Vec<ObservationInput>,
}

/// A fetch failure the acquisition layer reports alongside its batches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapInput {
    /// Source descriptor that failed
    pub source: String,
    /// Evidence domain the source would have covered
    pub domain: String,
    /// "rate_limited", "unauthorized", "unavailable", or a malformed detail
    pub error: String,
}

/// The analyze command's input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeInput {
    /// Chain under investigation
    pub chain: String,
    /// Token contract, if known
    #[serde(default)]
    pub token: Option<String>,
    /// Candidate canonical address, if one is being verified
    #[serde(default)]
    pub candidate_address: Option<String>,
    /// Announcement time used as the timing reference
    #[serde(default)]
    pub reference_time: Option<u64>,
    /// Pool liquidity in USD, selects the calibration bucket
    #[serde(default)]
    pub lp_usd: Option<f64>,
    /// Observation batches, ingestion order
    pub batches: Vec<BatchInput>,
    /// Known acquisition gaps
    #[serde(default)]
    pub gaps: Vec<GapInput>,
}

impl BatchInput {
    /// Convert to the engine's batch form
    pub fn to_batch(&self) -> Result<ObservationBatch> {
        let domain = parse_domain(&self.domain)?;
        let observations = self
            .observations
            .iter()
            .map(|obs| {
                Ok(ObservationDraft {
                    source_url: obs.source_url.clone(),
                    fetched_at: obs.fetched_at,
                    tier: SourceTier::parse(&obs.tier).ok_or_else(|| {
                        CliError::InvalidInput(format!("unknown source tier: {}", obs.tier))
                    })?,
                    payload: obs.payload.to_payload()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ObservationBatch {
            source: self.source.clone(),
            domain,
            observations,
        })
    }
}

impl GapInput {
    /// Convert to the engine's gap form
    pub fn to_gap(&self) -> Result<(String, EvidenceDomain, FetchError)> {
        let error = match self.error.as_str() {
            "rate_limited" => FetchError::RateLimited,
            "unauthorized" => FetchError::Unauthorized,
            "unavailable" => FetchError::Unavailable,
            detail => FetchError::Malformed(detail.to_string()),
        };
        Ok((self.source.clone(), parse_domain(&self.domain)?, error))
    }
}

fn parse_domain(s: &str) -> Result<EvidenceDomain> {
    EvidenceDomain::parse(s)
        .ok_or_else(|| CliError::InvalidInput(format!("unknown evidence domain: {}", s)))
}

/// Relation feature values for the score command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationInput {
    /// Shared first funder
    #[serde(default)]
    pub co_funder: f64,
    /// First buys close in time
    #[serde(default)]
    pub co_time: f64,
    /// First buys close in amount
    #[serde(default)]
    pub co_amount: f64,
    /// Synchronized exits
    #[serde(default)]
    pub co_exit: f64,
    /// Shared profit sink
    #[serde(default)]
    pub shared_sink: f64,
}

/// Insider feature values for the score command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsiderInput {
    /// Accumulation before the announcement
    #[serde(default)]
    pub pre_pump_accumulation: f64,
    /// Cluster share of early buys
    #[serde(default)]
    pub early_cluster_share: f64,
    /// Synchronized exits
    #[serde(default)]
    pub synchronized_exit: f64,
    /// Shared first funder
    #[serde(default)]
    pub shared_funder: f64,
    /// Shared profit sink
    #[serde(default)]
    pub shared_sink: f64,
}

/// Link-confidence inputs for the score command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkInput {
    /// Strength of deterministic signals
    #[serde(default)]
    pub deterministic_strength: f64,
    /// Agreement across independent sources
    #[serde(default)]
    pub cross_source_agreement: f64,
    /// Stability of the link over time
    #[serde(default)]
    pub temporal_stability: f64,
}

/// The score command's input file
///
/// Missing feature values default to 0, which can only lower the scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreInput {
    /// Relation pair features
    #[serde(default)]
    pub relation: Option<RelationInput>,
    /// Insider cluster features
    #[serde(default)]
    pub insider: Option<InsiderInput>,
    /// Link-confidence features
    #[serde(default)]
    pub link: Option<LinkInput>,
}
