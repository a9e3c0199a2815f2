//! Scoring weights, thresholds, and threshold provenance
//!
//! Everything here is externally loaded configuration so the calibration
//! workflow can swap tables without code changes. Validation happens at
//! load time; score functions assume a validated config.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Weights of the relation score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationWeights {
    /// Shared first funder
    pub co_funder: f64,
    /// First buys close in time
    pub co_time: f64,
    /// First buys close in amount
    pub co_amount: f64,
    /// Synchronized exits
    pub co_exit: f64,
    /// Shared profit sink
    pub shared_sink: f64,
}

impl Default for RelationWeights {
    fn default() -> Self {
        Self {
            co_funder: 0.30,
            co_time: 0.20,
            co_amount: 0.15,
            co_exit: 0.20,
            shared_sink: 0.15,
        }
    }
}

impl RelationWeights {
    fn sum(&self) -> f64 {
        self.co_funder + self.co_time + self.co_amount + self.co_exit + self.shared_sink
    }
}

/// Weights of the insider score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderWeights {
    /// Accumulation before the announcement
    pub pre_pump_accumulation: f64,
    /// Cluster share of early buys
    pub early_cluster_share: f64,
    /// Synchronized exits
    pub synchronized_exit: f64,
    /// Shared first funder
    pub shared_funder: f64,
    /// Shared profit sink
    pub shared_sink: f64,
}

impl Default for InsiderWeights {
    fn default() -> Self {
        Self {
            pre_pump_accumulation: 0.25,
            early_cluster_share: 0.20,
            synchronized_exit: 0.20,
            shared_funder: 0.20,
            shared_sink: 0.15,
        }
    }
}

impl InsiderWeights {
    fn sum(&self) -> f64 {
        self.pre_pump_accumulation
            + self.early_cluster_share
            + self.synchronized_exit
            + self.shared_funder
            + self.shared_sink
    }
}

/// Weights of the link-confidence score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkWeights {
    /// Strength of deterministic signals
    pub deterministic_strength: f64,
    /// Agreement across independent sources
    pub cross_source_agreement: f64,
    /// Stability of the link over time
    pub temporal_stability: f64,
}

impl Default for LinkWeights {
    fn default() -> Self {
        Self {
            deterministic_strength: 0.5,
            cross_source_agreement: 0.3,
            temporal_stability: 0.2,
        }
    }
}

impl LinkWeights {
    fn sum(&self) -> f64 {
        self.deterministic_strength + self.cross_source_agreement + self.temporal_stability
    }
}

/// Where a threshold set came from
///
/// Calibrated tables come from external tooling, bucketed by chain and
/// liquidity band. Provenance is reportable: a run scored with defaults says
/// so, and its confidence label is capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ThresholdProvenance {
    /// Shipped defaults
    Default,
    /// Calibrated for a specific `chain:lp_band` bucket
    Calibrated {
        /// Bucket key, e.g. `bsc:lp_lt_20k`
        bucket: String,
    },
}

impl fmt::Display for ThresholdProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdProvenance::Default => write!(f, "default"),
            ThresholdProvenance::Calibrated { bucket } => write!(f, "calibrated:{}", bucket),
        }
    }
}

/// Report confidence labels, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    /// Low confidence
    Low,
    /// Medium confidence
    Medium,
    /// Medium-high confidence
    MediumHigh,
    /// High confidence
    High,
}

impl ConfidenceLabel {
    /// Get the label as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::Low => "low",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::MediumHigh => "medium_high",
            ConfidenceLabel::High => "high",
        }
    }
}

/// Classification thresholds with their provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringThresholds {
    /// Relation score at or above which a cluster is strong
    pub relation_strong: f64,
    /// Relation score at or above which a cluster is suspected
    pub relation_suspected: f64,
    /// Insider score at or above which insider activity is high-probability
    pub insider_high: f64,
    /// Insider score at or above which insider activity is suspected
    pub insider_suspected: f64,
    /// Link confidence at or above which a link is high (0-100 scale)
    pub link_high: f64,
    /// Link confidence at or above which a link is medium
    pub link_medium: f64,
    /// Where these thresholds came from
    #[serde(default = "default_provenance")]
    pub provenance: ThresholdProvenance,
}

fn default_provenance() -> ThresholdProvenance {
    ThresholdProvenance::Default
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            relation_strong: 0.75,
            relation_suspected: 0.55,
            insider_high: 0.70,
            insider_suspected: 0.50,
            link_high: 75.0,
            link_medium: 50.0,
            provenance: ThresholdProvenance::Default,
        }
    }
}

/// Liquidity bucket key used by the calibration workflow
///
/// Bands: below 20k, 20k-100k, above 100k USD.
pub fn bucket_key(chain: &str, lp_usd: f64) -> String {
    let band = if lp_usd < 20_000.0 {
        "lp_lt_20k"
    } else if lp_usd <= 100_000.0 {
        "lp_20k_100k"
    } else {
        "lp_gt_100k"
    };
    format!("{}:{}", chain.to_lowercase(), band)
}

/// Calibrated threshold tables, keyed by bucket
///
/// Produced by external calibration tooling; the scorer only loads and
/// applies them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibratedThresholds {
    /// Bucket key -> threshold set
    #[serde(default)]
    pub buckets: BTreeMap<String, ScoringThresholds>,
}

impl CalibratedThresholds {
    /// Load calibrated tables from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Complete scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Relation score weights
    #[serde(default)]
    pub relation_weights: RelationWeights,
    /// Insider score weights
    #[serde(default)]
    pub insider_weights: InsiderWeights,
    /// Link-confidence weights
    #[serde(default)]
    pub link_weights: LinkWeights,
    /// Classification thresholds
    #[serde(default)]
    pub thresholds: ScoringThresholds,
    /// Minimum pair-feature strength that counts as a signal
    #[serde(default = "default_signal_floor")]
    pub signal_floor: f64,
    /// Allowed deviation of weight sums from 1.0
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Highest confidence label a default-threshold run may report
    #[serde(default = "default_provenance_cap")]
    pub default_provenance_cap: ConfidenceLabel,
}

fn default_signal_floor() -> f64 {
    0.5
}

fn default_epsilon() -> f64 {
    1e-6
}

fn default_provenance_cap() -> ConfidenceLabel {
    ConfidenceLabel::MediumHigh
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            relation_weights: RelationWeights::default(),
            insider_weights: InsiderWeights::default(),
            link_weights: LinkWeights::default(),
            thresholds: ScoringThresholds::default(),
            signal_floor: default_signal_floor(),
            epsilon: default_epsilon(),
            default_provenance_cap: default_provenance_cap(),
        }
    }
}

impl ScoringConfig {
    /// Validate weight sums and threshold ordering
    ///
    /// Called at load time; a config that fails here must never reach
    /// scoring.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (group, sum) in [
            ("relation", self.relation_weights.sum()),
            ("insider", self.insider_weights.sum()),
            ("link", self.link_weights.sum()),
        ] {
            if (sum - 1.0).abs() > self.epsilon {
                return Err(ConfigError::InvalidWeightConfiguration {
                    group: group.to_string(),
                    sum,
                    epsilon: self.epsilon,
                });
            }
        }

        let t = &self.thresholds;
        if !(0.0..=1.0).contains(&t.relation_suspected) || !(0.0..=1.0).contains(&t.relation_strong)
        {
            return Err(ConfigError::InvalidThresholds(
                "relation thresholds must be in [0, 1]".to_string(),
            ));
        }
        if t.relation_suspected >= t.relation_strong {
            return Err(ConfigError::InvalidThresholds(format!(
                "relation_suspected {} must be below relation_strong {}",
                t.relation_suspected, t.relation_strong
            )));
        }
        if t.insider_suspected >= t.insider_high {
            return Err(ConfigError::InvalidThresholds(format!(
                "insider_suspected {} must be below insider_high {}",
                t.insider_suspected, t.insider_high
            )));
        }
        if t.link_medium >= t.link_high {
            return Err(ConfigError::InvalidThresholds(format!(
                "link_medium {} must be below link_high {}",
                t.link_medium, t.link_high
            )));
        }
        if !(0.0..=1.0).contains(&self.signal_floor) {
            return Err(ConfigError::InvalidThresholds(
                "signal_floor must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate configuration from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply a calibrated threshold table for the run's bucket
    ///
    /// Falls back to the existing (default) thresholds when the bucket has
    /// no calibration; provenance records which happened.
    pub fn with_calibration(
        mut self,
        table: &CalibratedThresholds,
        chain: &str,
        lp_usd: f64,
    ) -> Self {
        let key = bucket_key(chain, lp_usd);
        if let Some(calibrated) = table.buckets.get(&key) {
            self.thresholds = ScoringThresholds {
                provenance: ThresholdProvenance::Calibrated { bucket: key },
                ..calibrated.clone()
            };
        }
        self
    }

    /// Highest confidence label this configuration may report
    ///
    /// Default thresholds cap at `default_provenance_cap`; calibrated
    /// thresholds are uncapped.
    pub fn confidence_cap(&self) -> ConfidenceLabel {
        match self.thresholds.provenance {
            ThresholdProvenance::Default => self.default_provenance_cap,
            ThresholdProvenance::Calibrated { .. } => ConfidenceLabel::High,
        }
    }
}
