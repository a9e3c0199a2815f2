//! The three weighted score functions and their classification labels

use crate::{InsiderWeights, LinkWeights, RelationWeights, ScorerError, ScoringThresholds};
use stakeout_domain::ClusterVerdict;
use stakeout_features::{InsiderInputs, PairFeatures};

/// Validate one feature input: finite and in [0, 1]
fn read_feature(name: &str, value: f64) -> Result<f64, ScorerError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ScorerError::FeatureOutOfRange {
            name: name.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Relation score of a wallet pair
///
/// `0.30·co_funder + 0.20·co_time + 0.15·co_amount + 0.20·co_exit +
/// 0.15·shared_sink` under default weights. Symmetric because the pair
/// features are.
pub fn relation_score(pair: &PairFeatures, weights: &RelationWeights) -> Result<f64, ScorerError> {
    Ok(weights.co_funder * read_feature("co_funder", pair.co_funder.value)?
        + weights.co_time * read_feature("co_time", pair.co_time.value)?
        + weights.co_amount * read_feature("co_amount", pair.co_amount.value)?
        + weights.co_exit * read_feature("co_exit", pair.co_exit.value)?
        + weights.shared_sink * read_feature("shared_sink", pair.shared_sink.value)?)
}

/// Insider score of a cluster
pub fn insider_score(inputs: &InsiderInputs, weights: &InsiderWeights) -> Result<f64, ScorerError> {
    Ok(weights.pre_pump_accumulation
        * read_feature("pre_pump_accumulation", inputs.pre_pump_accumulation)?
        + weights.early_cluster_share
            * read_feature("early_cluster_share", inputs.early_cluster_share)?
        + weights.synchronized_exit * read_feature("synchronized_exit", inputs.synchronized_exit)?
        + weights.shared_funder * read_feature("shared_funder", inputs.shared_funder)?
        + weights.shared_sink * read_feature("shared_sink", inputs.shared_sink)?)
}

/// Inputs to the link-confidence score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkInputs {
    /// Strength of the deterministic evidence behind the link
    pub deterministic_strength: f64,
    /// Agreement across independent sources
    pub cross_source_agreement: f64,
    /// Stability of the link over the observed time span
    pub temporal_stability: f64,
}

/// Link confidence on a 0-100 scale
pub fn link_confidence(inputs: &LinkInputs, weights: &LinkWeights) -> Result<f64, ScorerError> {
    Ok(100.0
        * (weights.deterministic_strength
            * read_feature("deterministic_strength", inputs.deterministic_strength)?
            + weights.cross_source_agreement
                * read_feature("cross_source_agreement", inputs.cross_source_agreement)?
            + weights.temporal_stability
                * read_feature("temporal_stability", inputs.temporal_stability)?))
}

/// Classify a relation score against the thresholds
///
/// This is the score-only classification; the tiering rule (deterministic
/// signal required for high confidence) is applied at cluster construction.
pub fn classify_relation(score: f64, thresholds: &ScoringThresholds) -> ClusterVerdict {
    if score >= thresholds.relation_strong {
        ClusterVerdict::HighConfidence
    } else if score >= thresholds.relation_suspected {
        ClusterVerdict::Suspected
    } else {
        ClusterVerdict::Weak
    }
}

/// Insider classification labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsiderLabel {
    /// Insufficient evidence of insider activity
    InsufficientEvidence,
    /// Suspected insider activity
    Suspected,
    /// High-probability insider activity
    HighProbability,
}

impl InsiderLabel {
    /// Get the label as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            InsiderLabel::InsufficientEvidence => "insufficient_evidence",
            InsiderLabel::Suspected => "suspected_insider",
            InsiderLabel::HighProbability => "high_probability_insider",
        }
    }
}

/// Classify an insider score against the thresholds
pub fn classify_insider(score: f64, thresholds: &ScoringThresholds) -> InsiderLabel {
    if score >= thresholds.insider_high {
        InsiderLabel::HighProbability
    } else if score >= thresholds.insider_suspected {
        InsiderLabel::Suspected
    } else {
        InsiderLabel::InsufficientEvidence
    }
}

/// Link-confidence classification labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkConfidenceLabel {
    /// Low link confidence
    Low,
    /// Medium link confidence
    Medium,
    /// High link confidence
    High,
}

impl LinkConfidenceLabel {
    /// Get the label as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkConfidenceLabel::Low => "low",
            LinkConfidenceLabel::Medium => "medium",
            LinkConfidenceLabel::High => "high",
        }
    }
}

/// Classify a link confidence against the thresholds
pub fn classify_link_confidence(score: f64, thresholds: &ScoringThresholds) -> LinkConfidenceLabel {
    if score >= thresholds.link_high {
        LinkConfidenceLabel::High
    } else if score >= thresholds.link_medium {
        LinkConfidenceLabel::Medium
    } else {
        LinkConfidenceLabel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeout_domain::EntityId;
    use stakeout_features::FeatureValue;

    fn pair(
        co_funder: f64,
        co_time: f64,
        co_amount: f64,
        co_exit: f64,
        shared_sink: f64,
    ) -> PairFeatures {
        let fv = |value: f64| FeatureValue {
            value,
            evidence: Vec::new(),
        };
        PairFeatures {
            a: EntityId::new(1),
            b: EntityId::new(2),
            co_funder: fv(co_funder),
            co_time: fv(co_time),
            co_amount: fv(co_amount),
            co_exit: fv(co_exit),
            shared_sink: fv(shared_sink),
        }
    }

    #[test]
    fn test_relation_score_matches_documented_formula() {
        let score = relation_score(
            &pair(0.9, 0.8, 0.6, 0.7, 0.8),
            &RelationWeights::default(),
        )
        .unwrap();
        assert!((score - 0.78).abs() < 1e-9);
    }

    #[test]
    fn test_insider_score_matches_documented_formula() {
        let inputs = InsiderInputs {
            pre_pump_accumulation: 0.9,
            early_cluster_share: 0.7,
            synchronized_exit: 0.6,
            shared_funder: 0.9,
            shared_sink: 0.8,
            evidence: Vec::new(),
        };
        let score = insider_score(&inputs, &InsiderWeights::default()).unwrap();
        assert!((score - 0.785).abs() < 1e-9);
    }

    #[test]
    fn test_link_confidence_matches_documented_formula() {
        let inputs = LinkInputs {
            deterministic_strength: 0.8,
            cross_source_agreement: 0.7,
            temporal_stability: 0.9,
        };
        let score = link_confidence(&inputs, &LinkWeights::default()).unwrap();
        assert!((score - 79.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_feature_rejected() {
        let result = relation_score(
            &pair(f64::NAN, 0.8, 0.6, 0.7, 0.8),
            &RelationWeights::default(),
        );
        assert!(matches!(
            result,
            Err(ScorerError::FeatureOutOfRange { ref name, .. }) if name == "co_funder"
        ));
    }

    #[test]
    fn test_out_of_range_feature_rejected() {
        let result = relation_score(
            &pair(1.2, 0.8, 0.6, 0.7, 0.8),
            &RelationWeights::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_classification_thresholds() {
        let thresholds = ScoringThresholds::default();
        assert_eq!(classify_relation(0.8, &thresholds), ClusterVerdict::HighConfidence);
        assert_eq!(classify_relation(0.6, &thresholds), ClusterVerdict::Suspected);
        assert_eq!(classify_relation(0.4, &thresholds), ClusterVerdict::Weak);

        assert_eq!(classify_insider(0.75, &thresholds), InsiderLabel::HighProbability);
        assert_eq!(classify_insider(0.6, &thresholds), InsiderLabel::Suspected);
        assert_eq!(classify_insider(0.2, &thresholds), InsiderLabel::InsufficientEvidence);

        assert_eq!(classify_link_confidence(80.0, &thresholds), LinkConfidenceLabel::High);
        assert_eq!(classify_link_confidence(60.0, &thresholds), LinkConfidenceLabel::Medium);
        assert_eq!(classify_link_confidence(30.0, &thresholds), LinkConfidenceLabel::Low);
    }

    #[test]
    fn test_missing_inputs_can_only_lower_scores() {
        let full = relation_score(&pair(1.0, 1.0, 1.0, 1.0, 1.0), &RelationWeights::default())
            .unwrap();
        let missing = relation_score(&pair(1.0, 0.0, 1.0, 1.0, 1.0), &RelationWeights::default())
            .unwrap();
        assert!(missing < full);
    }
}
