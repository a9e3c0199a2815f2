//! Derived clusters and their tiered signals

use crate::{EntityId, EvidenceId};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a cluster within one scoring pass
///
/// Assigned deterministically in component-discovery order so that replaying
/// the same ingestion sequence reproduces the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(u32);

impl ClusterId {
    /// Wrap a raw index
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw index
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{:03}", self.0)
    }
}

/// Evidential strength class of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalTier {
    /// Traceable to a specific transaction hash or shared final-destination
    /// address; verifiable by re-executing the query
    Deterministic,
    /// Statistical co-occurrence; suggestive but not individually conclusive
    Heuristic,
}

/// One scored coordination signal with its grounding evidence
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Signal name (e.g. "co_funder", "co_time")
    pub name: String,
    /// Deterministic or heuristic
    pub tier: SignalTier,
    /// Strength in [0, 1]
    pub strength: f64,
    /// Observations grounding the signal
    pub evidence: Vec<EvidenceId>,
}

/// Verdict class of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClusterVerdict {
    /// Evidence retained, no cluster conclusion drawn
    Weak,
    /// Suspected linked cluster
    Suspected,
    /// High-confidence linked cluster
    HighConfidence,
}

impl ClusterVerdict {
    /// Get the verdict name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterVerdict::Weak => "weak_link",
            ClusterVerdict::Suspected => "suspected_linked_cluster",
            ClusterVerdict::HighConfidence => "high_confidence_linked_cluster",
        }
    }

    /// One tier down (false-positive demotion)
    pub fn demoted(&self) -> ClusterVerdict {
        match self {
            ClusterVerdict::HighConfidence => ClusterVerdict::Suspected,
            ClusterVerdict::Suspected | ClusterVerdict::Weak => ClusterVerdict::Weak,
        }
    }
}

/// A benign pattern that fits the cluster's feature profile
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeExplanation {
    /// Pattern name from the false-positive library
    pub pattern: String,
    /// Why it fits this cluster
    pub rationale: String,
}

/// A derived wallet cluster
///
/// Recomputed from current features on every scoring pass; never hand-edited
/// and never cached once the underlying edges or features change.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Deterministic per-pass identifier
    pub id: ClusterId,
    /// Member wallets; a wallet belongs to at most one cluster per run
    pub members: BTreeSet<EntityId>,
    /// Mean pairwise relation score of the component
    pub relation_score: f64,
    /// Insider score, once insider inputs have been computed
    pub insider_score: Option<f64>,
    /// Verdict after tiering rules and false-positive review
    pub verdict: ClusterVerdict,
    /// Signals that formed the cluster
    pub signals: Vec<Signal>,
    /// Benign patterns that also fit, recorded on demotion
    pub alternative_explanations: Vec<AlternativeExplanation>,
}

impl Cluster {
    /// Number of deterministic signals
    pub fn deterministic_signal_count(&self) -> usize {
        self.signals
            .iter()
            .filter(|s| s.tier == SignalTier::Deterministic)
            .count()
    }

    /// Number of heuristic signals
    pub fn heuristic_signal_count(&self) -> usize {
        self.signals
            .iter()
            .filter(|s| s.tier == SignalTier::Heuristic)
            .count()
    }

    /// Every observation cited by the cluster's signals
    ///
    /// A cluster citing zero EIDs is illegal; the scorer only emits clusters
    /// whose signals carry evidence.
    pub fn evidence(&self) -> BTreeSet<EvidenceId> {
        self.signals
            .iter()
            .flat_map(|s| s.evidence.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_counts_by_tier() {
        let cluster = Cluster {
            id: ClusterId::new(0),
            members: BTreeSet::new(),
            relation_score: 0.8,
            insider_score: None,
            verdict: ClusterVerdict::Suspected,
            signals: vec![
                Signal {
                    name: "co_funder".into(),
                    tier: SignalTier::Deterministic,
                    strength: 1.0,
                    evidence: vec![EvidenceId::new(1)],
                },
                Signal {
                    name: "co_time".into(),
                    tier: SignalTier::Heuristic,
                    strength: 0.9,
                    evidence: vec![EvidenceId::new(2)],
                },
                Signal {
                    name: "co_amount".into(),
                    tier: SignalTier::Heuristic,
                    strength: 0.8,
                    evidence: vec![EvidenceId::new(2)],
                },
            ],
            alternative_explanations: Vec::new(),
        };

        assert_eq!(cluster.deterministic_signal_count(), 1);
        assert_eq!(cluster.heuristic_signal_count(), 2);
        assert_eq!(cluster.evidence().len(), 2);
    }

    #[test]
    fn test_verdict_demotion_is_bounded() {
        assert_eq!(
            ClusterVerdict::HighConfidence.demoted(),
            ClusterVerdict::Suspected
        );
        assert_eq!(ClusterVerdict::Suspected.demoted(), ClusterVerdict::Weak);
        assert_eq!(ClusterVerdict::Weak.demoted(), ClusterVerdict::Weak);
    }

    #[test]
    fn test_cluster_id_display() {
        assert_eq!(ClusterId::new(7).to_string(), "C007");
    }
}
