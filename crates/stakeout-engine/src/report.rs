//! Serializable run report
//!
//! The reporting surface the CLI (and any template renderer outside the
//! core) consumes. Everything cites EIDs; nothing here is new analysis, only
//! a flattened view of the run's derived state.

use crate::investigation::Investigation;
use serde::{Deserialize, Serialize};
use stakeout_domain::{Cluster, SignalTier};
use stakeout_gatekeeper::Mode;

/// One signal on a reported cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReport {
    /// Signal name
    pub name: String,
    /// "deterministic" or "heuristic"
    pub tier: String,
    /// Strength in [0, 1]
    pub strength: f64,
    /// Grounding EIDs
    pub evidence: Vec<u64>,
}

/// One cluster in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    /// Cluster id, e.g. "C000"
    pub id: String,
    /// Member wallet addresses
    pub members: Vec<String>,
    /// Mean pairwise relation score
    pub relation_score: f64,
    /// Insider score, if computed
    pub insider_score: Option<f64>,
    /// Insider classification, if computed
    pub insider_label: Option<String>,
    /// Verdict after tiering and false-positive review
    pub verdict: String,
    /// Deterministic signal count
    pub deterministic_signals: usize,
    /// Heuristic signal count
    pub heuristic_signals: usize,
    /// The signals themselves
    pub signals: Vec<SignalReport>,
    /// Benign patterns that also fit, recorded on demotion
    pub alternative_explanations: Vec<String>,
    /// Every EID the cluster cites
    pub evidence: Vec<u64>,
}

/// One claim in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimReport {
    /// Claim key
    pub key: String,
    /// Statement of the question
    pub statement: String,
    /// Current status
    pub status: String,
    /// Total citations
    pub evidence_count: usize,
    /// Citations per tier: (P0, P1, P2)
    pub tier_counts: (usize, usize, usize),
    /// An unresolved contradiction references this claim
    pub has_active_contradiction: bool,
}

/// One contradiction in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionReport {
    /// The disputed claim
    pub claim_key: String,
    /// Observations on both sides
    pub conflicting_eids: Vec<u64>,
    /// When the conflict was detected
    pub detected_at: u64,
    /// Whether the record still blocks a Confirmed verdict
    pub active: bool,
}

/// One timeline event in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEventReport {
    /// Event time
    pub at: u64,
    /// Backing observation, if any
    pub eid: Option<u64>,
    /// What happened
    pub description: String,
    /// Turning point of the narrative
    pub turning_point: bool,
}

/// One flagged holder in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedHolderReport {
    /// Holder address
    pub address: String,
    /// Share of supply, percent
    pub balance_pct: f64,
    /// Total risk score
    pub risk_score: u32,
    /// Monitoring recommendation
    pub monitoring_level: String,
    /// Flag kinds raised
    pub flags: Vec<String>,
    /// Snapshot observation the profile came from
    pub eid: u64,
}

/// One acquisition gap in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    /// Source descriptor that failed
    pub source: String,
    /// Evidence domain marked Unknown
    pub domain: String,
    /// The typed failure
    pub error: String,
}

/// Completeness section of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    /// Mode the gate was checked under
    pub mode: String,
    /// Whether every check passed
    pub complete: bool,
    /// Failure reasons, empty when complete
    pub reasons: Vec<String>,
}

/// The full report of one investigation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier
    pub run_id: String,
    /// Chain investigated
    pub chain: String,
    /// Where the scoring thresholds came from ("default" or
    /// "calibrated:<bucket>")
    pub threshold_provenance: String,
    /// Highest confidence label this configuration may report
    pub confidence_cap: String,
    /// Numeric ceiling after acquisition-gap penalties
    pub confidence_ceiling: f64,
    /// Link confidence for the canonical-address question, 0-100
    pub identity_link_confidence: Option<f64>,
    /// Link-confidence classification
    pub identity_link_label: Option<String>,
    /// Clusters from the latest analysis pass
    pub clusters: Vec<ClusterReport>,
    /// Claim matrix
    pub claims: Vec<ClaimReport>,
    /// Contradiction log
    pub contradictions: Vec<ContradictionReport>,
    /// Run timeline
    pub timeline: Vec<TimelineEventReport>,
    /// Flagged holders
    pub flagged_holders: Vec<FlaggedHolderReport>,
    /// Acquisition gaps
    pub gaps: Vec<GapReport>,
    /// Completeness gate result
    pub completeness: CompletenessReport,
}

impl ClusterReport {
    fn build(run: &Investigation, cluster: &Cluster) -> Self {
        let members = cluster
            .members
            .iter()
            .filter_map(|id| run.graph().entity(*id).ok())
            .map(|e| e.key.clone())
            .collect();
        Self {
            id: cluster.id.to_string(),
            members,
            relation_score: cluster.relation_score,
            insider_score: cluster.insider_score,
            insider_label: run
                .insider_label(cluster.id)
                .map(|l| l.as_str().to_string()),
            verdict: cluster.verdict.as_str().to_string(),
            deterministic_signals: cluster.deterministic_signal_count(),
            heuristic_signals: cluster.heuristic_signal_count(),
            signals: cluster
                .signals
                .iter()
                .map(|s| SignalReport {
                    name: s.name.clone(),
                    tier: match s.tier {
                        SignalTier::Deterministic => "deterministic".to_string(),
                        SignalTier::Heuristic => "heuristic".to_string(),
                    },
                    strength: s.strength,
                    evidence: s.evidence.iter().map(|e| e.value()).collect(),
                })
                .collect(),
            alternative_explanations: cluster
                .alternative_explanations
                .iter()
                .map(|a| format!("{}: {}", a.pattern, a.rationale))
                .collect(),
            evidence: cluster.evidence().into_iter().map(|e| e.value()).collect(),
        }
    }
}

impl RunReport {
    /// Flatten a run's derived state into a report
    pub fn from_investigation(run: &Investigation, mode: Mode) -> Self {
        let completeness = run.check_completeness(mode);
        // Inputs are computed fractions, already in range.
        let identity_link_confidence = run.identity_link_confidence().ok().flatten();
        Self {
            run_id: run.run_id().to_string(),
            chain: run.config().chain.clone(),
            threshold_provenance: run.config().scoring.thresholds.provenance.to_string(),
            confidence_cap: run.config().scoring.confidence_cap().as_str().to_string(),
            confidence_ceiling: run.confidence_ceiling(),
            identity_link_confidence,
            identity_link_label: identity_link_confidence.map(|score| {
                stakeout_scorer::classify_link_confidence(
                    score,
                    &run.config().scoring.thresholds,
                )
                .as_str()
                .to_string()
            }),
            clusters: run
                .clusters()
                .iter()
                .map(|c| ClusterReport::build(run, c))
                .collect(),
            claims: run
                .get_claim_matrix()
                .into_iter()
                .map(|row| ClaimReport {
                    key: row.key.as_str().to_string(),
                    statement: row.statement,
                    status: row.status.as_str().to_string(),
                    evidence_count: row.evidence_count,
                    tier_counts: (row.p0_count, row.p1_count, row.p2_count),
                    has_active_contradiction: row.has_active_contradiction,
                })
                .collect(),
            contradictions: run
                .get_contradiction_log()
                .iter()
                .map(|r| ContradictionReport {
                    claim_key: r.claim_key.as_str().to_string(),
                    conflicting_eids: r.conflicting_eids.iter().map(|e| e.value()).collect(),
                    detected_at: r.detected_at,
                    active: r.is_active(),
                })
                .collect(),
            timeline: run
                .get_timeline()
                .into_iter()
                .map(|e| TimelineEventReport {
                    at: e.at,
                    eid: e.eid.map(|eid| eid.value()),
                    description: e.description,
                    turning_point: e.turning_point,
                })
                .collect(),
            flagged_holders: run
                .flagged_holders()
                .iter()
                .map(|h| FlaggedHolderReport {
                    address: h.address.clone(),
                    balance_pct: h.balance_pct,
                    risk_score: h.risk_score,
                    monitoring_level: h.level.as_str().to_string(),
                    flags: h.flags.iter().map(|f| f.kind.to_string()).collect(),
                    eid: h.eid.value(),
                })
                .collect(),
            gaps: run
                .gaps()
                .iter()
                .map(|g| GapReport {
                    source: g.source.clone(),
                    domain: g.domain.as_str().to_string(),
                    error: g.error.to_string(),
                })
                .collect(),
            completeness: CompletenessReport {
                mode: mode.as_str().to_string(),
                complete: completeness.is_complete(),
                reasons: completeness
                    .reasons()
                    .iter()
                    .map(|r| r.describe())
                    .collect(),
            },
        }
    }
}
