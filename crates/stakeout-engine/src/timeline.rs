//! Investigation timeline

use stakeout_domain::EvidenceId;

/// One event on the investigation timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    /// When the underlying event occurred
    pub at: u64,
    /// Observation backing the event, if any (derived events cite their
    /// grounding evidence through the cluster or claim they describe)
    pub eid: Option<EvidenceId>,
    /// What happened
    pub description: String,
    /// Marks a turning point of the investigation narrative
    pub turning_point: bool,
}

impl TimelineEvent {
    /// An observation-backed event
    pub fn observed(at: u64, eid: EvidenceId, description: impl Into<String>) -> Self {
        Self {
            at,
            eid: Some(eid),
            description: description.into(),
            turning_point: false,
        }
    }

    /// Mark this event as a turning point
    pub fn turning(mut self) -> Self {
        self.turning_point = true;
        self
    }
}
