//! Stakeout Claim Resolver & Contradiction Log
//!
//! Maintains per-claim status against the evidence tiers using the domain
//! layer's pure transition function, and keeps the append-only contradiction
//! log. The canonical-address question and the cooperation question are
//! separate claim-key domains; the resolver never lets evidence for one
//! satisfy the other, even when both cite the same source.

#![warn(missing_docs)]

use stakeout_domain::{
    advance_status, Assertion, Claim, ClaimKey, ClaimStatus, ContradictionRecord, Observation,
    ObservationPayload,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One row of the claim matrix, for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimMatrixRow {
    /// Claim key
    pub key: ClaimKey,
    /// Statement of the question
    pub statement: String,
    /// Current status
    pub status: ClaimStatus,
    /// Total citations
    pub evidence_count: usize,
    /// P0 citations
    pub p0_count: usize,
    /// P1 citations
    pub p1_count: usize,
    /// P2 citations
    pub p2_count: usize,
    /// An unresolved contradiction references this claim
    pub has_active_contradiction: bool,
}

/// Tracks claims and their contradictions for one investigation run
pub struct ClaimResolver {
    claims: BTreeMap<ClaimKey, Claim>,
    contradictions: Vec<ContradictionRecord>,
}

impl ClaimResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self {
            claims: BTreeMap::new(),
            contradictions: Vec::new(),
        }
    }

    /// Register a claim in the Proposed state
    ///
    /// Idempotent; an already-tracked claim keeps its state.
    pub fn track(&mut self, key: ClaimKey, statement: impl Into<String>) {
        self.claims
            .entry(key.clone())
            .or_insert_with(|| Claim::proposed(key, statement));
    }

    /// Feed one observation through the resolver
    ///
    /// Non-assertion payloads are ignored. Assertions about untracked claims
    /// auto-track them first. Returns the claim's status after the
    /// transition, or `None` for non-assertion payloads.
    pub fn observe(&mut self, observation: &Observation) -> Option<ClaimStatus> {
        let ObservationPayload::ClaimAssertion {
            claim_key,
            asserted,
            at,
        } = &observation.payload
        else {
            return None;
        };

        let key = ClaimKey::custom(claim_key.clone());
        let claim = self
            .claims
            .entry(key.clone())
            .or_insert_with(|| Claim::proposed(key.clone(), claim_key.clone()));

        let incoming = Assertion {
            eid: observation.eid,
            tier: observation.tier,
            value: asserted.clone(),
            at: *at,
        };

        let (next, record) = advance_status(&key, claim.status, &claim.assertions, &incoming);

        if next != claim.status {
            info!(
                claim = %key,
                from = claim.status.as_str(),
                to = next.as_str(),
                eid = %observation.eid,
                "claim status transition"
            );
        } else {
            debug!(claim = %key, status = next.as_str(), eid = %observation.eid, "claim corroborated");
        }

        claim.status = next;
        claim.evidence.insert(observation.eid);
        claim.assertions.push(incoming);

        if let Some(record) = record {
            self.contradictions.push(record);
        }

        Some(next)
    }

    /// Get a claim by key
    pub fn claim(&self, key: &ClaimKey) -> Option<&Claim> {
        self.claims.get(key)
    }

    /// All tracked claims in key order
    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    /// The append-only contradiction log
    pub fn contradiction_log(&self) -> &[ContradictionRecord] {
        &self.contradictions
    }

    /// Whether any unresolved contradiction references a claim
    pub fn has_active_contradiction(&self, key: &ClaimKey) -> bool {
        // A later superseding record resolves earlier disputes over the same
        // claim; only claims whose newest record is unresolved stay blocked.
        self.contradictions
            .iter()
            .filter(|r| &r.claim_key == key)
            .last()
            .map(|r| r.is_active())
            .unwrap_or(false)
    }

    /// Whether an Official/Confirmed verdict may be emitted for a claim
    ///
    /// Requires Confirmed status and no active contradiction.
    pub fn official_verdict_allowed(&self, key: &ClaimKey) -> bool {
        self.claim(key)
            .map(|c| c.status == ClaimStatus::Confirmed && !self.has_active_contradiction(key))
            .unwrap_or(false)
    }

    /// Status of the canonical-address question for an address
    ///
    /// Consults only the `identity.canonical_address` key domain.
    pub fn canonical_address_status(&self, address: &str) -> ClaimStatus {
        self.claim(&ClaimKey::canonical_address(address))
            .map(|c| c.status)
            .unwrap_or(ClaimStatus::Proposed)
    }

    /// Status of the cooperation question for a subject/partner pair
    ///
    /// Consults only the `identity.cooperation` key domain; affiliation
    /// evidence never answers the canonical-address question.
    pub fn cooperation_status(&self, subject: &str, partner: &str) -> ClaimStatus {
        self.claim(&ClaimKey::cooperation(subject, partner))
            .map(|c| c.status)
            .unwrap_or(ClaimStatus::Proposed)
    }

    /// Claim matrix for reporting
    pub fn claim_matrix(&self) -> Vec<ClaimMatrixRow> {
        self.claims
            .values()
            .map(|claim| {
                let count_tier = |tier| {
                    claim
                        .assertions
                        .iter()
                        .filter(|a| a.tier == tier)
                        .count()
                };
                ClaimMatrixRow {
                    key: claim.key.clone(),
                    statement: claim.statement.clone(),
                    status: claim.status,
                    evidence_count: claim.evidence.len(),
                    p0_count: count_tier(stakeout_domain::SourceTier::P0),
                    p1_count: count_tier(stakeout_domain::SourceTier::P1),
                    p2_count: count_tier(stakeout_domain::SourceTier::P2),
                    has_active_contradiction: self.has_active_contradiction(&claim.key),
                }
            })
            .collect()
    }
}

impl Default for ClaimResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeout_domain::{EvidenceId, SourceTier};

    fn assertion_obs(eid: u64, tier: SourceTier, key: &str, value: &str, at: u64) -> Observation {
        Observation {
            eid: EvidenceId::new(eid),
            source_url: format!("https://source/{}", eid),
            fetched_at: at + 100,
            tier,
            payload: ObservationPayload::ClaimAssertion {
                claim_key: key.to_string(),
                asserted: value.to_string(),
                at,
            },
        }
    }

    fn ca_key(address: &str) -> String {
        ClaimKey::canonical_address(address).as_str().to_string()
    }

    #[test]
    fn test_confirmation_requires_p0_and_p1() {
        let mut resolver = ClaimResolver::new();
        let key = ca_key("0xabc");

        resolver.observe(&assertion_obs(1, SourceTier::P0, &key, "0xabc", 100));
        assert_eq!(resolver.canonical_address_status("0xabc"), ClaimStatus::Unverified);

        resolver.observe(&assertion_obs(2, SourceTier::P1, &key, "0xabc", 200));
        assert_eq!(resolver.canonical_address_status("0xabc"), ClaimStatus::Confirmed);
        assert!(resolver.official_verdict_allowed(&ClaimKey::canonical_address("0xabc")));
    }

    #[test]
    fn test_p2_listing_contradicted_by_p0_not_launched() {
        // A P2 listing site asserts "CA = 0xabc" while official docs (P0)
        // state the token has not launched.
        let mut resolver = ClaimResolver::new();
        let key = ca_key("0xabc");

        resolver.observe(&assertion_obs(1, SourceTier::P2, &key, "0xabc", 100));
        resolver.observe(&assertion_obs(2, SourceTier::P0, &key, "not_launched", 200));

        assert_eq!(resolver.canonical_address_status("0xabc"), ClaimStatus::Contradicted);
        assert!(!resolver.official_verdict_allowed(&ClaimKey::canonical_address("0xabc")));
        assert_eq!(resolver.contradiction_log().len(), 1);
        assert!(resolver.contradiction_log()[0].is_active());
    }

    #[test]
    fn test_equal_tier_conflict_blocks_official_verdict() {
        let mut resolver = ClaimResolver::new();
        let key = ca_key("0xabc");

        resolver.observe(&assertion_obs(1, SourceTier::P1, &key, "0xabc", 100));
        resolver.observe(&assertion_obs(2, SourceTier::P1, &key, "not_launched", 200));

        assert_eq!(resolver.canonical_address_status("0xabc"), ClaimStatus::Contradicted);
        assert!(resolver.has_active_contradiction(&ClaimKey::canonical_address("0xabc")));
        assert!(!resolver.official_verdict_allowed(&ClaimKey::canonical_address("0xabc")));
    }

    #[test]
    fn test_supersede_documents_resolution_path() {
        let mut resolver = ClaimResolver::new();
        let key = ca_key("0xabc");

        resolver.observe(&assertion_obs(1, SourceTier::P2, &key, "not_launched", 100));
        // First conflict lands in Contradicted regardless of tier.
        resolver.observe(&assertion_obs(2, SourceTier::P1, &key, "0xabc", 200));
        // The newer P0 outranks the lone conflicting P2 and supersedes it.
        resolver.observe(&assertion_obs(3, SourceTier::P0, &key, "0xabc", 300));

        assert_eq!(resolver.canonical_address_status("0xabc"), ClaimStatus::Confirmed);
        // Every conflict produced a record; the latest documents resolution.
        assert!(!resolver.contradiction_log().is_empty());
        assert!(!resolver.has_active_contradiction(&ClaimKey::canonical_address("0xabc")));
    }

    #[test]
    fn test_cooperation_evidence_never_answers_canonical_address() {
        let mut resolver = ClaimResolver::new();
        let coop_key = ClaimKey::cooperation("project_x", "exchange_y")
            .as_str()
            .to_string();

        // Strong affiliation evidence from the same source that also lists
        // the address.
        resolver.observe(&assertion_obs(1, SourceTier::P0, &coop_key, "affiliated", 100));
        resolver.observe(&assertion_obs(2, SourceTier::P1, &coop_key, "affiliated", 200));

        assert_eq!(
            resolver.cooperation_status("project_x", "exchange_y"),
            ClaimStatus::Confirmed
        );
        // The canonical-address question is untouched.
        assert_eq!(resolver.canonical_address_status("0xabc"), ClaimStatus::Proposed);
        assert!(!resolver.official_verdict_allowed(&ClaimKey::canonical_address("0xabc")));
    }

    #[test]
    fn test_track_is_idempotent() {
        let mut resolver = ClaimResolver::new();
        let key = ClaimKey::canonical_address("0xabc");
        resolver.track(key.clone(), "is 0xabc the canonical contract");

        let obs = assertion_obs(1, SourceTier::P0, &ca_key("0xabc"), "0xabc", 100);
        resolver.observe(&obs);
        resolver.track(key.clone(), "is 0xabc the canonical contract");

        assert_eq!(resolver.claim(&key).unwrap().status, ClaimStatus::Unverified);
        assert_eq!(resolver.claim(&key).unwrap().evidence.len(), 1);
    }

    #[test]
    fn test_non_assertion_payloads_ignored() {
        let mut resolver = ClaimResolver::new();
        let obs = Observation {
            eid: EvidenceId::new(1),
            source_url: "https://rpc/tx".to_string(),
            fetched_at: 100,
            tier: SourceTier::P1,
            payload: ObservationPayload::Transfer {
                tx_hash: "0x01".to_string(),
                from: "0xa".to_string(),
                to: "0xb".to_string(),
                asset: "0xt".to_string(),
                amount: 1.0,
                at: 90,
            },
        };
        assert_eq!(resolver.observe(&obs), None);
        assert_eq!(resolver.claims().count(), 0);
    }

    #[test]
    fn test_claim_matrix_counts_tiers() {
        let mut resolver = ClaimResolver::new();
        let key = ca_key("0xabc");
        resolver.observe(&assertion_obs(1, SourceTier::P0, &key, "0xabc", 100));
        resolver.observe(&assertion_obs(2, SourceTier::P1, &key, "0xabc", 200));
        resolver.observe(&assertion_obs(3, SourceTier::P2, &key, "0xabc", 300));

        let matrix = resolver.claim_matrix();
        assert_eq!(matrix.len(), 1);
        let row = &matrix[0];
        assert_eq!(row.status, ClaimStatus::Confirmed);
        assert_eq!(row.evidence_count, 3);
        assert_eq!((row.p0_count, row.p1_count, row.p2_count), (1, 1, 1));
        assert!(!row.has_active_contradiction);
    }
}
