//! Claims, their status machine, and the contradiction log
//!
//! A claim is a tracked question ("is address A the canonical contract"),
//! never a fact. Its status moves monotonically toward more evidence; a
//! downgrade is only possible through an explicit, logged contradiction.

use crate::{EvidenceId, SourceTier};
use std::collections::BTreeSet;
use std::fmt;

/// Uniqueness key of a tracked claim
///
/// Keys partition into independent question domains. The canonical-address
/// question and the cooperation/partnership question are separate domains by
/// construction: evidence recorded under one key can never satisfy the other,
/// even when both cite the same source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimKey(String);

impl ClaimKey {
    /// Key for "is this address the canonical contract for the project"
    pub fn canonical_address(address: &str) -> Self {
        Self(format!("identity.canonical_address:{}", address.to_lowercase()))
    }

    /// Key for "is X affiliated/cooperating with Y"
    pub fn cooperation(subject: &str, partner: &str) -> Self {
        Self(format!(
            "identity.cooperation:{}:{}",
            subject.to_lowercase(),
            partner.to_lowercase()
        ))
    }

    /// Arbitrary claim key as produced by the acquisition layer
    pub fn custom(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The question domain this key belongs to
    pub fn question_domain(&self) -> QuestionDomain {
        if self.0.starts_with("identity.canonical_address:") {
            QuestionDomain::CanonicalAddress
        } else if self.0.starts_with("identity.cooperation:") {
            QuestionDomain::Cooperation
        } else {
            QuestionDomain::Other
        }
    }

    /// Raw key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Independent question domains claims partition into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionDomain {
    /// "Is address A the canonical contract"
    CanonicalAddress,
    /// "Is X affiliated with Y"
    Cooperation,
    /// Anything else
    Other,
}

/// Status of a tracked claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimStatus {
    /// Tracked, no assertion recorded yet
    Proposed,
    /// At least one P0 and one P1 citation, no conflict
    Confirmed,
    /// Evidence exists but tier/count requirements are unmet
    Unverified,
    /// Mutually exclusive assertions recorded
    Contradicted,
}

impl ClaimStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Proposed => "proposed",
            ClaimStatus::Confirmed => "confirmed",
            ClaimStatus::Unverified => "unverified",
            ClaimStatus::Contradicted => "contradicted",
        }
    }
}

/// One recorded assertion about a claim
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    /// Observation the assertion came from
    pub eid: EvidenceId,
    /// Authority tier of that observation's source
    pub tier: SourceTier,
    /// Asserted value; differing values for one claim are mutually exclusive
    pub value: String,
    /// When the assertion was made
    pub at: u64,
}

/// How a logged contradiction was (or was not) resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Still standing; forbids a Confirmed/Official verdict
    Unresolved,
    /// A strictly higher-tier observation superseded the conflicting side
    Superseded {
        /// The observation that settled the question
        by: EvidenceId,
    },
}

/// Record of two observations disagreeing about one claim
#[derive(Debug, Clone, PartialEq)]
pub struct ContradictionRecord {
    /// The disputed claim
    pub claim_key: ClaimKey,
    /// Observations on both sides of the disagreement
    pub conflicting_eids: Vec<EvidenceId>,
    /// When the conflict was detected
    pub detected_at: u64,
    /// Resolution state
    pub resolution: Resolution,
}

impl ContradictionRecord {
    /// Whether this record still blocks a Confirmed verdict
    pub fn is_active(&self) -> bool {
        matches!(self.resolution, Resolution::Unresolved)
    }
}

/// A tracked claim with its accumulated evidence
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Uniqueness key
    pub key: ClaimKey,
    /// Human-readable statement of the question
    pub statement: String,
    /// Current status
    pub status: ClaimStatus,
    /// Every observation cited by this claim
    pub evidence: BTreeSet<EvidenceId>,
    /// Accumulated assertions, ingestion order
    pub assertions: Vec<Assertion>,
}

impl Claim {
    /// Create a claim in the Proposed state
    pub fn proposed(key: ClaimKey, statement: impl Into<String>) -> Self {
        Self {
            key,
            statement: statement.into(),
            status: ClaimStatus::Proposed,
            evidence: BTreeSet::new(),
            assertions: Vec::new(),
        }
    }
}

/// Advance a claim's status with a new assertion
///
/// Pure transition function: takes the current state and the accumulated
/// assertions, returns the next state plus an optional contradiction record.
/// Rules:
///
/// - conflicting values force `Contradicted` with an unresolved record;
/// - `Contradicted` is irreversible for the run, except when a newer
///   assertion's tier strictly outranks every conflicting one: the surviving
///   side is then re-evaluated and the resolution path documented by a fresh
///   record;
/// - with no conflict, `Confirmed` requires at least one P0 and one P1
///   citation; otherwise `Unverified`.
pub fn advance_status(
    key: &ClaimKey,
    current: ClaimStatus,
    prior: &[Assertion],
    incoming: &Assertion,
) -> (ClaimStatus, Option<ContradictionRecord>) {
    let conflicting: Vec<&Assertion> = prior.iter().filter(|a| a.value != incoming.value).collect();

    if !conflicting.is_empty() {
        // Supersession is only available once the contradiction has been
        // logged: first detection always lands in Contradicted.
        let supersedes = current == ClaimStatus::Contradicted
            && conflicting.iter().all(|a| incoming.tier.outranks(a.tier));
        let mut eids: Vec<EvidenceId> = conflicting.iter().map(|a| a.eid).collect();
        eids.push(incoming.eid);

        if supersedes {
            // The higher-tier observation settles the question; status is
            // recomputed over the surviving side only.
            let surviving: Vec<Assertion> = prior
                .iter()
                .filter(|a| a.value == incoming.value)
                .cloned()
                .chain(std::iter::once(incoming.clone()))
                .collect();
            let record = ContradictionRecord {
                claim_key: key.clone(),
                conflicting_eids: eids,
                detected_at: incoming.at,
                resolution: Resolution::Superseded { by: incoming.eid },
            };
            (status_from_evidence(&surviving), Some(record))
        } else {
            let record = ContradictionRecord {
                claim_key: key.clone(),
                conflicting_eids: eids,
                detected_at: incoming.at,
                resolution: Resolution::Unresolved,
            };
            (ClaimStatus::Contradicted, Some(record))
        }
    } else {
        // No conflict. Contradicted stays Contradicted: agreement with one
        // side of an already-logged dispute does not resolve it.
        if current == ClaimStatus::Contradicted {
            return (ClaimStatus::Contradicted, None);
        }
        let all: Vec<Assertion> = prior
            .iter()
            .cloned()
            .chain(std::iter::once(incoming.clone()))
            .collect();
        (status_from_evidence(&all), None)
    }
}

/// Confirmed requires at least one P0 and one P1 citation
fn status_from_evidence(assertions: &[Assertion]) -> ClaimStatus {
    let has_p0 = assertions.iter().any(|a| a.tier == SourceTier::P0);
    let has_p1 = assertions.iter().any(|a| a.tier == SourceTier::P1);
    if has_p0 && has_p1 {
        ClaimStatus::Confirmed
    } else {
        ClaimStatus::Unverified
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_tier() -> impl Strategy<Value = SourceTier> {
        prop_oneof![
            Just(SourceTier::P0),
            Just(SourceTier::P1),
            Just(SourceTier::P2),
        ]
    }

    fn arb_assertion(values: &'static [&'static str]) -> impl Strategy<Value = Assertion> {
        (any::<u64>(), arb_tier(), 0..values.len(), any::<u64>()).prop_map(
            move |(eid, tier, idx, at)| Assertion {
                eid: EvidenceId::new(eid),
                tier,
                value: values[idx].to_string(),
                at,
            },
        )
    }

    proptest! {
        /// Property: a status can only leave Contradicted through a logged
        /// resolution record - never silently.
        #[test]
        fn test_no_silent_downgrade_or_recovery(
            prior in prop::collection::vec(arb_assertion(&["a", "b"]), 0..6),
            incoming in arb_assertion(&["a", "b"]),
        ) {
            let key = ClaimKey::custom("prop:claim");
            let (next, record) =
                advance_status(&key, ClaimStatus::Contradicted, &prior, &incoming);
            if next != ClaimStatus::Contradicted {
                prop_assert!(record.is_some(),
                    "leaving Contradicted requires a documented resolution");
                prop_assert!(!record.unwrap().is_active());
            }
        }

        /// Property: Confirmed always implies a P0 and a P1 citation among
        /// the assertions that survive the transition.
        #[test]
        fn test_confirmed_implies_tier_coverage(
            prior in prop::collection::vec(arb_assertion(&["a"]), 0..6),
            incoming in arb_assertion(&["a"]),
        ) {
            let key = ClaimKey::custom("prop:claim");
            let (next, _) = advance_status(&key, ClaimStatus::Proposed, &prior, &incoming);
            if next == ClaimStatus::Confirmed {
                let all: Vec<_> = prior.iter().chain(std::iter::once(&incoming)).collect();
                prop_assert!(all.iter().any(|a| a.tier == SourceTier::P0));
                prop_assert!(all.iter().any(|a| a.tier == SourceTier::P1));
            }
        }

        /// Property: conflicting values always produce a contradiction record.
        #[test]
        fn test_conflict_always_logged(
            prior in prop::collection::vec(arb_assertion(&["a"]), 1..6),
            incoming in arb_assertion(&["b"]),
        ) {
            let key = ClaimKey::custom("prop:claim");
            let (_, record) = advance_status(&key, ClaimStatus::Unverified, &prior, &incoming);
            prop_assert!(record.is_some());
        }
    }
}
