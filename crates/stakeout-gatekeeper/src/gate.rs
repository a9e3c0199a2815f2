//! Completeness validation over an investigation's evidence state

use crate::{CompletenessConfig, Mode};
use stakeout_domain::{EvidenceDomain, EvidenceId};
use std::collections::{BTreeMap, BTreeSet};

/// A headline conclusion with its citations
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineConclusion {
    /// The conclusion being reported
    pub statement: String,
    /// Citations backing it
    pub evidence: Vec<EvidenceId>,
    /// Explicitly flagged as single-source with reduced confidence
    pub single_source_flagged: bool,
}

/// Snapshot of an investigation's evidence state, as seen by the gate
///
/// Built by the engine; the gate itself is a pure function over it.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSummary {
    /// Citation counts per mandated domain
    pub domain_citations: BTreeMap<EvidenceDomain, usize>,
    /// Domains explicitly marked Unknown (acquisition gaps)
    pub domains_marked_unknown: BTreeSet<EvidenceDomain>,
    /// Headline conclusions the report would emit
    pub headline_conclusions: Vec<HeadlineConclusion>,
    /// Timeline event count
    pub timeline_events: usize,
    /// Turning-point count
    pub turning_points: usize,
    /// The canonical-address question has an answer beyond Proposed
    pub canonical_address_answered: bool,
    /// The cooperation question has an answer beyond Proposed
    pub cooperation_answered: bool,
}

/// One reason a run is not yet complete
#[derive(Debug, Clone, PartialEq)]
pub enum IncompleteReason {
    /// A mandated domain has zero citations and no Unknown marker
    MissingDomain(EvidenceDomain),

    /// A headline conclusion cites too few independent observations
    UnderCitedHeadline {
        /// The conclusion
        statement: String,
        /// Independent citations present
        citations: usize,
        /// Citations required
        required: usize,
    },

    /// Timeline has too few events for the mode
    TimelineTooSparse {
        /// Events present
        events: usize,
        /// Events required
        required: usize,
    },

    /// Timeline has too few turning points for the mode
    TooFewTurningPoints {
        /// Turning points present
        count: usize,
        /// Turning points required
        required: usize,
    },

    /// An identity question has no answer yet
    IdentityQuestionUnanswered {
        /// Which question
        question: &'static str,
    },
}

impl IncompleteReason {
    /// Human-readable description
    pub fn describe(&self) -> String {
        match self {
            IncompleteReason::MissingDomain(domain) => format!(
                "evidence domain '{}' has no citations and is not marked unknown",
                domain.as_str()
            ),
            IncompleteReason::UnderCitedHeadline {
                statement,
                citations,
                required,
            } => format!(
                "headline '{}' cites {} observation(s), needs {} or a single-source flag",
                statement, citations, required
            ),
            IncompleteReason::TimelineTooSparse { events, required } => {
                format!("timeline has {} events, mode requires {}", events, required)
            }
            IncompleteReason::TooFewTurningPoints { count, required } => {
                format!("timeline has {} turning points, mode requires {}", count, required)
            }
            IncompleteReason::IdentityQuestionUnanswered { question } => {
                format!("identity question '{}' is unanswered", question)
            }
        }
    }
}

/// Gate result
#[derive(Debug, Clone, PartialEq)]
pub enum Completeness {
    /// All checks passed
    Complete,
    /// One or more checks failed; keep collecting
    Incomplete(Vec<IncompleteReason>),
}

impl Completeness {
    /// Whether the run passed
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }

    /// The failure reasons, empty when complete
    pub fn reasons(&self) -> &[IncompleteReason] {
        match self {
            Completeness::Complete => &[],
            Completeness::Incomplete(reasons) => reasons,
        }
    }
}

/// The completeness gate
pub struct CompletenessGate {
    config: CompletenessConfig,
}

impl CompletenessGate {
    /// Create a gate with the given configuration
    pub fn new(config: CompletenessConfig) -> Self {
        Self { config }
    }

    /// Create a gate with default configuration
    pub fn default_config() -> Self {
        Self::new(CompletenessConfig::default())
    }

    /// Check an evidence summary against the mode's requirements
    ///
    /// Pure: no state is read beyond the arguments, and the summary is not
    /// modified. All checks run; every failure is reported, not just the
    /// first.
    pub fn check(&self, mode: Mode, summary: &EvidenceSummary) -> Completeness {
        let mut reasons = Vec::new();

        // 1. Every mandated domain cited or explicitly Unknown
        for domain in EvidenceDomain::ALL {
            let cited = summary.domain_citations.get(&domain).copied().unwrap_or(0);
            if cited == 0 && !summary.domains_marked_unknown.contains(&domain) {
                reasons.push(IncompleteReason::MissingDomain(domain));
            }
        }

        // 2. Headline conclusions: two independent citations or a flag
        for headline in &summary.headline_conclusions {
            let independent: BTreeSet<EvidenceId> = headline.evidence.iter().copied().collect();
            if independent.len() < self.config.min_headline_citations
                && !headline.single_source_flagged
            {
                reasons.push(IncompleteReason::UnderCitedHeadline {
                    statement: headline.statement.clone(),
                    citations: independent.len(),
                    required: self.config.min_headline_citations,
                });
            }
        }

        // 3. Timeline density
        let (min_events, min_turning) = self.config.timeline_minimums(mode);
        if summary.timeline_events < min_events {
            reasons.push(IncompleteReason::TimelineTooSparse {
                events: summary.timeline_events,
                required: min_events,
            });
        }
        if summary.turning_points < min_turning {
            reasons.push(IncompleteReason::TooFewTurningPoints {
                count: summary.turning_points,
                required: min_turning,
            });
        }

        // 4. Both identity questions answered, independently
        if !summary.canonical_address_answered {
            reasons.push(IncompleteReason::IdentityQuestionUnanswered {
                question: "canonical_address",
            });
        }
        if !summary.cooperation_answered {
            reasons.push(IncompleteReason::IdentityQuestionUnanswered {
                question: "cooperation",
            });
        }

        if reasons.is_empty() {
            Completeness::Complete
        } else {
            Completeness::Incomplete(reasons)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A summary that passes every standard-mode check
    fn complete_summary() -> EvidenceSummary {
        let mut domain_citations = BTreeMap::new();
        for domain in EvidenceDomain::ALL {
            domain_citations.insert(domain, 2);
        }
        EvidenceSummary {
            domain_citations,
            domains_marked_unknown: BTreeSet::new(),
            headline_conclusions: vec![HeadlineConclusion {
                statement: "four wallets form a coordinated cluster".to_string(),
                evidence: vec![EvidenceId::new(1), EvidenceId::new(2)],
                single_source_flagged: false,
            }],
            timeline_events: 10,
            turning_points: 3,
            canonical_address_answered: true,
            cooperation_answered: true,
        }
    }

    #[test]
    fn test_complete_summary_passes() {
        let gate = CompletenessGate::default_config();
        assert!(gate.check(Mode::Standard, &complete_summary()).is_complete());
    }

    #[test]
    fn test_zero_citation_domain_fails_regardless_of_rest() {
        let gate = CompletenessGate::default_config();
        let mut summary = complete_summary();
        summary.domain_citations.remove(&EvidenceDomain::Website);

        let result = gate.check(Mode::Standard, &summary);
        assert!(!result.is_complete());
        assert!(result
            .reasons()
            .contains(&IncompleteReason::MissingDomain(EvidenceDomain::Website)));
    }

    #[test]
    fn test_unknown_marker_satisfies_domain_check() {
        let gate = CompletenessGate::default_config();
        let mut summary = complete_summary();
        summary.domain_citations.remove(&EvidenceDomain::Website);
        summary.domains_marked_unknown.insert(EvidenceDomain::Website);

        assert!(gate.check(Mode::Standard, &summary).is_complete());
    }

    #[test]
    fn test_five_events_standard_mode_is_incomplete() {
        let gate = CompletenessGate::default_config();
        let mut summary = complete_summary();
        summary.timeline_events = 5;

        let result = gate.check(Mode::Standard, &summary);
        assert!(!result.is_complete());
        assert!(result.reasons().contains(&IncompleteReason::TimelineTooSparse {
            events: 5,
            required: 8,
        }));
    }

    #[test]
    fn test_five_events_pass_quick_mode() {
        let gate = CompletenessGate::default_config();
        let mut summary = complete_summary();
        summary.timeline_events = 5;
        summary.turning_points = 1;

        assert!(gate.check(Mode::Quick, &summary).is_complete());
    }

    #[test]
    fn test_deep_mode_requires_fifteen_events() {
        let gate = CompletenessGate::default_config();
        let summary = complete_summary();
        let result = gate.check(Mode::Deep, &summary);
        assert!(result.reasons().contains(&IncompleteReason::TimelineTooSparse {
            events: 10,
            required: 15,
        }));
    }

    #[test]
    fn test_single_source_headline_needs_flag() {
        let gate = CompletenessGate::default_config();
        let mut summary = complete_summary();
        summary.headline_conclusions[0].evidence = vec![EvidenceId::new(1)];

        let result = gate.check(Mode::Standard, &summary);
        assert!(matches!(
            result.reasons()[0],
            IncompleteReason::UnderCitedHeadline { citations: 1, required: 2, .. }
        ));

        summary.headline_conclusions[0].single_source_flagged = true;
        assert!(gate.check(Mode::Standard, &summary).is_complete());
    }

    #[test]
    fn test_duplicate_citations_not_independent() {
        let gate = CompletenessGate::default_config();
        let mut summary = complete_summary();
        summary.headline_conclusions[0].evidence = vec![EvidenceId::new(1), EvidenceId::new(1)];

        assert!(!gate.check(Mode::Standard, &summary).is_complete());
    }

    #[test]
    fn test_both_identity_questions_required() {
        let gate = CompletenessGate::default_config();
        let mut summary = complete_summary();
        summary.cooperation_answered = false;

        let result = gate.check(Mode::Standard, &summary);
        assert!(result.reasons().contains(&IncompleteReason::IdentityQuestionUnanswered {
            question: "cooperation",
        }));
    }

    #[test]
    fn test_all_failures_reported_together() {
        let gate = CompletenessGate::default_config();
        let summary = EvidenceSummary::default();
        let result = gate.check(Mode::Standard, &summary);
        // 7 missing domains + sparse timeline + turning points + 2 identity
        assert_eq!(result.reasons().len(), 11);
    }
}
