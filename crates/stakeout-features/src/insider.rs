//! Cluster-level insider scoring inputs

use crate::{FeatureConfig, WalletFeatures};
use stakeout_domain::EvidenceId;
use std::collections::BTreeMap;

/// Inputs to the insider score for one candidate cluster
///
/// Each value is in [0, 1]; missing member data contributes 0 to the
/// relevant fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct InsiderInputs {
    /// Fraction of members that first-bought before the announcement
    pub pre_pump_accumulation: f64,
    /// Fraction of members that first-bought within the early window of launch
    pub early_cluster_share: f64,
    /// Fraction of members exiting within the exit window of the earliest exit
    pub synchronized_exit: f64,
    /// Fraction of members sharing the modal first funder
    pub shared_funder: f64,
    /// Fraction of members routing profits to the modal sink
    pub shared_sink: f64,
    /// Observations grounding the above
    pub evidence: Vec<EvidenceId>,
}

/// Compute insider inputs over a cluster's member features
///
/// `reference_time` is the announcement time; `launch_time` the token's first
/// observed trade. Either being unknown zeroes the dependent fractions.
pub fn insider_inputs(
    members: &[&WalletFeatures],
    reference_time: Option<u64>,
    launch_time: Option<u64>,
    config: &FeatureConfig,
) -> InsiderInputs {
    let n = members.len();
    if n == 0 {
        return InsiderInputs {
            pre_pump_accumulation: 0.0,
            early_cluster_share: 0.0,
            synchronized_exit: 0.0,
            shared_funder: 0.0,
            shared_sink: 0.0,
            evidence: Vec::new(),
        };
    }

    let mut evidence = Vec::new();

    let pre_pump = match reference_time {
        Some(reference) => {
            let early: Vec<_> = members
                .iter()
                .filter_map(|m| m.first_buy.as_ref())
                .filter(|b| b.at < reference)
                .collect();
            evidence.extend(early.iter().map(|b| b.eid));
            early.len() as f64 / n as f64
        }
        None => 0.0,
    };

    let early_share = match launch_time {
        Some(launch) => {
            let cutoff = launch.saturating_add(config.early_window_secs);
            let early: Vec<_> = members
                .iter()
                .filter_map(|m| m.first_buy.as_ref())
                .filter(|b| b.at <= cutoff)
                .collect();
            evidence.extend(early.iter().map(|b| b.eid));
            early.len() as f64 / n as f64
        }
        None => 0.0,
    };

    let exits: Vec<(u64, Option<EvidenceId>)> = members
        .iter()
        .filter_map(|m| m.exit_at.map(|at| (at, m.exit_eid)))
        .collect();
    let synchronized = match exits.iter().map(|(at, _)| *at).min() {
        Some(first) => {
            let cutoff = first.saturating_add(config.co_exit_window_secs);
            let synced: Vec<_> = exits.iter().filter(|(at, _)| *at <= cutoff).collect();
            evidence.extend(synced.iter().filter_map(|(_, eid)| *eid));
            synced.len() as f64 / n as f64
        }
        None => 0.0,
    };

    let shared_funder = modal_fraction(
        members
            .iter()
            .filter_map(|m| m.first_funding.as_ref())
            .filter(|f| !f.funder_is_infrastructure)
            .map(|f| (f.funder.as_str(), f.eid)),
        n,
        &mut evidence,
    );

    let shared_sink = modal_fraction(
        members
            .iter()
            .filter_map(|m| m.profit_sink.as_ref())
            .filter(|s| !s.recipient_is_infrastructure)
            .map(|s| (s.recipient.as_str(), *s.evidence.first().unwrap_or(&EvidenceId::new(0)))),
        n,
        &mut evidence,
    );

    evidence.sort();
    evidence.dedup();
    evidence.retain(|e| e.value() != 0);

    InsiderInputs {
        pre_pump_accumulation: pre_pump,
        early_cluster_share: early_share,
        synchronized_exit: synchronized,
        shared_funder,
        shared_sink,
        evidence,
    }
}

/// Fraction of the member count belonging to the most common key
fn modal_fraction<'a>(
    items: impl Iterator<Item = (&'a str, EvidenceId)>,
    total: usize,
    evidence: &mut Vec<EvidenceId>,
) -> f64 {
    let mut groups: BTreeMap<&str, Vec<EvidenceId>> = BTreeMap::new();
    for (key, eid) in items {
        groups.entry(key).or_default().push(eid);
    }
    match groups.into_values().max_by_key(|eids| eids.len()) {
        Some(modal) => {
            let fraction = modal.len() as f64 / total as f64;
            evidence.extend(modal);
            fraction
        }
        None => 0.0,
    }
}
