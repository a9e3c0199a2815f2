//! Connected-component clustering over scored wallet pairs

use crate::score::{classify_relation, relation_score};
use crate::ScoringConfig;
use crate::ScorerError;
use stakeout_domain::{
    Cluster, ClusterId, ClusterVerdict, EntityId, Signal, SignalTier,
};
use stakeout_features::{FeatureValue, PairFeatures};
use stakeout_graph::EntityGraph;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A wallet pair with its computed relation score
#[derive(Debug, Clone)]
pub struct PairScore {
    /// The pair's features
    pub features: PairFeatures,
    /// Relation score in [0, 1]
    pub score: f64,
}

/// Score every candidate pair
pub fn score_pairs(
    pairs: &[PairFeatures],
    config: &ScoringConfig,
) -> Result<Vec<PairScore>, ScorerError> {
    pairs
        .iter()
        .map(|features| {
            Ok(PairScore {
                features: features.clone(),
                score: relation_score(features, &config.relation_weights)?,
            })
        })
        .collect()
}

/// Signals a pair contributes, partitioned by evidential tier
///
/// Shared-funder and shared-sink facts trace to specific transactions or a
/// shared final destination, so they are deterministic; timing and amount
/// co-occurrence is heuristic.
fn pair_signals(features: &PairFeatures, floor: f64) -> Vec<Signal> {
    let mut signals = Vec::new();
    let mut push = |name: &str, tier: SignalTier, fv: &FeatureValue| {
        if fv.value >= floor && !fv.evidence.is_empty() {
            signals.push(Signal {
                name: name.to_string(),
                tier,
                strength: fv.value,
                evidence: fv.evidence.clone(),
            });
        }
    };

    push("co_funder", SignalTier::Deterministic, &features.co_funder);
    push("shared_sink", SignalTier::Deterministic, &features.shared_sink);
    push("co_time", SignalTier::Heuristic, &features.co_time);
    push("co_amount", SignalTier::Heuristic, &features.co_amount);
    push("co_exit", SignalTier::Heuristic, &features.co_exit);
    signals
}

/// Group wallets into clusters by connected components
///
/// Components run over pairs scoring at or above the suspected threshold;
/// infrastructure entities never participate. Within a run, components
/// partition the wallets: no wallet lands in two clusters. Cluster ids are
/// assigned in discovery order (ascending smallest member id), so replays
/// reproduce identical ids.
///
/// The tiering rule is enforced here: a component classifying as
/// high-confidence is capped at suspected unless it carries at least one
/// deterministic and two heuristic signals.
pub fn build_clusters(
    graph: &EntityGraph,
    pair_scores: &[PairScore],
    config: &ScoringConfig,
) -> Vec<Cluster> {
    let clusterable: BTreeSet<EntityId> = graph.clusterable_wallets().into_iter().collect();

    let mut adjacency: BTreeMap<EntityId, Vec<usize>> = BTreeMap::new();
    for (idx, pair) in pair_scores.iter().enumerate() {
        if pair.score < config.thresholds.relation_suspected {
            continue;
        }
        let (a, b) = (pair.features.a, pair.features.b);
        if !clusterable.contains(&a) || !clusterable.contains(&b) {
            continue;
        }
        adjacency.entry(a).or_default().push(idx);
        adjacency.entry(b).or_default().push(idx);
    }

    let mut visited: BTreeSet<EntityId> = BTreeSet::new();
    let mut clusters = Vec::new();

    for &start in adjacency.keys() {
        if visited.contains(&start) {
            continue;
        }

        // BFS over the suspected-or-stronger subgraph
        let mut members = BTreeSet::new();
        let mut component_pairs: BTreeSet<usize> = BTreeSet::new();
        let mut queue = vec![start];
        while let Some(node) = queue.pop() {
            if !visited.insert(node) {
                continue;
            }
            members.insert(node);
            if let Some(edges) = adjacency.get(&node) {
                for &idx in edges {
                    component_pairs.insert(idx);
                    let pair = &pair_scores[idx];
                    for next in [pair.features.a, pair.features.b] {
                        if !visited.contains(&next) {
                            queue.push(next);
                        }
                    }
                }
            }
        }

        if members.len() < 2 {
            continue;
        }

        let mean_score = component_pairs
            .iter()
            .map(|&idx| pair_scores[idx].score)
            .sum::<f64>()
            / component_pairs.len() as f64;

        let signals = merge_signals(
            component_pairs
                .iter()
                .flat_map(|&idx| pair_signals(&pair_scores[idx].features, config.signal_floor)),
        );

        let mut verdict = classify_relation(mean_score, &config.thresholds);
        let deterministic = signals
            .iter()
            .filter(|s| s.tier == SignalTier::Deterministic)
            .count();
        let heuristic = signals.iter().filter(|s| s.tier == SignalTier::Heuristic).count();
        if verdict == ClusterVerdict::HighConfidence && (deterministic < 1 || heuristic < 2) {
            debug!(
                deterministic,
                heuristic, "capping verdict at suspected: tiering requirement unmet"
            );
            verdict = ClusterVerdict::Suspected;
        }

        let id = ClusterId::new(clusters.len() as u32);
        debug!(cluster = %id, members = members.len(), score = mean_score, "component found");
        clusters.push(Cluster {
            id,
            members,
            relation_score: mean_score,
            insider_score: None,
            verdict,
            signals,
            alternative_explanations: Vec::new(),
        });
    }

    clusters
}

/// Merge per-pair signals into per-cluster signals by name
///
/// Strength is the maximum observed; evidence sets union.
fn merge_signals(signals: impl Iterator<Item = Signal>) -> Vec<Signal> {
    let mut merged: BTreeMap<String, Signal> = BTreeMap::new();
    for signal in signals {
        match merged.get_mut(&signal.name) {
            Some(existing) => {
                existing.strength = existing.strength.max(signal.strength);
                for eid in signal.evidence {
                    if !existing.evidence.contains(&eid) {
                        existing.evidence.push(eid);
                    }
                }
            }
            None => {
                merged.insert(signal.name.clone(), signal);
            }
        }
    }
    let mut out: Vec<Signal> = merged.into_values().collect();
    for signal in &mut out {
        signal.evidence.sort();
    }
    out
}
