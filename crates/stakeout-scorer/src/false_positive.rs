//! False-positive library for high-risk cluster review
//!
//! Coordinated-looking activity has benign twins: market-maker round trips,
//! exchange deposit consolidation, airdrop fan-outs. Before a high-risk
//! cluster is finalized it is checked against these patterns; a plausible
//! match demotes the verdict one tier and records the alternative
//! explanation on the cluster.

use serde::{Deserialize, Serialize};
use stakeout_domain::{AlternativeExplanation, Cluster, ClusterVerdict, SignalTier};
use stakeout_features::WalletFeatures;
use tracing::info;

/// Configurable pattern library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FalsePositiveLibrary {
    /// Check the market-maker / arbitrage round-trip pattern
    pub check_market_maker: bool,
    /// Check the exchange consolidation pattern
    pub check_exchange_consolidation: bool,
    /// Check the airdrop fan-out pattern
    pub check_airdrop_fanout: bool,
    /// Minimum buy+sell count per member for the round-trip pattern
    pub round_trip_min_trades: u32,
}

impl Default for FalsePositiveLibrary {
    fn default() -> Self {
        Self {
            check_market_maker: true,
            check_exchange_consolidation: true,
            check_airdrop_fanout: true,
            round_trip_min_trades: 10,
        }
    }
}

impl FalsePositiveLibrary {
    /// Review a cluster against the library
    ///
    /// Applied to suspected-or-stronger clusters. On the first matching
    /// pattern the verdict is demoted one tier and the explanation recorded;
    /// evidence is never discarded.
    pub fn review(&self, cluster: &mut Cluster, members: &[&WalletFeatures]) {
        if cluster.verdict < ClusterVerdict::Suspected {
            return;
        }

        let explanation = self
            .airdrop_fanout(cluster, members)
            .or_else(|| self.market_maker_round_trip(members))
            .or_else(|| self.exchange_consolidation(members));

        if let Some(explanation) = explanation {
            info!(
                cluster = %cluster.id,
                pattern = %explanation.pattern,
                "alternative explanation fits, demoting verdict"
            );
            cluster.verdict = cluster.verdict.demoted();
            cluster.alternative_explanations.push(explanation);
        }
    }

    /// Shared funder distributing to wallets that never traded: an airdrop,
    /// not a coordinated buy ring
    fn airdrop_fanout(
        &self,
        cluster: &Cluster,
        members: &[&WalletFeatures],
    ) -> Option<AlternativeExplanation> {
        if !self.check_airdrop_fanout || members.is_empty() {
            return None;
        }
        let has_shared_funder = cluster
            .signals
            .iter()
            .any(|s| s.name == "co_funder" && s.tier == SignalTier::Deterministic);
        let nobody_bought = members.iter().all(|m| m.first_buy.is_none());
        if has_shared_funder && nobody_bought {
            return Some(AlternativeExplanation {
                pattern: "airdrop_fanout".to_string(),
                rationale: format!(
                    "{} wallets share a distributor but none ever bought; consistent with an airdrop fan-out",
                    members.len()
                ),
            });
        }
        None
    }

    /// Every member trades heavily in both directions: market-making or
    /// arbitrage traffic, not accumulation
    fn market_maker_round_trip(
        &self,
        members: &[&WalletFeatures],
    ) -> Option<AlternativeExplanation> {
        if !self.check_market_maker || members.is_empty() {
            return None;
        }
        let all_round_trippers = members.iter().all(|m| {
            let buys: u32 = m.buy_window_pattern.iter().sum();
            let sells: u32 = m.sell_window_pattern.iter().sum();
            buys + sells >= self.round_trip_min_trades && buys.abs_diff(sells) <= 1
        });
        if all_round_trippers {
            return Some(AlternativeExplanation {
                pattern: "market_maker_round_trip".to_string(),
                rationale: "every member trades symmetrically at volume; consistent with market-making or arbitrage".to_string(),
            });
        }
        None
    }

    /// Most members route profits to exchange infrastructure: deposit
    /// consolidation, not a shared private sink
    fn exchange_consolidation(
        &self,
        members: &[&WalletFeatures],
    ) -> Option<AlternativeExplanation> {
        if !self.check_exchange_consolidation || members.is_empty() {
            return None;
        }
        let infra_sinks = members
            .iter()
            .filter(|m| {
                m.profit_sink
                    .as_ref()
                    .map(|s| s.recipient_is_infrastructure)
                    .unwrap_or(false)
            })
            .count();
        if infra_sinks * 2 >= members.len() && infra_sinks > 0 {
            return Some(AlternativeExplanation {
                pattern: "exchange_consolidation".to_string(),
                rationale: format!(
                    "{}/{} members route outbound value to exchange infrastructure",
                    infra_sinks,
                    members.len()
                ),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeout_domain::{ClusterId, EntityId, EvidenceId, Signal};
    use stakeout_features::{ProfitSink, TradePoint};
    use std::collections::BTreeSet;

    fn bare_member(entity: u64) -> WalletFeatures {
        WalletFeatures {
            entity: EntityId::new(entity),
            first_funding: None,
            first_buy: None,
            delta_t_first_buy: None,
            buy_window_pattern: vec![0; 12],
            sell_window_pattern: vec![0; 12],
            exit_at: None,
            exit_eid: None,
            profit_sink: None,
        }
    }

    fn high_cluster(with_funder_signal: bool) -> Cluster {
        let mut signals = vec![Signal {
            name: "co_time".to_string(),
            tier: SignalTier::Heuristic,
            strength: 0.9,
            evidence: vec![EvidenceId::new(1)],
        }];
        if with_funder_signal {
            signals.push(Signal {
                name: "co_funder".to_string(),
                tier: SignalTier::Deterministic,
                strength: 1.0,
                evidence: vec![EvidenceId::new(2)],
            });
        }
        Cluster {
            id: ClusterId::new(0),
            members: BTreeSet::from([EntityId::new(1), EntityId::new(2)]),
            relation_score: 0.8,
            insider_score: None,
            verdict: ClusterVerdict::HighConfidence,
            signals,
            alternative_explanations: Vec::new(),
        }
    }

    #[test]
    fn test_airdrop_fanout_demotes_one_tier() {
        let mut cluster = high_cluster(true);
        let m1 = bare_member(1);
        let m2 = bare_member(2);

        FalsePositiveLibrary::default().review(&mut cluster, &[&m1, &m2]);

        assert_eq!(cluster.verdict, ClusterVerdict::Suspected);
        assert_eq!(cluster.alternative_explanations.len(), 1);
        assert_eq!(cluster.alternative_explanations[0].pattern, "airdrop_fanout");
    }

    #[test]
    fn test_buyers_are_not_airdrop_fanout() {
        let mut cluster = high_cluster(true);
        let mut m1 = bare_member(1);
        m1.first_buy = Some(TradePoint {
            eid: EvidenceId::new(5),
            at: 1000,
            amount: 10.0,
        });
        let mut m2 = bare_member(2);
        m2.first_buy = Some(TradePoint {
            eid: EvidenceId::new(6),
            at: 1010,
            amount: 10.0,
        });

        FalsePositiveLibrary::default().review(&mut cluster, &[&m1, &m2]);

        assert_eq!(cluster.verdict, ClusterVerdict::HighConfidence);
        assert!(cluster.alternative_explanations.is_empty());
    }

    #[test]
    fn test_market_maker_round_trip_detected() {
        let mut cluster = high_cluster(false);
        let mut m1 = bare_member(1);
        m1.first_buy = Some(TradePoint {
            eid: EvidenceId::new(5),
            at: 1000,
            amount: 10.0,
        });
        m1.buy_window_pattern = vec![6; 12];
        m1.sell_window_pattern = vec![6; 12];
        let mut m2 = m1.clone();
        m2.entity = EntityId::new(2);

        FalsePositiveLibrary::default().review(&mut cluster, &[&m1, &m2]);

        assert_eq!(cluster.verdict, ClusterVerdict::Suspected);
        assert_eq!(
            cluster.alternative_explanations[0].pattern,
            "market_maker_round_trip"
        );
    }

    #[test]
    fn test_exchange_consolidation_detected() {
        let mut cluster = high_cluster(false);
        let mut m1 = bare_member(1);
        m1.first_buy = Some(TradePoint {
            eid: EvidenceId::new(5),
            at: 1000,
            amount: 10.0,
        });
        m1.profit_sink = Some(ProfitSink {
            recipient: "0xcex".to_string(),
            recipient_is_infrastructure: true,
            evidence: vec![EvidenceId::new(7)],
            total: 100.0,
        });
        let mut m2 = m1.clone();
        m2.entity = EntityId::new(2);

        FalsePositiveLibrary::default().review(&mut cluster, &[&m1, &m2]);

        assert_eq!(cluster.verdict, ClusterVerdict::Suspected);
        assert_eq!(
            cluster.alternative_explanations[0].pattern,
            "exchange_consolidation"
        );
    }

    #[test]
    fn test_weak_clusters_skip_review() {
        let mut cluster = high_cluster(true);
        cluster.verdict = ClusterVerdict::Weak;
        let m1 = bare_member(1);
        let m2 = bare_member(2);

        FalsePositiveLibrary::default().review(&mut cluster, &[&m1, &m2]);
        assert!(cluster.alternative_explanations.is_empty());
    }

    #[test]
    fn test_disabled_checks_do_nothing() {
        let mut cluster = high_cluster(true);
        let library = FalsePositiveLibrary {
            check_market_maker: false,
            check_exchange_consolidation: false,
            check_airdrop_fanout: false,
            round_trip_min_trades: 10,
        };
        let m1 = bare_member(1);
        let m2 = bare_member(2);

        library.review(&mut cluster, &[&m1, &m2]);
        assert_eq!(cluster.verdict, ClusterVerdict::HighConfidence);
    }
}
