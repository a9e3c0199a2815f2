//! Per-wallet feature extraction

use crate::FeatureConfig;
use stakeout_domain::{EntityId, EntityKind, EvidenceId, ObservationPayload, TradeSide};
use stakeout_graph::EntityGraph;
use stakeout_ledger::{EvidenceLedger, QueryFilter};
use std::collections::BTreeMap;

/// The first observed inbound transfer to a wallet
#[derive(Debug, Clone, PartialEq)]
pub struct FirstFunding {
    /// Sending address
    pub funder: String,
    /// Whether the funder is denylisted infrastructure (a CEX funding a
    /// wallet links it to nothing)
    pub funder_is_infrastructure: bool,
    /// The transfer observation
    pub eid: EvidenceId,
    /// Block timestamp of the transfer
    pub at: u64,
}

/// A wallet's first buy
#[derive(Debug, Clone, PartialEq)]
pub struct TradePoint {
    /// The trade observation
    pub eid: EvidenceId,
    /// Block timestamp
    pub at: u64,
    /// Traded amount
    pub amount: f64,
}

/// Recipient of the largest cumulative outbound value
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitSink {
    /// Receiving address
    pub recipient: String,
    /// Whether the recipient is denylisted infrastructure
    pub recipient_is_infrastructure: bool,
    /// Transfers that routed value there
    pub evidence: Vec<EvidenceId>,
    /// Cumulative outbound value
    pub total: f64,
}

/// Features of one wallet over the current snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct WalletFeatures {
    /// The wallet entity
    pub entity: EntityId,
    /// First observed inbound transfer
    pub first_funding: Option<FirstFunding>,
    /// First buy trade
    pub first_buy: Option<TradePoint>,
    /// Seconds between the reference announcement time and the first buy
    /// (negative means the wallet bought before the announcement)
    pub delta_t_first_buy: Option<i64>,
    /// Bucketed buy-timing histogram over the pattern window
    pub buy_window_pattern: Vec<u32>,
    /// Bucketed sell-timing histogram over the pattern window
    pub sell_window_pattern: Vec<u32>,
    /// First exit: earliest sell trade or outbound transfer after the first buy
    pub exit_at: Option<u64>,
    /// Observation backing the exit
    pub exit_eid: Option<EvidenceId>,
    /// Largest cumulative outbound recipient
    pub profit_sink: Option<ProfitSink>,
}

/// Extract features for one wallet from a ledger/graph snapshot
///
/// `reference_time` is the caller-supplied announcement time used for
/// `delta_t_first_buy` and as the pattern-window anchor. Pure: no interior
/// state, identical inputs yield identical outputs.
pub fn extract_wallet_features(
    ledger: &EvidenceLedger,
    graph: &EntityGraph,
    entity: EntityId,
    reference_time: Option<u64>,
    config: &FeatureConfig,
) -> WalletFeatures {
    let key = match graph.entity(entity) {
        Ok(e) => e.key.clone(),
        Err(_) => {
            return WalletFeatures {
                entity,
                first_funding: None,
                first_buy: None,
                delta_t_first_buy: None,
                buy_window_pattern: vec![0; config.pattern_buckets],
                sell_window_pattern: vec![0; config.pattern_buckets],
                exit_at: None,
                exit_eid: None,
                profit_sink: None,
            }
        }
    };

    let mut first_funding: Option<FirstFunding> = None;
    let mut first_buy: Option<TradePoint> = None;
    let mut buys: Vec<(u64, EvidenceId)> = Vec::new();
    let mut sells: Vec<(u64, EvidenceId)> = Vec::new();
    let mut outbound: Vec<(u64, String, f64, EvidenceId)> = Vec::new();

    for obs in ledger.query(&QueryFilter::entity(key.clone())) {
        match &obs.payload {
            ObservationPayload::Transfer {
                from, to, amount, at, ..
            } => {
                if to == &key {
                    let earlier = first_funding
                        .as_ref()
                        .map(|f| *at < f.at)
                        .unwrap_or(true);
                    if earlier {
                        first_funding = Some(FirstFunding {
                            funder: from.clone(),
                            funder_is_infrastructure: is_infrastructure(graph, from),
                            eid: obs.eid,
                            at: *at,
                        });
                    }
                }
                if from == &key {
                    outbound.push((*at, to.clone(), *amount, obs.eid));
                }
            }
            ObservationPayload::Trade {
                wallet,
                side,
                amount,
                at,
                ..
            } if wallet == &key => match side {
                TradeSide::Buy => {
                    buys.push((*at, obs.eid));
                    let earlier = first_buy.as_ref().map(|b| *at < b.at).unwrap_or(true);
                    if earlier {
                        first_buy = Some(TradePoint {
                            eid: obs.eid,
                            at: *at,
                            amount: *amount,
                        });
                    }
                }
                TradeSide::Sell => sells.push((*at, obs.eid)),
            },
            _ => {}
        }
    }

    let delta_t_first_buy = match (reference_time, &first_buy) {
        (Some(reference), Some(buy)) => Some(buy.at as i64 - reference as i64),
        _ => None,
    };

    // Pattern window anchors at the announcement when one exists, otherwise
    // at the wallet's first buy.
    let anchor = reference_time.or(first_buy.as_ref().map(|b| b.at));
    let buy_window_pattern = bucketize(&buys, anchor, config);
    let sell_window_pattern = bucketize(&sells, anchor, config);

    let (exit_at, exit_eid) = first_exit(&first_buy, &sells, &outbound);
    let profit_sink = largest_sink(graph, &outbound);

    WalletFeatures {
        entity,
        first_funding,
        first_buy,
        delta_t_first_buy,
        buy_window_pattern,
        sell_window_pattern,
        exit_at,
        exit_eid,
        profit_sink,
    }
}

fn is_infrastructure(graph: &EntityGraph, address: &str) -> bool {
    graph
        .find(EntityKind::Wallet, address)
        .and_then(|id| graph.entity(id).ok())
        .map(|e| e.infrastructure)
        .unwrap_or(false)
}

fn bucketize(events: &[(u64, EvidenceId)], anchor: Option<u64>, config: &FeatureConfig) -> Vec<u32> {
    let mut histogram = vec![0u32; config.pattern_buckets];
    let Some(anchor) = anchor else {
        return histogram;
    };
    let bucket_width = (config.pattern_window_secs / config.pattern_buckets as u64).max(1);
    for (at, _) in events {
        if *at < anchor {
            continue;
        }
        let offset = at - anchor;
        if offset >= config.pattern_window_secs {
            continue;
        }
        let idx = (offset / bucket_width) as usize;
        if idx < histogram.len() {
            histogram[idx] += 1;
        }
    }
    histogram
}

/// Earliest sell or outbound transfer after the first buy
fn first_exit(
    first_buy: &Option<TradePoint>,
    sells: &[(u64, EvidenceId)],
    outbound: &[(u64, String, f64, EvidenceId)],
) -> (Option<u64>, Option<EvidenceId>) {
    let floor = first_buy.as_ref().map(|b| b.at).unwrap_or(0);
    let best_sell = sells.iter().filter(|(at, _)| *at >= floor).min_by_key(|(at, _)| *at);
    let best_out = outbound
        .iter()
        .filter(|(at, _, _, _)| *at >= floor && floor > 0)
        .min_by_key(|(at, _, _, _)| *at);

    match (best_sell, best_out) {
        (Some((sat, seid)), Some((oat, _, _, oeid))) => {
            if sat <= oat {
                (Some(*sat), Some(*seid))
            } else {
                (Some(*oat), Some(*oeid))
            }
        }
        (Some((at, eid)), None) => (Some(*at), Some(*eid)),
        (None, Some((at, _, _, eid))) => (Some(*at), Some(*eid)),
        (None, None) => (None, None),
    }
}

fn largest_sink(
    graph: &EntityGraph,
    outbound: &[(u64, String, f64, EvidenceId)],
) -> Option<ProfitSink> {
    let mut totals: BTreeMap<&str, (f64, Vec<EvidenceId>)> = BTreeMap::new();
    for (_, to, amount, eid) in outbound {
        let entry = totals.entry(to.as_str()).or_insert((0.0, Vec::new()));
        entry.0 += amount;
        entry.1.push(*eid);
    }
    // Ties resolve to the lexicographically first recipient (BTreeMap order)
    // so extraction stays deterministic.
    let (recipient, (total, evidence)) = totals
        .into_iter()
        .max_by(|a, b| a.1 .0.partial_cmp(&b.1 .0).unwrap_or(std::cmp::Ordering::Equal))?;
    Some(ProfitSink {
        recipient: recipient.to_string(),
        recipient_is_infrastructure: is_infrastructure(graph, recipient),
        evidence,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeout_domain::{ObservationDraft, SourceTier};

    fn record_transfer(
        ledger: &mut EvidenceLedger,
        tx: &str,
        from: &str,
        to: &str,
        amount: f64,
        at: u64,
    ) -> EvidenceId {
        ledger
            .record(ObservationDraft {
                source_url: format!("https://rpc/tx/{}", tx),
                fetched_at: at + 1000,
                tier: SourceTier::P1,
                payload: ObservationPayload::Transfer {
                    tx_hash: tx.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                    asset: "0xtoken".to_string(),
                    amount,
                    at,
                },
            })
            .unwrap()
    }

    fn record_trade(
        ledger: &mut EvidenceLedger,
        tx: &str,
        wallet: &str,
        side: TradeSide,
        amount: f64,
        at: u64,
    ) -> EvidenceId {
        ledger
            .record(ObservationDraft {
                source_url: format!("https://rpc/tx/{}", tx),
                fetched_at: at + 1000,
                tier: SourceTier::P1,
                payload: ObservationPayload::Trade {
                    tx_hash: tx.to_string(),
                    wallet: wallet.to_string(),
                    pair: "0xpair".to_string(),
                    side,
                    amount,
                    at,
                },
            })
            .unwrap()
    }

    fn setup() -> (EvidenceLedger, EntityGraph, EntityId) {
        let mut graph = EntityGraph::new("bsc");
        let wallet = graph.upsert_entity(EntityKind::Wallet, "0xw1", 100);
        graph.upsert_entity(EntityKind::Wallet, "0xfunder", 50);
        (EvidenceLedger::new(), graph, wallet)
    }

    #[test]
    fn test_first_funding_picks_earliest_inbound() {
        let (mut ledger, graph, wallet) = setup();
        record_transfer(&mut ledger, "0x02", "0xlater", "0xw1", 5.0, 300);
        let eid = record_transfer(&mut ledger, "0x01", "0xfunder", "0xw1", 1.0, 200);

        let features =
            extract_wallet_features(&ledger, &graph, wallet, None, &FeatureConfig::default());
        let funding = features.first_funding.unwrap();
        assert_eq!(funding.funder, "0xfunder");
        assert_eq!(funding.eid, eid);
        assert_eq!(funding.at, 200);
    }

    #[test]
    fn test_delta_t_first_buy_negative_before_announcement() {
        let (mut ledger, graph, wallet) = setup();
        record_trade(&mut ledger, "0x03", "0xw1", TradeSide::Buy, 100.0, 900);

        let features = extract_wallet_features(
            &ledger,
            &graph,
            wallet,
            Some(1000),
            &FeatureConfig::default(),
        );
        assert_eq!(features.delta_t_first_buy, Some(-100));
    }

    #[test]
    fn test_buy_pattern_buckets_relative_to_reference() {
        let (mut ledger, graph, wallet) = setup();
        // 1h window, 12 buckets of 300s; buys at +10s, +20s, +400s
        record_trade(&mut ledger, "0x03", "0xw1", TradeSide::Buy, 10.0, 1010);
        record_trade(&mut ledger, "0x04", "0xw1", TradeSide::Buy, 10.0, 1020);
        record_trade(&mut ledger, "0x05", "0xw1", TradeSide::Buy, 10.0, 1400);
        // outside the window
        record_trade(&mut ledger, "0x06", "0xw1", TradeSide::Buy, 10.0, 9000);

        let features = extract_wallet_features(
            &ledger,
            &graph,
            wallet,
            Some(1000),
            &FeatureConfig::default(),
        );
        assert_eq!(features.buy_window_pattern[0], 2);
        assert_eq!(features.buy_window_pattern[1], 1);
        assert_eq!(features.buy_window_pattern.iter().sum::<u32>(), 3);
    }

    #[test]
    fn test_profit_sink_is_largest_cumulative_recipient() {
        let (mut ledger, graph, wallet) = setup();
        record_transfer(&mut ledger, "0x10", "0xw1", "0xsink1", 10.0, 500);
        record_transfer(&mut ledger, "0x11", "0xw1", "0xsink1", 15.0, 600);
        record_transfer(&mut ledger, "0x12", "0xw1", "0xsink2", 20.0, 700);

        let features =
            extract_wallet_features(&ledger, &graph, wallet, None, &FeatureConfig::default());
        let sink = features.profit_sink.unwrap();
        assert_eq!(sink.recipient, "0xsink1");
        assert_eq!(sink.total, 25.0);
        assert_eq!(sink.evidence.len(), 2);
    }

    #[test]
    fn test_exit_is_earliest_sell_after_first_buy() {
        let (mut ledger, graph, wallet) = setup();
        record_trade(&mut ledger, "0x03", "0xw1", TradeSide::Buy, 100.0, 1000);
        record_trade(&mut ledger, "0x04", "0xw1", TradeSide::Sell, 50.0, 2000);
        record_transfer(&mut ledger, "0x05", "0xw1", "0xsink", 50.0, 2500);

        let features =
            extract_wallet_features(&ledger, &graph, wallet, None, &FeatureConfig::default());
        assert_eq!(features.exit_at, Some(2000));
    }

    #[test]
    fn test_no_activity_yields_empty_features() {
        let (ledger, graph, wallet) = setup();
        let features =
            extract_wallet_features(&ledger, &graph, wallet, None, &FeatureConfig::default());
        assert!(features.first_funding.is_none());
        assert!(features.first_buy.is_none());
        assert!(features.profit_sink.is_none());
        assert_eq!(features.buy_window_pattern.iter().sum::<u32>(), 0);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let (mut ledger, graph, wallet) = setup();
        record_transfer(&mut ledger, "0x01", "0xfunder", "0xw1", 1.0, 200);
        record_trade(&mut ledger, "0x03", "0xw1", TradeSide::Buy, 100.0, 1000);

        let a = extract_wallet_features(&ledger, &graph, wallet, Some(900), &FeatureConfig::default());
        let b = extract_wallet_features(&ledger, &graph, wallet, Some(900), &FeatureConfig::default());
        assert_eq!(a, b);
    }
}
