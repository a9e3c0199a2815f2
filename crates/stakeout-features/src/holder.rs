//! Holder profiles from snapshot observations

use stakeout_domain::{EvidenceId, ObservationPayload};
use stakeout_ledger::{EvidenceLedger, QueryFilter};

/// One holder's profile from the latest snapshot of a token
#[derive(Debug, Clone, PartialEq)]
pub struct HolderProfile {
    /// Holder address
    pub address: String,
    /// Token balance
    pub balance: f64,
    /// Share of supply, in percent
    pub balance_pct: f64,
    /// Outgoing transaction count
    pub tx_count: u32,
    /// Native-asset balance available for gas
    pub gas_balance: f64,
    /// Snapshot observation these values came from
    pub eid: EvidenceId,
}

/// Holder profiles from the most recent snapshot of `token`
///
/// Pure over the ledger snapshot: the latest `HolderSnapshot` observation
/// (by event time, ties broken by EID) wins; earlier snapshots are retained
/// in the ledger but not surfaced here.
pub fn holder_profiles(ledger: &EvidenceLedger, token: &str) -> Vec<HolderProfile> {
    let mut latest: Option<(u64, EvidenceId, &[stakeout_domain::HolderRecord])> = None;

    for obs in ledger.query(&QueryFilter::entity(token.to_string())) {
        if let ObservationPayload::HolderSnapshot {
            token: snap_token,
            holders,
            at,
        } = &obs.payload
        {
            if snap_token != token {
                continue;
            }
            let newer = latest
                .as_ref()
                .map(|(t, eid, _)| (*at, obs.eid) > (*t, *eid))
                .unwrap_or(true);
            if newer {
                latest = Some((*at, obs.eid, holders));
            }
        }
    }

    match latest {
        Some((_, eid, holders)) => holders
            .iter()
            .map(|h| HolderProfile {
                address: h.address.clone(),
                balance: h.balance,
                balance_pct: h.balance_pct,
                tx_count: h.tx_count,
                gas_balance: h.gas_balance,
                eid,
            })
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeout_domain::{HolderRecord, ObservationDraft, SourceTier};

    fn snapshot_draft(at: u64, fetched_at: u64, balances: &[(&str, f64)]) -> ObservationDraft {
        ObservationDraft {
            source_url: format!("https://explorer/holders/{}", at),
            fetched_at,
            tier: SourceTier::P1,
            payload: ObservationPayload::HolderSnapshot {
                token: "0xtoken".to_string(),
                holders: balances
                    .iter()
                    .map(|(addr, bal)| HolderRecord {
                        address: addr.to_string(),
                        balance: *bal,
                        balance_pct: bal / 1000.0,
                        tx_count: 1,
                        gas_balance: 0.01,
                    })
                    .collect(),
                at,
            },
        }
    }

    #[test]
    fn test_latest_snapshot_wins() {
        let mut ledger = EvidenceLedger::new();
        ledger
            .record(snapshot_draft(100, 1000, &[("0xaaa", 10.0)]))
            .unwrap();
        ledger
            .record(snapshot_draft(200, 1100, &[("0xaaa", 20.0), ("0xbbb", 5.0)]))
            .unwrap();

        let profiles = holder_profiles(&ledger, "0xtoken");
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].balance, 20.0);
    }

    #[test]
    fn test_no_snapshot_yields_empty() {
        let ledger = EvidenceLedger::new();
        assert!(holder_profiles(&ledger, "0xtoken").is_empty());
    }

    #[test]
    fn test_other_token_snapshots_ignored() {
        let mut ledger = EvidenceLedger::new();
        let mut draft = snapshot_draft(100, 1000, &[("0xaaa", 10.0)]);
        if let ObservationPayload::HolderSnapshot { token, .. } = &mut draft.payload {
            *token = "0xother".to_string();
        }
        ledger.record(draft).unwrap();

        assert!(holder_profiles(&ledger, "0xtoken").is_empty());
    }
}
