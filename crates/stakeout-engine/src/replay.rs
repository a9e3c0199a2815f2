//! Ordered replay log
//!
//! The full persisted state of a run is an ordered log of observations,
//! entity/edge upserts, and score updates, serialized as JSON lines.
//! Replaying the log reproduces identical state - same EIDs, same entity
//! ids, same clusters - which is what makes calibration and regression
//! testing deterministic. Upsert and score entries double as an audit trail;
//! on replay they are verified against what re-ingestion derives.
//!
//! Domain types stay serde-free; this module mirrors them with wire DTOs
//! and owns the conversions.

use crate::EngineError;
use serde::{Deserialize, Serialize};
use stakeout_domain::{
    EvidenceDomain, HolderRecord, Observation, ObservationDraft, ObservationPayload, SourceTier,
    TradeSide,
};
use std::io::{BufRead, Write};

/// One row of a holder snapshot, wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderDto {
    /// Holder address
    pub address: String,
    /// Token balance
    pub balance: f64,
    /// Share of supply, percent
    pub balance_pct: f64,
    /// Outgoing transaction count
    pub tx_count: u32,
    /// Gas balance
    pub gas_balance: f64,
}

/// Observation payload, wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadDto {
    /// Asset transfer
    Transfer {
        /// Transaction hash
        tx_hash: String,
        /// Sender
        from: String,
        /// Recipient
        to: String,
        /// Asset identifier
        asset: String,
        /// Amount
        amount: f64,
        /// Block timestamp
        at: u64,
    },
    /// Swap against a pair
    Trade {
        /// Transaction hash
        tx_hash: String,
        /// Trading wallet
        wallet: String,
        /// Pair address
        pair: String,
        /// "buy" or "sell"
        side: String,
        /// Amount
        amount: f64,
        /// Block timestamp
        at: u64,
    },
    /// Holder list snapshot
    HolderSnapshot {
        /// Token address
        token: String,
        /// Holder rows
        holders: Vec<HolderDto>,
        /// Snapshot timestamp
        at: u64,
    },
    /// Social post
    SocialPost {
        /// Posting handle
        handle: String,
        /// Mentioned entity keys
        mentioned: Vec<String>,
        /// Post text
        text: String,
        /// Post timestamp
        at: u64,
    },
    /// DNS/WHOIS record
    DomainRecord {
        /// Domain name
        domain: String,
        /// Registrant
        registrant: Option<String>,
        /// Linked entity keys
        links_to: Vec<String>,
        /// Record timestamp
        at: u64,
    },
    /// Claim assertion
    ClaimAssertion {
        /// Claim key
        claim_key: String,
        /// Asserted value
        asserted: String,
        /// Assertion timestamp
        at: u64,
    },
}

/// A recorded observation, wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationDto {
    /// Assigned EID
    pub eid: u64,
    /// Evidence domain the batch contributed to
    pub domain: String,
    /// Source URL
    pub source_url: String,
    /// Fetch timestamp
    pub fetched_at: u64,
    /// Source tier ("p0"/"p1"/"p2")
    pub tier: String,
    /// Payload
    pub payload: PayloadDto,
}

/// One entry of the ordered replay log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEntry {
    /// A recorded observation
    Observation(ObservationDto),
    /// An entity entered the graph
    EntityUpsert {
        /// Entity id
        id: u64,
        /// Entity kind
        kind: String,
        /// Entity key
        key: String,
        /// First-seen timestamp
        first_seen: u64,
    },
    /// An edge gained evidence
    EdgeUpsert {
        /// Source entity id
        from: u64,
        /// Target entity id
        to: u64,
        /// Edge kind
        kind: String,
        /// Evidence EID merged in
        eid: u64,
    },
    /// A derived score was (re)computed
    ScoreUpdate {
        /// Cluster id
        cluster: String,
        /// Member entity ids
        members: Vec<u64>,
        /// Relation score
        relation_score: f64,
        /// Insider score, if computed
        insider_score: Option<f64>,
        /// Verdict label
        verdict: String,
    },
}

impl PayloadDto {
    /// Build the wire form of a normalized payload
    pub fn from_payload(payload: &ObservationPayload) -> Self {
        payload_to_dto(payload)
    }

    /// Convert back to the normal form
    pub fn to_payload(&self) -> Result<ObservationPayload, EngineError> {
        payload_from_dto(self)
    }
}

impl ObservationDto {
    /// Build the wire form of a recorded observation
    pub fn from_observation(obs: &Observation, domain: EvidenceDomain) -> Self {
        Self {
            eid: obs.eid.value(),
            domain: domain.as_str().to_string(),
            source_url: obs.source_url.clone(),
            fetched_at: obs.fetched_at,
            tier: obs.tier.as_str().to_string(),
            payload: payload_to_dto(&obs.payload),
        }
    }

    /// Convert back to a draft plus its batch domain
    pub fn to_draft(&self) -> Result<(EvidenceDomain, ObservationDraft), EngineError> {
        let domain = EvidenceDomain::parse(&self.domain)
            .ok_or_else(|| EngineError::Replay(format!("unknown evidence domain: {}", self.domain)))?;
        let tier = SourceTier::parse(&self.tier)
            .ok_or_else(|| EngineError::Replay(format!("unknown source tier: {}", self.tier)))?;
        Ok((
            domain,
            ObservationDraft {
                source_url: self.source_url.clone(),
                fetched_at: self.fetched_at,
                tier,
                payload: payload_from_dto(&self.payload)?,
            },
        ))
    }
}

fn payload_to_dto(payload: &ObservationPayload) -> PayloadDto {
    match payload {
        ObservationPayload::Transfer {
            tx_hash,
            from,
            to,
            asset,
            amount,
            at,
        } => PayloadDto::Transfer {
            tx_hash: tx_hash.clone(),
            from: from.clone(),
            to: to.clone(),
            asset: asset.clone(),
            amount: *amount,
            at: *at,
        },
        ObservationPayload::Trade {
            tx_hash,
            wallet,
            pair,
            side,
            amount,
            at,
        } => PayloadDto::Trade {
            tx_hash: tx_hash.clone(),
            wallet: wallet.clone(),
            pair: pair.clone(),
            side: side.as_str().to_string(),
            amount: *amount,
            at: *at,
        },
        ObservationPayload::HolderSnapshot { token, holders, at } => PayloadDto::HolderSnapshot {
            token: token.clone(),
            holders: holders
                .iter()
                .map(|h| HolderDto {
                    address: h.address.clone(),
                    balance: h.balance,
                    balance_pct: h.balance_pct,
                    tx_count: h.tx_count,
                    gas_balance: h.gas_balance,
                })
                .collect(),
            at: *at,
        },
        ObservationPayload::SocialPost {
            handle,
            mentioned,
            text,
            at,
        } => PayloadDto::SocialPost {
            handle: handle.clone(),
            mentioned: mentioned.clone(),
            text: text.clone(),
            at: *at,
        },
        ObservationPayload::DomainRecord {
            domain,
            registrant,
            links_to,
            at,
        } => PayloadDto::DomainRecord {
            domain: domain.clone(),
            registrant: registrant.clone(),
            links_to: links_to.clone(),
            at: *at,
        },
        ObservationPayload::ClaimAssertion {
            claim_key,
            asserted,
            at,
        } => PayloadDto::ClaimAssertion {
            claim_key: claim_key.clone(),
            asserted: asserted.clone(),
            at: *at,
        },
    }
}

fn payload_from_dto(dto: &PayloadDto) -> Result<ObservationPayload, EngineError> {
    Ok(match dto {
        PayloadDto::Transfer {
            tx_hash,
            from,
            to,
            asset,
            amount,
            at,
        } => ObservationPayload::Transfer {
            tx_hash: tx_hash.clone(),
            from: from.clone(),
            to: to.clone(),
            asset: asset.clone(),
            amount: *amount,
            at: *at,
        },
        PayloadDto::Trade {
            tx_hash,
            wallet,
            pair,
            side,
            amount,
            at,
        } => ObservationPayload::Trade {
            tx_hash: tx_hash.clone(),
            wallet: wallet.clone(),
            pair: pair.clone(),
            side: match side.as_str() {
                "buy" => TradeSide::Buy,
                "sell" => TradeSide::Sell,
                other => {
                    return Err(EngineError::Replay(format!("unknown trade side: {}", other)))
                }
            },
            amount: *amount,
            at: *at,
        },
        PayloadDto::HolderSnapshot { token, holders, at } => ObservationPayload::HolderSnapshot {
            token: token.clone(),
            holders: holders
                .iter()
                .map(|h| HolderRecord {
                    address: h.address.clone(),
                    balance: h.balance,
                    balance_pct: h.balance_pct,
                    tx_count: h.tx_count,
                    gas_balance: h.gas_balance,
                })
                .collect(),
            at: *at,
        },
        PayloadDto::SocialPost {
            handle,
            mentioned,
            text,
            at,
        } => ObservationPayload::SocialPost {
            handle: handle.clone(),
            mentioned: mentioned.clone(),
            text: text.clone(),
            at: *at,
        },
        PayloadDto::DomainRecord {
            domain,
            registrant,
            links_to,
            at,
        } => ObservationPayload::DomainRecord {
            domain: domain.clone(),
            registrant: registrant.clone(),
            links_to: links_to.clone(),
            at: *at,
        },
        PayloadDto::ClaimAssertion {
            claim_key,
            asserted,
            at,
        } => ObservationPayload::ClaimAssertion {
            claim_key: claim_key.clone(),
            asserted: asserted.clone(),
            at: *at,
        },
    })
}

/// Write a replay log as JSON lines
pub fn write_jsonl<W: Write>(entries: &[ReplayEntry], writer: &mut W) -> Result<(), EngineError> {
    for entry in entries {
        let line = serde_json::to_string(entry)
            .map_err(|e| EngineError::Replay(format!("serialize: {}", e)))?;
        writeln!(writer, "{}", line).map_err(|e| EngineError::Replay(format!("write: {}", e)))?;
    }
    Ok(())
}

/// Read a replay log from JSON lines
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<ReplayEntry>, EngineError> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EngineError::Replay(format!("read line {}: {}", idx + 1, e)))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line)
            .map_err(|e| EngineError::Replay(format!("parse line {}: {}", idx + 1, e)))?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeout_domain::EvidenceId;

    fn sample_observation() -> Observation {
        Observation {
            eid: EvidenceId::new(7),
            source_url: "https://rpc/tx/0x01".to_string(),
            fetched_at: 1000,
            tier: SourceTier::P1,
            payload: ObservationPayload::Transfer {
                tx_hash: "0x01".to_string(),
                from: "0xa".to_string(),
                to: "0xb".to_string(),
                asset: "0xt".to_string(),
                amount: 5.0,
                at: 900,
            },
        }
    }

    #[test]
    fn test_observation_dto_round_trip() {
        let obs = sample_observation();
        let dto = ObservationDto::from_observation(&obs, EvidenceDomain::OnChainActivity);
        let (domain, draft) = dto.to_draft().unwrap();

        assert_eq!(domain, EvidenceDomain::OnChainActivity);
        assert_eq!(draft.source_url, obs.source_url);
        assert_eq!(draft.tier, obs.tier);
        assert_eq!(draft.payload, obs.payload);
    }

    #[test]
    fn test_jsonl_round_trip() {
        let entries = vec![
            ReplayEntry::Observation(ObservationDto::from_observation(
                &sample_observation(),
                EvidenceDomain::OnChainActivity,
            )),
            ReplayEntry::EntityUpsert {
                id: 1,
                kind: "wallet".to_string(),
                key: "0xa".to_string(),
                first_seen: 900,
            },
            ReplayEntry::ScoreUpdate {
                cluster: "C000".to_string(),
                members: vec![1, 2],
                relation_score: 0.8,
                insider_score: Some(0.7),
                verdict: "high_confidence_linked_cluster".to_string(),
            },
        ];

        let mut buffer = Vec::new();
        write_jsonl(&entries, &mut buffer).unwrap();
        let parsed = read_jsonl(buffer.as_slice()).unwrap();
        assert_eq!(parsed.len(), 3);
        match &parsed[0] {
            ReplayEntry::Observation(dto) => assert_eq!(dto.eid, 7),
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_bad_tier_rejected() {
        let mut dto =
            ObservationDto::from_observation(&sample_observation(), EvidenceDomain::OnChainActivity);
        dto.tier = "p9".to_string();
        assert!(matches!(dto.to_draft(), Err(EngineError::Replay(_))));
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let input = "{\"type\":\"entity_upsert\",\"id\":1,\"kind\":\"wallet\",\"key\":\"0xa\",\"first_seen\":1}\nnot json\n";
        let err = read_jsonl(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
