//! Observations and evidence identifiers - the raw material of an investigation

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable citation key for one recorded observation
///
/// EIDs are assigned monotonically by the owning evidence ledger and are the
/// only legal way for downstream components (graph, scorer, resolver, gate)
/// to cite evidence. They are never reused or reset mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EvidenceId(u64);

impl EvidenceId {
    /// Wrap a raw sequence value
    ///
    /// Assignment is the ledger's job; this constructor exists for the
    /// storage/replay layer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw sequence value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EID-{:06}", self.0)
    }
}

/// Source authority tier for an observation
///
/// - P0: official statement (project docs, verified account)
/// - P1: on-chain endorsement (contract state, signed message)
/// - P2: secondary listing (aggregators, unofficial trackers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTier {
    /// Official statement
    P0,
    /// On-chain endorsement
    P1,
    /// Secondary listing
    P2,
}

impl SourceTier {
    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::P0 => "p0",
            SourceTier::P1 => "p1",
            SourceTier::P2 => "p2",
        }
    }

    /// Parse a tier from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "p0" => Some(SourceTier::P0),
            "p1" => Some(SourceTier::P1),
            "p2" => Some(SourceTier::P2),
            _ => None,
        }
    }

    /// Numeric authority rank, higher means more authoritative
    pub fn authority(&self) -> u8 {
        match self {
            SourceTier::P0 => 2,
            SourceTier::P1 => 1,
            SourceTier::P2 => 0,
        }
    }

    /// Whether this tier outranks another
    pub fn outranks(&self, other: SourceTier) -> bool {
        self.authority() > other.authority()
    }
}

impl std::str::FromStr for SourceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid source tier: {}", s))
    }
}

/// Kind discriminant of a normalized observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    /// Token or native-asset transfer between two addresses
    Transfer,
    /// Swap against a trading pair
    Trade,
    /// Holder list snapshot for a token
    HolderSnapshot,
    /// Social media post mentioning entities
    SocialPost,
    /// DNS/WHOIS record for a domain
    DomainRecord,
    /// Assertion about a tracked claim
    ClaimAssertion,
}

impl ObservationKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Transfer => "transfer",
            ObservationKind::Trade => "trade",
            ObservationKind::HolderSnapshot => "holder_snapshot",
            ObservationKind::SocialPost => "social_post",
            ObservationKind::DomainRecord => "domain_record",
            ObservationKind::ClaimAssertion => "claim_assertion",
        }
    }
}

/// Direction of a trade relative to the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeSide {
    /// Wallet acquired the asset
    Buy,
    /// Wallet disposed of the asset
    Sell,
}

impl TradeSide {
    /// Get the side name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// One row of a holder snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct HolderRecord {
    /// Holder address
    pub address: String,
    /// Token balance
    pub balance: f64,
    /// Share of total supply, in percent
    pub balance_pct: f64,
    /// Outgoing transaction count of the address
    pub tx_count: u32,
    /// Native-asset balance available for gas
    pub gas_balance: f64,
}

/// Normalized payload of an observation
///
/// This is the normal form the acquisition layer must produce. The core never
/// sees provider-specific shapes; everything downstream (graph construction,
/// feature extraction, claim resolution) pattern-matches on these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationPayload {
    /// Asset moved from one address to another
    Transfer {
        /// Transaction hash
        tx_hash: String,
        /// Sending address
        from: String,
        /// Receiving address
        to: String,
        /// Asset identifier (token contract or native symbol)
        asset: String,
        /// Transferred amount
        amount: f64,
        /// Block timestamp
        at: u64,
    },
    /// Wallet swapped against a pair
    Trade {
        /// Transaction hash
        tx_hash: String,
        /// Trading wallet
        wallet: String,
        /// Pair address
        pair: String,
        /// Buy or sell
        side: TradeSide,
        /// Traded amount
        amount: f64,
        /// Block timestamp
        at: u64,
    },
    /// Holder list for a token at a point in time
    HolderSnapshot {
        /// Token contract address
        token: String,
        /// Holder rows
        holders: Vec<HolderRecord>,
        /// Snapshot timestamp
        at: u64,
    },
    /// Social post mentioning addresses, domains, or handles
    SocialPost {
        /// Posting handle
        handle: String,
        /// Entity keys mentioned in the post
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
        /// Registrant, if disclosed
        registrant: Option<String>,
        /// Entity keys the domain links to (wallets, handles)
        links_to: Vec<String>,
        /// Record timestamp
        at: u64,
    },
    /// Assertion about a tracked claim
    ClaimAssertion {
        /// Claim key the assertion is about
        claim_key: String,
        /// Asserted value; two observations with differing values for the
        /// same key are mutually exclusive
        asserted: String,
        /// Assertion timestamp
        at: u64,
    },
}

impl ObservationPayload {
    /// Kind discriminant of this payload
    pub fn kind(&self) -> ObservationKind {
        match self {
            ObservationPayload::Transfer { .. } => ObservationKind::Transfer,
            ObservationPayload::Trade { .. } => ObservationKind::Trade,
            ObservationPayload::HolderSnapshot { .. } => ObservationKind::HolderSnapshot,
            ObservationPayload::SocialPost { .. } => ObservationKind::SocialPost,
            ObservationPayload::DomainRecord { .. } => ObservationKind::DomainRecord,
            ObservationPayload::ClaimAssertion { .. } => ObservationKind::ClaimAssertion,
        }
    }

    /// Timestamp at which the observed event occurred
    pub fn occurred_at(&self) -> u64 {
        match self {
            ObservationPayload::Transfer { at, .. }
            | ObservationPayload::Trade { at, .. }
            | ObservationPayload::HolderSnapshot { at, .. }
            | ObservationPayload::SocialPost { at, .. }
            | ObservationPayload::DomainRecord { at, .. }
            | ObservationPayload::ClaimAssertion { at, .. } => *at,
        }
    }

    /// Deterministic fingerprint used for duplicate detection
    ///
    /// Stable within a process run; floats are hashed via their bit pattern
    /// so that byte-identical payloads always collide.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_canonical(&mut hasher);
        hasher.finish()
    }

    fn hash_canonical(&self, hasher: &mut DefaultHasher) {
        self.kind().as_str().hash(hasher);
        match self {
            ObservationPayload::Transfer {
                tx_hash,
                from,
                to,
                asset,
                amount,
                at,
            } => {
                tx_hash.hash(hasher);
                from.hash(hasher);
                to.hash(hasher);
                asset.hash(hasher);
                amount.to_bits().hash(hasher);
                at.hash(hasher);
            }
            ObservationPayload::Trade {
                tx_hash,
                wallet,
                pair,
                side,
                amount,
                at,
            } => {
                tx_hash.hash(hasher);
                wallet.hash(hasher);
                pair.hash(hasher);
                side.as_str().hash(hasher);
                amount.to_bits().hash(hasher);
                at.hash(hasher);
            }
            ObservationPayload::HolderSnapshot { token, holders, at } => {
                token.hash(hasher);
                for h in holders {
                    h.address.hash(hasher);
                    h.balance.to_bits().hash(hasher);
                    h.balance_pct.to_bits().hash(hasher);
                    h.tx_count.hash(hasher);
                    h.gas_balance.to_bits().hash(hasher);
                }
                at.hash(hasher);
            }
            ObservationPayload::SocialPost {
                handle,
                mentioned,
                text,
                at,
            } => {
                handle.hash(hasher);
                mentioned.hash(hasher);
                text.hash(hasher);
                at.hash(hasher);
            }
            ObservationPayload::DomainRecord {
                domain,
                registrant,
                links_to,
                at,
            } => {
                domain.hash(hasher);
                registrant.hash(hasher);
                links_to.hash(hasher);
                at.hash(hasher);
            }
            ObservationPayload::ClaimAssertion {
                claim_key,
                asserted,
                at,
            } => {
                claim_key.hash(hasher);
                asserted.hash(hasher);
                at.hash(hasher);
            }
        }
    }
}

/// An observation as submitted by the acquisition layer, before an EID exists
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationDraft {
    /// URL (or URI) the observation was fetched from
    pub source_url: String,
    /// When the acquisition layer fetched it
    pub fetched_at: u64,
    /// Authority tier of the source
    pub tier: SourceTier,
    /// Normalized payload
    pub payload: ObservationPayload,
}

impl ObservationDraft {
    /// Duplicate-detection key: `(source_url, fetched_at, payload fingerprint)`
    pub fn dedup_key(&self) -> (String, u64, u64) {
        (
            self.source_url.clone(),
            self.fetched_at,
            self.payload.fingerprint(),
        )
    }
}

/// A recorded observation
///
/// Immutable once recorded; the EID is the citation key for everything
/// derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Stable evidence identifier
    pub eid: EvidenceId,
    /// URL (or URI) the observation was fetched from
    pub source_url: String,
    /// When the acquisition layer fetched it
    pub fetched_at: u64,
    /// Authority tier of the source
    pub tier: SourceTier,
    /// Normalized payload
    pub payload: ObservationPayload,
}

impl Observation {
    /// Kind discriminant of the payload
    pub fn kind(&self) -> ObservationKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(tx: &str, amount: f64) -> ObservationPayload {
        ObservationPayload::Transfer {
            tx_hash: tx.to_string(),
            from: "0xaaa".to_string(),
            to: "0xbbb".to_string(),
            asset: "0xtoken".to_string(),
            amount,
            at: 1_700_000_000,
        }
    }

    #[test]
    fn test_tier_authority_ordering() {
        assert!(SourceTier::P0.outranks(SourceTier::P1));
        assert!(SourceTier::P1.outranks(SourceTier::P2));
        assert!(!SourceTier::P2.outranks(SourceTier::P2));
    }

    #[test]
    fn test_tier_parse_roundtrip() {
        for tier in [SourceTier::P0, SourceTier::P1, SourceTier::P2] {
            assert_eq!(SourceTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(SourceTier::parse("p3"), None);
    }

    #[test]
    fn test_fingerprint_identical_payloads_collide() {
        assert_eq!(
            transfer("0x01", 10.0).fingerprint(),
            transfer("0x01", 10.0).fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_differs_on_amount() {
        assert_ne!(
            transfer("0x01", 10.0).fingerprint(),
            transfer("0x01", 10.5).fingerprint()
        );
    }

    #[test]
    fn test_evidence_id_display() {
        assert_eq!(EvidenceId::new(42).to_string(), "EID-000042");
    }

    #[test]
    fn test_dedup_key_ignores_tier() {
        // A re-fetch that reports a different tier for the same bytes is
        // still the same observation.
        let a = ObservationDraft {
            source_url: "https://example.org/tx".to_string(),
            fetched_at: 100,
            tier: SourceTier::P2,
            payload: transfer("0x01", 1.0),
        };
        let mut b = a.clone();
        b.tier = SourceTier::P0;
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
