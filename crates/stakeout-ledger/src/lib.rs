//! Stakeout Evidence Ledger
//!
//! Append-only store of observations. Every recorded observation receives a
//! stable Evidence ID (EID) from a ledger-owned monotone counter; downstream
//! components cite EIDs and never copy observations.
//!
//! # Semantics
//!
//! - Recording an identical `(source_url, fetched_at, payload fingerprint)`
//!   triple is an idempotent no-op returning the existing EID: ledger size
//!   and the EID counter are unchanged.
//! - Malformed observations are rejected with [`LedgerError::Integrity`],
//!   logged, and the run continues.
//! - Queries are lazy, finite, restartable, and ordered by `fetched_at`
//!   ascending (ties broken by EID).

#![warn(missing_docs)]

use stakeout_domain::{EvidenceId, Observation, ObservationDraft, ObservationPayload};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No observation recorded under this EID
    #[error("Observation not found: {0}")]
    NotFound(EvidenceId),

    /// Observation shape failed integrity checks at ingestion
    #[error("Malformed observation rejected: {0}")]
    Integrity(String),
}

/// Filter for ledger queries
///
/// All set fields must match. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    /// Match observations referencing this entity key (address, domain, handle)
    pub entity_key: Option<String>,
    /// Match claim assertions about this claim key
    pub claim_key: Option<String>,
    /// Inclusive `fetched_at` range
    pub time_range: Option<(u64, u64)>,
}

impl QueryFilter {
    /// Filter by entity key
    pub fn entity(key: impl Into<String>) -> Self {
        Self {
            entity_key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Filter by claim key
    pub fn claim(key: impl Into<String>) -> Self {
        Self {
            claim_key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Restrict to an inclusive `fetched_at` range
    pub fn within(mut self, start: u64, end: u64) -> Self {
        self.time_range = Some((start, end));
        self
    }

    fn matches(&self, obs: &Observation) -> bool {
        if let Some((start, end)) = self.time_range {
            if obs.fetched_at < start || obs.fetched_at > end {
                return false;
            }
        }
        if let Some(key) = &self.entity_key {
            if !payload_references(&obs.payload, key) {
                return false;
            }
        }
        if let Some(key) = &self.claim_key {
            match &obs.payload {
                ObservationPayload::ClaimAssertion { claim_key, .. } if claim_key == key => {}
                _ => return false,
            }
        }
        true
    }
}

/// Whether a payload mentions the given entity key
fn payload_references(payload: &ObservationPayload, key: &str) -> bool {
    match payload {
        ObservationPayload::Transfer {
            from, to, asset, ..
        } => from == key || to == key || asset == key,
        ObservationPayload::Trade { wallet, pair, .. } => wallet == key || pair == key,
        ObservationPayload::HolderSnapshot { token, holders, .. } => {
            token == key || holders.iter().any(|h| h.address == key)
        }
        ObservationPayload::SocialPost {
            handle, mentioned, ..
        } => handle == key || mentioned.iter().any(|m| m == key),
        ObservationPayload::DomainRecord {
            domain, links_to, ..
        } => domain == key || links_to.iter().any(|l| l == key),
        ObservationPayload::ClaimAssertion { .. } => false,
    }
}

/// Append-only evidence store with a monotone EID counter
///
/// The counter is owned by the ledger instance (no ambient global state),
/// initialized at creation, and never reset mid-run.
pub struct EvidenceLedger {
    observations: Vec<Observation>,
    dedup: HashMap<(String, u64, u64), EvidenceId>,
    next_eid: u64,
}

impl EvidenceLedger {
    /// Create an empty ledger; EIDs start at 1
    pub fn new() -> Self {
        Self {
            observations: Vec::new(),
            dedup: HashMap::new(),
            next_eid: 1,
        }
    }

    /// Number of recorded observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the ledger holds no observations
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Record an observation and return its EID
    ///
    /// Idempotent for identical re-fetches: the existing EID is returned and
    /// neither ledger size nor the counter changes. Malformed observations
    /// are rejected with [`LedgerError::Integrity`].
    pub fn record(&mut self, draft: ObservationDraft) -> Result<EvidenceId, LedgerError> {
        if let Err(reason) = validate_draft(&draft) {
            warn!(source = %draft.source_url, %reason, "rejecting malformed observation");
            return Err(LedgerError::Integrity(reason));
        }

        let key = draft.dedup_key();
        if let Some(existing) = self.dedup.get(&key) {
            debug!(eid = %existing, "identical re-fetch, returning existing EID");
            return Ok(*existing);
        }

        let eid = EvidenceId::new(self.next_eid);
        self.next_eid += 1;
        self.dedup.insert(key, eid);
        self.observations.push(Observation {
            eid,
            source_url: draft.source_url,
            fetched_at: draft.fetched_at,
            tier: draft.tier,
            payload: draft.payload,
        });
        debug!(%eid, "observation recorded");
        Ok(eid)
    }

    /// Get an observation by EID
    pub fn get(&self, eid: EvidenceId) -> Result<&Observation, LedgerError> {
        let idx = eid.value().checked_sub(1).ok_or(LedgerError::NotFound(eid))? as usize;
        self.observations.get(idx).ok_or(LedgerError::NotFound(eid))
    }

    /// All observations in EID (ingestion) order
    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    /// Query observations matching a filter
    ///
    /// Lazy over the stored observations, ordered by `fetched_at` ascending
    /// with EID as tie-breaker. Calling again restarts the traversal.
    pub fn query<'a>(&'a self, filter: &QueryFilter) -> impl Iterator<Item = &'a Observation> {
        let mut matching: Vec<&Observation> = self
            .observations
            .iter()
            .filter(|obs| filter.matches(obs))
            .collect();
        matching.sort_by_key(|obs| (obs.fetched_at, obs.eid));
        matching.into_iter()
    }
}

impl Default for EvidenceLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape checks applied before an observation enters the ledger
fn validate_draft(draft: &ObservationDraft) -> Result<(), String> {
    if draft.source_url.is_empty() {
        return Err("source_url is empty".to_string());
    }
    if draft.fetched_at == 0 {
        return Err("fetched_at is zero".to_string());
    }
    match &draft.payload {
        ObservationPayload::Transfer {
            tx_hash,
            from,
            to,
            amount,
            ..
        } => {
            if tx_hash.is_empty() || from.is_empty() || to.is_empty() {
                return Err("transfer missing tx_hash/from/to".to_string());
            }
            if !amount.is_finite() || *amount < 0.0 {
                return Err(format!("transfer amount not a finite non-negative number: {}", amount));
            }
        }
        ObservationPayload::Trade {
            tx_hash,
            wallet,
            amount,
            ..
        } => {
            if tx_hash.is_empty() || wallet.is_empty() {
                return Err("trade missing tx_hash/wallet".to_string());
            }
            if !amount.is_finite() || *amount < 0.0 {
                return Err(format!("trade amount not a finite non-negative number: {}", amount));
            }
        }
        ObservationPayload::HolderSnapshot { token, holders, .. } => {
            if token.is_empty() {
                return Err("holder snapshot missing token".to_string());
            }
            if holders.is_empty() {
                return Err("holder snapshot has no holders".to_string());
            }
        }
        ObservationPayload::SocialPost { handle, .. } => {
            if handle.is_empty() {
                return Err("social post missing handle".to_string());
            }
        }
        ObservationPayload::DomainRecord { domain, .. } => {
            if domain.is_empty() {
                return Err("domain record missing domain".to_string());
            }
        }
        ObservationPayload::ClaimAssertion {
            claim_key,
            asserted,
            ..
        } => {
            if claim_key.is_empty() || asserted.is_empty() {
                return Err("claim assertion missing key or value".to_string());
            }
        }
    }
    Ok(())
}
