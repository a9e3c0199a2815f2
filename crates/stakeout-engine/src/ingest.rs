//! Single-consumer ingestion worker
//!
//! The acquisition layer may fetch from many endpoints in parallel, but the
//! core observes a total ingestion order: everything funnels through one
//! `tokio::mpsc` channel drained by a worker that owns the [`Investigation`].
//! Dropping all senders is the cancellation boundary - the worker returns the
//! run as-is, and partial state is a legitimate, inspectable result.

use crate::investigation::Investigation;
use stakeout_domain::{EvidenceDomain, FetchError, ObservationBatch};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One message from the acquisition layer
#[derive(Debug, Clone)]
pub enum IngestMessage {
    /// A batch of normalized observations
    Batch(ObservationBatch),
    /// A fetch failed; record the gap
    Gap {
        /// Source descriptor that failed
        source: String,
        /// Evidence domain the source would have covered
        domain: EvidenceDomain,
        /// The typed failure
        error: FetchError,
    },
}

/// Spawn the ingestion worker that owns an investigation
///
/// Returns the channel sender for the acquisition layer and a join handle
/// that yields the investigation back once every sender is dropped. The
/// worker is the only writer; no locking is needed.
pub fn spawn_ingest(
    mut investigation: Investigation,
    capacity: usize,
) -> (mpsc::Sender<IngestMessage>, JoinHandle<Investigation>) {
    let (tx, mut rx) = mpsc::channel::<IngestMessage>(capacity);

    let handle = tokio::spawn(async move {
        info!(run = %investigation.run_id(), "ingest worker started");
        let mut batches = 0usize;
        let mut gaps = 0usize;

        while let Some(message) = rx.recv().await {
            match message {
                IngestMessage::Batch(batch) => {
                    let outcome = investigation.ingest_batch(batch);
                    batches += 1;
                    debug!(
                        recorded = outcome.recorded,
                        duplicates = outcome.duplicates,
                        rejected = outcome.rejected,
                        "batch ingested"
                    );
                }
                IngestMessage::Gap {
                    source,
                    domain,
                    error,
                } => {
                    investigation.record_gap(source, domain, error);
                    gaps += 1;
                }
            }
        }

        info!(batches, gaps, "ingest worker draining complete");
        investigation
    });

    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigation::InvestigationConfig;
    use stakeout_domain::{ObservationDraft, ObservationPayload, SourceTier};

    fn transfer_batch(tx_hash: &str, at: u64) -> ObservationBatch {
        ObservationBatch {
            source: "rpc".to_string(),
            domain: EvidenceDomain::OnChainActivity,
            observations: vec![ObservationDraft {
                source_url: format!("https://rpc/tx/{}", tx_hash),
                fetched_at: at + 1000,
                tier: SourceTier::P1,
                payload: ObservationPayload::Transfer {
                    tx_hash: tx_hash.to_string(),
                    from: "0xw0".to_string(),
                    to: "0xw1".to_string(),
                    asset: "0xtoken".to_string(),
                    amount: 1.0,
                    at,
                },
            }],
        }
    }

    #[tokio::test]
    async fn test_worker_serializes_parallel_senders() {
        let run = Investigation::new(InvestigationConfig::default()).unwrap();
        let (tx, handle) = spawn_ingest(run, 16);

        let mut tasks = Vec::new();
        for i in 0..4u64 {
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                tx.send(IngestMessage::Batch(transfer_batch(
                    &format!("0x{:02}", i),
                    100 + i,
                )))
                .await
                .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        drop(tx);

        let run = handle.await.unwrap();
        assert_eq!(run.ledger().len(), 4);
        // EIDs stay dense and monotone regardless of sender interleaving.
        let eids: Vec<u64> = run.ledger().iter().map(|o| o.eid.value()).collect();
        assert_eq!(eids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_gap_messages_recorded() {
        let run = Investigation::new(InvestigationConfig::default()).unwrap();
        let (tx, handle) = spawn_ingest(run, 4);

        tx.send(IngestMessage::Gap {
            source: "https://social/api".to_string(),
            domain: EvidenceDomain::Social,
            error: FetchError::RateLimited,
        })
        .await
        .unwrap();
        drop(tx);

        let run = handle.await.unwrap();
        assert_eq!(run.gaps().len(), 1);
        assert!(run.confidence_ceiling() < 1.0);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_partial_state() {
        let run = Investigation::new(InvestigationConfig::default()).unwrap();
        let (tx, handle) = spawn_ingest(run, 4);

        tx.send(IngestMessage::Batch(transfer_batch("0x01", 100)))
            .await
            .unwrap();
        // Abort mid-run: already-recorded EIDs stay valid.
        drop(tx);

        let run = handle.await.unwrap();
        assert_eq!(run.ledger().len(), 1);
        assert!(run.ledger().get(stakeout_domain::EvidenceId::new(1)).is_ok());
    }
}
