//! Stakeout Investigation Engine
//!
//! Owns the mutable state of one investigation run - ledger, graph, claim
//! resolver, derived scores - behind a single ingestion point, and exposes
//! the reporting surface: clusters, claim matrix, contradiction log,
//! timeline, and the completeness check.
//!
//! The engine performs no network I/O. Acquisition happens outside, possibly
//! in parallel; results funnel in through [`Investigation::ingest_batch`]
//! directly or through the single-consumer channel in [`ingest`]. Every
//! acquisition failure becomes a recorded gap that lowers the run's
//! confidence ceiling - never an abort.

#![warn(missing_docs)]

mod error;
mod ingest;
mod investigation;
mod replay;
mod report;
mod timeline;

pub use error::EngineError;
pub use ingest::{spawn_ingest, IngestMessage};
pub use investigation::{AcquisitionGap, IngestOutcome, Investigation, InvestigationConfig};
pub use replay::{read_jsonl, write_jsonl, HolderDto, ObservationDto, PayloadDto, ReplayEntry};
pub use report::{
    ClaimReport, ClusterReport, CompletenessReport, ContradictionReport, FlaggedHolderReport,
    GapReport, RunReport, SignalReport, TimelineEventReport,
};
pub use timeline::TimelineEvent;
