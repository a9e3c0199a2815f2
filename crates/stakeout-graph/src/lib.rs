//! Stakeout Entity Graph
//!
//! Typed nodes (wallets, contracts, pairs, domains, handles) and typed edges
//! (funding, trading, linking, mentioning) built incrementally from the
//! evidence ledger. Known infrastructure addresses are tagged at upsert time
//! via a configurable denylist: they stay in the graph for funding-path
//! context but are never cluster members.

#![warn(missing_docs)]

mod denylist;
mod error;
mod graph;

pub use denylist::InfrastructureDenylist;
pub use error::GraphError;
pub use graph::EntityGraph;
