//! Stakeout Feature Extractor
//!
//! Computes per-wallet, per-pair, and per-cluster features from a ledger and
//! graph snapshot. Extraction is pure and deterministic: identical snapshots
//! always yield identical features, which is what makes scores reproducible
//! and calibration testable.
//!
//! Missing inputs surface as `None`/`0.0` and can only lower downstream
//! scores, never raise them.

#![warn(missing_docs)]

mod config;
mod holder;
mod insider;
mod pair;
mod wallet;

pub use config::FeatureConfig;
pub use holder::{holder_profiles, HolderProfile};
pub use insider::{insider_inputs, InsiderInputs};
pub use pair::{pair_features, FeatureValue, PairFeatures};
pub use wallet::{extract_wallet_features, FirstFunding, ProfitSink, TradePoint, WalletFeatures};
