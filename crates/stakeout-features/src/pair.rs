//! Pairwise wallet features

use crate::{FeatureConfig, WalletFeatures};
use stakeout_domain::{EntityId, EvidenceId};

/// A feature value with the observations that ground it
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureValue {
    /// Value in [0, 1]
    pub value: f64,
    /// Grounding observations (empty when the feature is absent)
    pub evidence: Vec<EvidenceId>,
}

impl FeatureValue {
    fn absent() -> Self {
        Self {
            value: 0.0,
            evidence: Vec::new(),
        }
    }

    fn grounded(value: f64, evidence: Vec<EvidenceId>) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            evidence,
        }
    }
}

/// Coordination features of one wallet pair
///
/// Symmetric by construction: swapping the two wallets' roles yields the
/// same values, which relation scoring relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFeatures {
    /// First member, lower entity id
    pub a: EntityId,
    /// Second member
    pub b: EntityId,
    /// Both wallets share a non-infrastructure first funder
    pub co_funder: FeatureValue,
    /// First buys close in time
    pub co_time: FeatureValue,
    /// First buys close in amount
    pub co_amount: FeatureValue,
    /// Exits close in time
    pub co_exit: FeatureValue,
    /// Profits route to the same non-infrastructure sink
    pub shared_sink: FeatureValue,
}

/// Compute pair features from two wallets' features
///
/// Missing inputs on either side produce 0.0 for the affected feature;
/// absence of evidence can only lower the relation score.
pub fn pair_features(
    left: &WalletFeatures,
    right: &WalletFeatures,
    config: &FeatureConfig,
) -> PairFeatures {
    // Normalize orientation so callers get identical output for (x, y) and
    // (y, x).
    let (x, y) = if left.entity <= right.entity {
        (left, right)
    } else {
        (right, left)
    };

    PairFeatures {
        a: x.entity,
        b: y.entity,
        co_funder: co_funder(x, y),
        co_time: co_time(x, y, config),
        co_amount: co_amount(x, y),
        co_exit: co_exit(x, y, config),
        shared_sink: shared_sink(x, y),
    }
}

fn co_funder(x: &WalletFeatures, y: &WalletFeatures) -> FeatureValue {
    match (&x.first_funding, &y.first_funding) {
        (Some(fx), Some(fy))
            if fx.funder == fy.funder && !fx.funder_is_infrastructure =>
        {
            FeatureValue::grounded(1.0, vec![fx.eid, fy.eid])
        }
        _ => FeatureValue::absent(),
    }
}

fn co_time(x: &WalletFeatures, y: &WalletFeatures, config: &FeatureConfig) -> FeatureValue {
    match (&x.first_buy, &y.first_buy) {
        (Some(bx), Some(by)) => {
            let delta = bx.at.abs_diff(by.at);
            if delta > config.co_time_window_secs {
                return FeatureValue::absent();
            }
            let value = 1.0 - delta as f64 / config.co_time_window_secs as f64;
            FeatureValue::grounded(value, vec![bx.eid, by.eid])
        }
        _ => FeatureValue::absent(),
    }
}

fn co_amount(x: &WalletFeatures, y: &WalletFeatures) -> FeatureValue {
    match (&x.first_buy, &y.first_buy) {
        (Some(bx), Some(by)) => {
            let max = bx.amount.max(by.amount);
            if max <= 0.0 {
                return FeatureValue::absent();
            }
            let value = 1.0 - (bx.amount - by.amount).abs() / max;
            FeatureValue::grounded(value, vec![bx.eid, by.eid])
        }
        _ => FeatureValue::absent(),
    }
}

fn co_exit(x: &WalletFeatures, y: &WalletFeatures, config: &FeatureConfig) -> FeatureValue {
    match (x.exit_at, y.exit_at) {
        (Some(ex), Some(ey)) => {
            let delta = ex.abs_diff(ey);
            if delta > config.co_exit_window_secs {
                return FeatureValue::absent();
            }
            let value = 1.0 - delta as f64 / config.co_exit_window_secs as f64;
            let evidence = [x.exit_eid, y.exit_eid].into_iter().flatten().collect();
            FeatureValue::grounded(value, evidence)
        }
        _ => FeatureValue::absent(),
    }
}

fn shared_sink(x: &WalletFeatures, y: &WalletFeatures) -> FeatureValue {
    match (&x.profit_sink, &y.profit_sink) {
        (Some(sx), Some(sy))
            if sx.recipient == sy.recipient && !sx.recipient_is_infrastructure =>
        {
            let evidence = sx
                .evidence
                .iter()
                .chain(sy.evidence.iter())
                .copied()
                .collect();
            FeatureValue::grounded(1.0, evidence)
        }
        _ => FeatureValue::absent(),
    }
}
