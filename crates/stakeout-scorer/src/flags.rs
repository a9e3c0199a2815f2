//! Holder suspicion flags
//!
//! Auto-flags holder patterns that repeatedly show up around coordinated
//! launches: wallets holding supply they never transacted for, wallets that
//! cannot even afford the gas to sell, single-transaction accumulation.
//! Flags are additive; the total score maps to a monitoring level.

use serde::{Deserialize, Serialize};
use stakeout_domain::EvidenceId;
use stakeout_features::HolderProfile;

/// Severity of one suspicion flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspicionSeverity {
    /// Critical
    Critical,
    /// High
    High,
    /// Medium
    Medium,
    /// Low
    Low,
}

impl SuspicionSeverity {
    /// Get the severity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspicionSeverity::Critical => "critical",
            SuspicionSeverity::High => "high",
            SuspicionSeverity::Medium => "medium",
            SuspicionSeverity::Low => "low",
        }
    }
}

/// One suspicion flag on a holder
#[derive(Debug, Clone, PartialEq)]
pub struct SuspicionFlag {
    /// Flag kind, snake_case
    pub kind: &'static str,
    /// Human-readable description
    pub description: String,
    /// Severity class
    pub severity: SuspicionSeverity,
    /// Additive score contribution
    pub score: u32,
}

/// Monitoring recommendation derived from the total risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringLevel {
    /// Continuous monitoring, alert on any activity
    Critical,
    /// Daily monitoring, alert on deposits or first transaction
    High,
    /// Weekly monitoring, check balance changes
    Medium,
    /// Periodic monitoring sufficient
    Low,
}

impl MonitoringLevel {
    fn from_score(score: u32) -> Self {
        if score >= 70 {
            MonitoringLevel::Critical
        } else if score >= 50 {
            MonitoringLevel::High
        } else if score >= 30 {
            MonitoringLevel::Medium
        } else {
            MonitoringLevel::Low
        }
    }

    /// Get the level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoringLevel::Critical => "critical",
            MonitoringLevel::High => "high",
            MonitoringLevel::Medium => "medium",
            MonitoringLevel::Low => "low",
        }
    }
}

/// A holder with its flags and total risk score
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedHolder {
    /// Holder address
    pub address: String,
    /// Share of supply, percent
    pub balance_pct: f64,
    /// Outgoing transaction count
    pub tx_count: u32,
    /// Gas balance
    pub gas_balance: f64,
    /// Flags raised
    pub flags: Vec<SuspicionFlag>,
    /// Sum of flag scores
    pub risk_score: u32,
    /// Monitoring recommendation
    pub level: MonitoringLevel,
    /// Snapshot observation the profile came from
    pub eid: EvidenceId,
}

/// Thresholds for flag detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagConfig {
    /// Minimum holding percentage worth flagging
    pub min_suspicious_pct: f64,
    /// Gas balance below which a holder cannot realistically transact
    pub min_gas_balance: f64,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            min_suspicious_pct: 1.0,
            min_gas_balance: 0.005,
        }
    }
}

/// Detect suspicious holders, sorted by descending risk score
pub fn detect_suspicious_holders(
    profiles: &[HolderProfile],
    config: &FlagConfig,
) -> Vec<FlaggedHolder> {
    let mut flagged: Vec<FlaggedHolder> = profiles
        .iter()
        .filter_map(|profile| {
            let flags = analyze(profile, config);
            if flags.is_empty() {
                return None;
            }
            let risk_score = flags.iter().map(|f| f.score).sum();
            Some(FlaggedHolder {
                address: profile.address.clone(),
                balance_pct: profile.balance_pct,
                tx_count: profile.tx_count,
                gas_balance: profile.gas_balance,
                flags,
                risk_score,
                level: MonitoringLevel::from_score(risk_score),
                eid: profile.eid,
            })
        })
        .collect();

    flagged.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then_with(|| a.address.cmp(&b.address))
    });
    flagged
}

fn analyze(holder: &HolderProfile, config: &FlagConfig) -> Vec<SuspicionFlag> {
    let mut flags = Vec::new();

    if holder.tx_count == 0 && holder.balance_pct >= config.min_suspicious_pct {
        flags.push(SuspicionFlag {
            kind: "zero_tx_large_holding",
            description: format!(
                "Zero transactions but holds {:.2}% of supply",
                holder.balance_pct
            ),
            severity: SuspicionSeverity::Critical,
            score: 40,
        });
    }

    if holder.tx_count == 1 && holder.balance_pct >= config.min_suspicious_pct {
        flags.push(SuspicionFlag {
            kind: "single_tx_large_holding",
            description: format!(
                "Only 1 transaction but holds {:.2}% of supply",
                holder.balance_pct
            ),
            severity: SuspicionSeverity::High,
            score: 30,
        });
    }

    if holder.gas_balance < config.min_gas_balance {
        flags.push(SuspicionFlag {
            kind: "insufficient_gas",
            description: format!(
                "Only {:.6} gas balance (below the {} threshold)",
                holder.gas_balance, config.min_gas_balance
            ),
            severity: SuspicionSeverity::Medium,
            score: 20,
        });
    }

    if holder.balance_pct >= 1.5 && holder.tx_count > 0 && holder.tx_count < 5 {
        flags.push(SuspicionFlag {
            kind: "large_holding_low_activity",
            description: format!(
                "Holds {:.2}% but only {} transactions",
                holder.balance_pct, holder.tx_count
            ),
            severity: SuspicionSeverity::High,
            score: 25,
        });
    }

    if holder.tx_count == 0 && holder.balance_pct >= 0.5 {
        flags.push(SuspicionFlag {
            kind: "received_never_moved",
            description: "Received tokens via internal transfer, never initiated any transaction"
                .to_string(),
            severity: SuspicionSeverity::High,
            score: 30,
        });
    }

    if holder.gas_balance < 0.001 && holder.balance_pct >= 1.0 {
        flags.push(SuspicionFlag {
            kind: "locked_by_gas",
            description: format!(
                "Effectively locked: {:.6} gas cannot move {:.2}% of supply",
                holder.gas_balance, holder.balance_pct
            ),
            severity: SuspicionSeverity::Critical,
            score: 35,
        });
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(address: &str, balance_pct: f64, tx_count: u32, gas: f64) -> HolderProfile {
        HolderProfile {
            address: address.to_string(),
            balance: balance_pct * 10_000.0,
            balance_pct,
            tx_count,
            gas_balance: gas,
            eid: EvidenceId::new(1),
        }
    }

    #[test]
    fn test_zero_tx_large_holder_is_critical() {
        let flagged = detect_suspicious_holders(
            &[profile("0xh6", 1.22, 0, 0.001)],
            &FlagConfig::default(),
        );
        assert_eq!(flagged.len(), 1);
        let holder = &flagged[0];
        // zero_tx (40) + insufficient_gas (20) + received_never_moved (30)
        // + locked_by_gas (35)
        assert_eq!(holder.risk_score, 125);
        assert_eq!(holder.level, MonitoringLevel::Critical);
        assert!(holder.flags.iter().any(|f| f.kind == "zero_tx_large_holding"));
    }

    #[test]
    fn test_single_tx_holder_flagged() {
        let flagged = detect_suspicious_holders(
            &[profile("0xh3", 1.63, 1, 0.002)],
            &FlagConfig::default(),
        );
        let holder = &flagged[0];
        assert!(holder
            .flags
            .iter()
            .any(|f| f.kind == "single_tx_large_holding"));
        assert!(holder.flags.iter().any(|f| f.kind == "insufficient_gas"));
        assert!(holder
            .flags
            .iter()
            .any(|f| f.kind == "large_holding_low_activity"));
    }

    #[test]
    fn test_active_funded_holder_unflagged() {
        let flagged = detect_suspicious_holders(
            &[profile("0xok", 2.20, 245, 0.035)],
            &FlagConfig::default(),
        );
        assert!(flagged.is_empty());
    }

    #[test]
    fn test_sorted_by_descending_risk() {
        let flagged = detect_suspicious_holders(
            &[
                profile("0xmild", 1.1, 3, 0.02),
                profile("0xworst", 2.0, 0, 0.0005),
            ],
            &FlagConfig::default(),
        );
        assert_eq!(flagged[0].address, "0xworst");
        assert!(flagged[0].risk_score > flagged[1].risk_score);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let config = FlagConfig {
            min_suspicious_pct: 5.0,
            min_gas_balance: 0.005,
        };
        // 1.22% is below the raised threshold; only gas flags remain.
        let flagged = detect_suspicious_holders(&[profile("0xh6", 1.22, 0, 0.001)], &config);
        let holder = &flagged[0];
        assert!(!holder.flags.iter().any(|f| f.kind == "zero_tx_large_holding"));
        assert!(holder.flags.iter().any(|f| f.kind == "insufficient_gas"));
    }
}
