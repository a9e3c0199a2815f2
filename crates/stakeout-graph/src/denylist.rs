//! Infrastructure denylist configuration
//!
//! Exchange hot wallets, routers, burn addresses, launchpad lockers, and LP
//! addresses must not be treated as cluster members; clustering two wallets
//! because both touched a router proves nothing. The denylist is an
//! externally loaded configuration struct so calibration can swap it without
//! code changes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-chain infrastructure address lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainDenylist {
    /// Exchange hot wallets
    #[serde(default)]
    pub cex_hot_wallets: Vec<String>,
    /// DEX routers
    #[serde(default)]
    pub routers: Vec<String>,
    /// Burn / dead addresses
    #[serde(default)]
    pub dead: Vec<String>,
    /// Launchpad lockers
    #[serde(default)]
    pub launchpads: Vec<String>,
    /// Liquidity pool addresses
    #[serde(default)]
    pub lp_pairs: Vec<String>,
}

/// Denylist of known infrastructure entities, keyed by chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfrastructureDenylist {
    /// Chain name -> address lists
    #[serde(default)]
    pub chains: std::collections::BTreeMap<String, ChainDenylist>,
}

impl InfrastructureDenylist {
    /// Load a denylist from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse denylist TOML: {}", e))
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize denylist: {}", e))
    }

    /// Flatten to a lowercase address set for one chain
    pub fn addresses_for(&self, chain: &str) -> HashSet<String> {
        let mut known = HashSet::new();
        if let Some(lists) = self.chains.get(&chain.to_lowercase()) {
            for addr in lists
                .cex_hot_wallets
                .iter()
                .chain(&lists.routers)
                .chain(&lists.dead)
                .chain(&lists.launchpads)
                .chain(&lists.lp_pairs)
            {
                known.insert(addr.to_lowercase());
            }
        }
        known
    }

    /// Whether an address is known infrastructure on a chain
    pub fn contains(&self, chain: &str, address: &str) -> bool {
        let needle = address.to_lowercase();
        self.chains
            .get(&chain.to_lowercase())
            .map(|lists| {
                lists
                    .cex_hot_wallets
                    .iter()
                    .chain(&lists.routers)
                    .chain(&lists.dead)
                    .chain(&lists.launchpads)
                    .chain(&lists.lp_pairs)
                    .any(|a| a.to_lowercase() == needle)
            })
            .unwrap_or(false)
    }

    /// Built-in lists for the chains the engine ships support for
    pub fn builtin() -> Self {
        let mut chains = std::collections::BTreeMap::new();
        chains.insert(
            "bsc".to_string(),
            ChainDenylist {
                cex_hot_wallets: vec![
                    "0xeb2d2f1b8c558a40207669291fda468e50c8a0bb".to_string(),
                    "0x28c6c06298d514db089934071355e5743bf21d60".to_string(),
                    "0x21a31ee1afc51d94c2efccaa2092ad1028285549".to_string(),
                    "0xdfd5293d8e347dfe59e90efd55b2956a1343963d".to_string(),
                ],
                routers: vec![
                    "0x10ed43c718714eb63d5aa57b78b54704e256024e".to_string(),
                    "0x13f4ea83d0bd40e75c8222255bc855a974568dd4".to_string(),
                ],
                dead: vec![
                    "0x000000000000000000000000000000000000dead".to_string(),
                    "0x0000000000000000000000000000000000000000".to_string(),
                ],
                launchpads: vec![
                    "0x407993575c91ce7643a4d4ccacc9a98c36ee1bbe".to_string(),
                    "0x7ee058420e5937496f5a2096f04caa7721cf70cc".to_string(),
                ],
                lp_pairs: Vec::new(),
            },
        );
        chains.insert(
            "eth".to_string(),
            ChainDenylist {
                cex_hot_wallets: vec![
                    "0x28c6c06298d514db089934071355e5743bf21d60".to_string(),
                    "0x3f5ce5fbfe3e9af3971dd833d26ba9b5c936f0be".to_string(),
                ],
                routers: vec![
                    "0x7a250d5630b4cf539739df2c5dacb4c659f2488d".to_string(),
                    "0xe592427a0aece92de3edee1f18e0157c05861564".to_string(),
                ],
                dead: vec![
                    "0x000000000000000000000000000000000000dead".to_string(),
                    "0x0000000000000000000000000000000000000000".to_string(),
                ],
                launchpads: Vec::new(),
                lp_pairs: Vec::new(),
            },
        );
        chains.insert(
            "base".to_string(),
            ChainDenylist {
                cex_hot_wallets: vec!["0x3304e22ddaa22bcdc5fca2269b418046ae7b566a".to_string()],
                routers: vec![
                    "0x4752ba5dbc23f44d87826276bf6fd6b1c372ad24".to_string(),
                    "0x327df1e6de05895d2ab08513aadd9313fe505d86".to_string(),
                ],
                dead: vec![
                    "0x000000000000000000000000000000000000dead".to_string(),
                    "0x0000000000000000000000000000000000000000".to_string(),
                ],
                launchpads: Vec::new(),
                lp_pairs: Vec::new(),
            },
        );
        Self { chains }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contains_known_router() {
        let denylist = InfrastructureDenylist::builtin();
        assert!(denylist.contains("bsc", "0x10ED43C718714eb63d5aA57B78B54704E256024E"));
        assert!(!denylist.contains("bsc", "0x1111111111111111111111111111111111111111"));
    }

    #[test]
    fn test_unknown_chain_matches_nothing() {
        let denylist = InfrastructureDenylist::builtin();
        assert!(!denylist.contains("solana", "0x10ed43c718714eb63d5aa57b78b54704e256024e"));
    }

    #[test]
    fn test_toml_round_trip() {
        let denylist = InfrastructureDenylist::builtin();
        let toml_str = denylist.to_toml().unwrap();
        let parsed = InfrastructureDenylist::from_toml(&toml_str).unwrap();
        assert_eq!(
            parsed.addresses_for("bsc"),
            denylist.addresses_for("bsc")
        );
    }

    #[test]
    fn test_addresses_for_flattens_all_categories() {
        let denylist = InfrastructureDenylist::builtin();
        let addrs = denylist.addresses_for("bsc");
        // 4 hot wallets + 2 routers + 2 dead + 2 launchpads
        assert_eq!(addrs.len(), 10);
    }
}
