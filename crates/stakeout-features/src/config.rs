//! Configuration for feature extraction

use serde::{Deserialize, Serialize};

/// Windows and bucket counts used by the extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Length of the buy/sell pattern window in seconds
    pub pattern_window_secs: u64,

    /// Number of histogram buckets in the pattern window
    pub pattern_buckets: usize,

    /// Two first-buys within this many seconds count as co-timed
    pub co_time_window_secs: u64,

    /// Two exits within this many seconds count as synchronized
    pub co_exit_window_secs: u64,

    /// A first-buy within this many seconds of launch counts as early
    pub early_window_secs: u64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            pattern_window_secs: 3600,
            pattern_buckets: 12,
            co_time_window_secs: 300,
            co_exit_window_secs: 3600,
            early_window_secs: 1800,
        }
    }
}

impl FeatureConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.pattern_window_secs == 0 {
            return Err("pattern_window_secs must be greater than 0".to_string());
        }
        if self.pattern_buckets == 0 {
            return Err("pattern_buckets must be greater than 0".to_string());
        }
        if self.co_time_window_secs == 0 {
            return Err("co_time_window_secs must be greater than 0".to_string());
        }
        if self.co_exit_window_secs == 0 {
            return Err("co_exit_window_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FeatureConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_buckets_rejected() {
        let mut config = FeatureConfig::default();
        config.pattern_buckets = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = FeatureConfig::default();
        let parsed = FeatureConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.pattern_window_secs, config.pattern_window_secs);
        assert_eq!(parsed.co_time_window_secs, config.co_time_window_secs);
    }
}
