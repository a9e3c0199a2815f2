//! Completeness gate configuration

use serde::{Deserialize, Serialize};

/// Analysis mode, in increasing depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fast pass over readily available evidence
    Quick,
    /// The default investigation depth
    Standard,
    /// Exhaustive pass including origin tracking
    Deep,
}

impl Mode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Quick => "quick",
            Mode::Standard => "standard",
            Mode::Deep => "deep",
        }
    }

    /// Parse a mode from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quick" => Some(Mode::Quick),
            "standard" => Some(Mode::Standard),
            "deep" => Some(Mode::Deep),
            _ => None,
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid mode: {}", s))
    }
}

/// Per-mode minimums and citation requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessConfig {
    /// Minimum timeline events in quick mode
    pub quick_min_events: usize,
    /// Minimum turning points in quick mode
    pub quick_min_turning_points: usize,
    /// Minimum timeline events in standard mode
    pub standard_min_events: usize,
    /// Minimum turning points in standard mode
    pub standard_min_turning_points: usize,
    /// Minimum timeline events in deep mode
    pub deep_min_events: usize,
    /// Minimum turning points in deep mode
    pub deep_min_turning_points: usize,
    /// Independent citations a headline conclusion needs unless flagged
    /// single-source
    pub min_headline_citations: usize,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            quick_min_events: 3,
            quick_min_turning_points: 1,
            standard_min_events: 8,
            standard_min_turning_points: 3,
            deep_min_events: 15,
            deep_min_turning_points: 3,
            min_headline_citations: 2,
        }
    }
}

impl CompletenessConfig {
    /// Minimum (events, turning points) for a mode
    pub fn timeline_minimums(&self, mode: Mode) -> (usize, usize) {
        match mode {
            Mode::Quick => (self.quick_min_events, self.quick_min_turning_points),
            Mode::Standard => (self.standard_min_events, self.standard_min_turning_points),
            Mode::Deep => (self.deep_min_events, self.deep_min_turning_points),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_headline_citations == 0 {
            return Err("min_headline_citations must be greater than 0".to_string());
        }
        if self.standard_min_events < self.quick_min_events
            || self.deep_min_events < self.standard_min_events
        {
            return Err("event minimums must not decrease with depth".to_string());
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
}
