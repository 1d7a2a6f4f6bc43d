//! Configuration for batch analysis
//!
//! Defines the batch size limit, the editing-notes threshold and the time
//! budgets for per-item and context calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the batch analyzer and context builder
///
/// # Examples
///
/// ```
/// use festa_analyzer::AnalyzerConfig;
///
/// // Default configuration
/// let config = AnalyzerConfig::default();
/// assert_eq!(config.max_items, 10);
///
/// // Strict: fewer photos, higher bar for editing notes
/// let config = AnalyzerConfig::strict();
/// assert_eq!(config.editing_notes_threshold, 8.0);
///
/// // Lenient: larger batches
/// let config = AnalyzerConfig::lenient();
/// assert_eq!(config.max_items, 25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum number of photos in one batch
    /// Default: 10
    pub max_items: usize,

    /// Minimum score at which editing notes are kept
    /// Default: 7.0
    pub editing_notes_threshold: f64,

    /// Time budget for one photo's analysis call (seconds)
    /// Default: 90
    pub item_timeout_secs: u64,

    /// Time budget for producing an analysis context (seconds)
    /// Default: 180, grounded search is slow
    pub context_timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            editing_notes_threshold: 7.0,
            item_timeout_secs: 90,
            context_timeout_secs: 180,
        }
    }
}

impl AnalyzerConfig {
    /// Strict preset: smaller batches, editing notes only for strong photos
    pub fn strict() -> Self {
        Self {
            max_items: 5,
            editing_notes_threshold: 8.0,
            item_timeout_secs: 60,
            context_timeout_secs: 120,
        }
    }

    /// Lenient preset: larger batches and longer budgets
    pub fn lenient() -> Self {
        Self {
            max_items: 25,
            editing_notes_threshold: 6.0,
            item_timeout_secs: 180,
            context_timeout_secs: 300,
        }
    }

    /// Get the per-item timeout as a Duration
    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    /// Get the context timeout as a Duration
    pub fn context_timeout(&self) -> Duration {
        Duration::from_secs(self.context_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_items == 0 {
            return Err("max_items must be greater than 0".to_string());
        }
        if !(0.0..=10.0).contains(&self.editing_notes_threshold) {
            return Err(format!(
                "editing_notes_threshold must be within 0..=10, got {}",
                self.editing_notes_threshold
            ));
        }
        if self.item_timeout_secs == 0 || self.context_timeout_secs == 0 {
            return Err("timeouts must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.max_items, 10);
        assert_eq!(config.editing_notes_threshold, 7.0);
        assert_eq!(config.item_timeout(), Duration::from_secs(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(AnalyzerConfig::strict().validate().is_ok());
        assert!(AnalyzerConfig::lenient().validate().is_ok());
        assert!(AnalyzerConfig::strict().max_items < AnalyzerConfig::default().max_items);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = AnalyzerConfig {
            editing_notes_threshold: 11.0,
            ..AnalyzerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_items_rejected() {
        let config = AnalyzerConfig {
            max_items: 0,
            ..AnalyzerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AnalyzerConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        assert_eq!(AnalyzerConfig::from_toml(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AnalyzerConfig::from_toml("max_items = 3").unwrap();
        assert_eq!(config.max_items, 3);
        assert_eq!(config.item_timeout_secs, 90);
    }
}
