//! Gatekeeper configuration

use serde::{Deserialize, Serialize};

/// Rules applied when reviewing a record's deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Earliest Jalali year that is not flagged as implausible
    pub min_plausible_year: i32,

    /// Latest Jalali year that is not flagged as implausible
    pub max_plausible_year: i32,

    /// Add a note when the deadline is already behind today
    pub flag_past_deadlines: bool,

    /// How many unusable amendments the user may submit before the gate
    /// sends the record back to editing
    pub max_amend_attempts: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_plausible_year: 1300,
            max_plausible_year: 1500,
            flag_past_deadlines: true,
            max_amend_attempts: 3,
        }
    }
}

impl GateConfig {
    /// Only the year range check, no past-deadline notes
    pub fn permissive() -> Self {
        Self {
            flag_past_deadlines: false,
            max_amend_attempts: 10,
            ..Self::default()
        }
    }

    /// Narrow plausible range around the present
    pub fn strict() -> Self {
        Self {
            min_plausible_year: 1390,
            max_plausible_year: 1420,
            flag_past_deadlines: true,
            max_amend_attempts: 1,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.min_plausible_year > self.max_plausible_year {
            return Err(format!(
                "min_plausible_year ({}) must not exceed max_plausible_year ({})",
                self.min_plausible_year, self.max_plausible_year
            ));
        }
        if self.max_amend_attempts == 0 {
            return Err("max_amend_attempts must be at least 1".to_string());
        }
        Ok(())
    }

    /// Parse from a TOML string
    pub fn from_toml(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }
}
