//! Configuration for the Gemini provider

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Gemini API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model for text and structured extraction
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default model for image transcription and photo scoring
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

/// Default timeout for a single HTTP request (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration for [`crate::GeminiProvider`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URL of the API
    pub endpoint: String,

    /// API key; usually supplied from the environment instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for structured extraction and smart analysis
    pub text_model: String,

    /// Model used for image transcription and photo scoring
    pub vision_model: String,

    /// Timeout for one HTTP request (seconds)
    pub timeout_secs: u64,

    /// Attempts per call for transient failures
    pub max_retries: u32,
}

impl GeminiConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint must not be empty".to_string());
        }
        if self.text_model.trim().is_empty() || self.vision_model.trim().is_empty() {
            return Err("model names must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
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

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GeminiConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_retries() {
        let mut config = GeminiConfig::default();
        config.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_written_when_absent() {
        let toml_str = GeminiConfig::default().to_toml().unwrap();
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = GeminiConfig::from_toml("timeout_secs = 10\n").unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }
}
