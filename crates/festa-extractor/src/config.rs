//! Configuration for the extraction pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Separator placed between the transcriptions of consecutive images
pub const DEFAULT_IMAGE_SEPARATOR: &str = "\n\n--- next image ---\n\n";

/// Configuration for the extraction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Trimmed characters below which image text raises a quality warning
    pub min_image_text_chars: usize,

    /// Trimmed characters below which pasted text raises a quality warning
    pub min_input_text_chars: usize,

    /// Maximum number of images in one extraction
    pub max_images: usize,

    /// Separator between per-image transcriptions
    pub image_separator: String,

    /// Maximum time for a single inference call or document read (seconds)
    pub stage_timeout_secs: u64,
}

impl ExtractorConfig {
    /// Get the stage timeout as a Duration
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_images == 0 {
            return Err("max_images must be greater than 0".to_string());
        }
        if self.stage_timeout_secs == 0 {
            return Err("stage_timeout_secs must be greater than 0".to_string());
        }
        if self.image_separator.is_empty() {
            return Err("image_separator must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_image_text_chars: 30,
            min_input_text_chars: 50,
            max_images: 10,
            image_separator: DEFAULT_IMAGE_SEPARATOR.to_string(),
            stage_timeout_secs: 120,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: fewer images, shorter timeouts
    pub fn aggressive() -> Self {
        Self {
            max_images: 5,
            stage_timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Lenient preset: lower warning thresholds, longer timeouts
    pub fn lenient() -> Self {
        Self {
            min_image_text_chars: 10,
            min_input_text_chars: 20,
            max_images: 20,
            stage_timeout_secs: 300,
            ..Self::default()
        }
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
