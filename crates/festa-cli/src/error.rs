//! Error types for the CLI application.

use festa_analyzer::AnalyzerError;
use festa_extractor::{ExtractionError, PipelineError};
use festa_gatekeeper::GateError;
use festa_llm::InferenceError;
use festa_store::StoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No record matches the given id
    #[error("No record matches '{0}'")]
    NotFound(String),

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Inference provider error
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Input could not be read or normalized
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// An ingest stage failed
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Confirmation or commit failed
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Analysis could not start or failed
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

impl CliError {
    /// Whether running the same command again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CliError::Inference(e) => e.is_retryable(),
            CliError::Extraction(e) => e.is_retryable(),
            CliError::Pipeline(e) => e.is_retryable(),
            CliError::Gate(e) => e.is_retryable(),
            CliError::Analyzer(e) => e.is_retryable(),
            _ => false,
        }
    }
}
