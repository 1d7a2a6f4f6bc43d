//! Error types for batch analysis

use festa_llm::InferenceError;
use thiserror::Error;

/// Errors that stop a batch or a context request before it produces anything
///
/// Per-item failures are not errors; they are recorded on the item.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The batch has no photos
    #[error("Batch has no photos")]
    EmptyBatch,

    /// The batch exceeds the configured size
    #[error("Batch has {count} photos, at most {max} are allowed")]
    TooManyItems {
        /// Photos supplied
        count: usize,
        /// Configured limit
        max: usize,
    },

    /// No analysis context to score against
    #[error("Record has no analysis context; build one first")]
    MissingContext,

    /// The record has no contest name to research
    #[error("Record has no contest name")]
    MissingRecordName,

    /// Inference service error
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The context request exceeded its time budget
    #[error("Smart analysis timed out after {0}s")]
    Timeout(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalyzerError {
    /// Whether retrying may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalyzerError::Inference(e) => e.is_retryable(),
            AnalyzerError::Timeout(_) => true,
            // Fixable by changing the input
            AnalyzerError::EmptyBatch | AnalyzerError::TooManyItems { .. } => true,
            AnalyzerError::MissingContext
            | AnalyzerError::MissingRecordName
            | AnalyzerError::Config(_) => false,
        }
    }
}
