//! Error types for the extraction pipeline

use festa_llm::InferenceError;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The input set is not one document, 1..N images or non-blank text
    #[error("Invalid input: {0}")]
    InvalidInputComposition(String),

    /// The document yielded no text
    #[error("No text could be extracted from the document")]
    EmptyDocument,

    /// The document could not be read
    #[error("Document error: {0}")]
    Document(String),

    /// Inference service error
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// A stage exceeded its time budget
    #[error("{stage} timed out after {secs}s")]
    Timeout {
        /// Stage that timed out
        stage: &'static str,
        /// Configured budget
        secs: u64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractionError {
    /// Whether retrying (possibly with other input) may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::InvalidInputComposition(_) => true,
            ExtractionError::Timeout { .. } => true,
            ExtractionError::Inference(e) => e.is_retryable(),
            ExtractionError::EmptyDocument
            | ExtractionError::Document(_)
            | ExtractionError::Config(_) => false,
        }
    }
}
