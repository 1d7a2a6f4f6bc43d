//! Gatekeeper error types

use festa_domain::StructuredRecord;
use thiserror::Error;

/// Errors that can occur while confirming or committing a record
#[derive(Error, Debug)]
pub enum GateError {
    /// The store rejected the write; the record is handed back so it is not lost
    #[error("Persistence error: {message}")]
    Persistence {
        /// Store error message
        message: String,
        /// The record that failed to commit
        record: Box<StructuredRecord>,
    },

    /// The interaction surface failed (closed terminal, broken pipe, ...)
    #[error("Interaction error: {0}")]
    Interaction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Whether repeating the same step may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, GateError::Persistence { .. })
    }

    /// Recover the record carried by a persistence failure
    pub fn into_record(self) -> Option<StructuredRecord> {
        match self {
            GateError::Persistence { record, .. } => Some(*record),
            _ => None,
        }
    }
}
