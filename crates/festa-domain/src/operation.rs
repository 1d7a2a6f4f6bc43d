//! Operation - one user-initiated, cancellable unit of work

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::OperationId;

/// What an operation does
///
/// At most one operation of each kind is live at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Extract a record from uploaded files
    ExtractFile,
    /// Extract a record from pasted text
    ExtractText,
    /// Score a batch of photos
    AnalyzeBatch,
    /// Produce the analysis context for a record
    SmartAnalysis,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::ExtractFile => "extract_file",
            OperationKind::ExtractText => "extract_text",
            OperationKind::AnalyzeBatch => "analyze_batch",
            OperationKind::SmartAnalysis => "smart_analysis",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Registered but not started
    Idle,
    /// Validating and normalizing input
    Preparing,
    /// Waiting on the inference service
    Running,
    /// Halted on a quality warning
    AwaitingGate,
    /// Waiting for the user to confirm the deadline
    AwaitingConfirmation,
    /// Finished successfully
    Completed,
    /// Stopped by the user, a replacement operation, or a deadline
    Cancelled,
    /// Stopped by an error
    Failed,
}

impl OperationStatus {
    /// Terminal statuses are sticky
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Cancelled | OperationStatus::Failed
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationStatus::Idle => "idle",
            OperationStatus::Preparing => "preparing",
            OperationStatus::Running => "running",
            OperationStatus::AwaitingGate => "awaiting_gate",
            OperationStatus::AwaitingConfirmation => "awaiting_confirmation",
            OperationStatus::Completed => "completed",
            OperationStatus::Cancelled => "cancelled",
            OperationStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of an operation's state
///
/// The cancel handle is held by the coordinator, not by this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation identifier
    pub id: OperationId,
    /// What the operation does
    pub kind: OperationKind,
    /// Current status
    pub status: OperationStatus,
    /// Verbatim error message when the status is `Failed`
    pub error: Option<String>,
    /// When the operation was registered
    pub started_at: DateTime<Utc>,
    /// When the operation reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

impl Operation {
    /// Create a new operation in the `Preparing` state
    pub fn new(kind: OperationKind) -> Self {
        Self {
            id: OperationId::new(),
            kind,
            status: OperationStatus::Preparing,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(OperationStatus::Completed.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(!OperationStatus::AwaitingGate.is_terminal());
        assert!(!OperationStatus::Idle.is_terminal());
    }

    #[test]
    fn test_new_operation_is_preparing() {
        let op = Operation::new(OperationKind::ExtractText);
        assert_eq!(op.status, OperationStatus::Preparing);
        assert!(op.error.is_none());
        assert!(op.finished_at.is_none());
    }
}
