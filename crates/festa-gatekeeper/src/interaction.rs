//! The human side of the pipeline
//!
//! Implementations decide how questions reach the user (terminal prompts,
//! scripted answers in tests). The pipeline never suspends on anything else
//! that a person has to answer.

use async_trait::async_trait;
use festa_domain::QualityWarning;

use crate::{DeadlineReview, GateError};

/// Answer to a stage-1 quality warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningChoice {
    /// Proceed to structured extraction with the short text
    Continue,
    /// Stop the operation
    Cancel,
}

/// Answer to a deadline confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmChoice {
    /// Keep the reconciled deadline
    Accept,
    /// Go back and edit the record
    Edit,
    /// Replace the deadline; the Jalali value is tried first
    Amend {
        /// New Jalali date
        persian: Option<String>,
        /// New Gregorian date, used when the Jalali one is absent or invalid
        gregorian: Option<String>,
    },
}

/// Questions the pipeline asks the user
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Stage-1 text looks too short; continue or stop?
    async fn resolve_quality_warning(
        &self,
        warning: &QualityWarning,
        raw_text: &str,
    ) -> Result<WarningChoice, GateError>;

    /// Confirm the reviewed deadline before the record is saved
    async fn confirm_deadline(&self, review: &DeadlineReview) -> Result<ConfirmChoice, GateError>;
}
