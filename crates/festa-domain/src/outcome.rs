//! Stage results shared by the extraction pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a cancellable stage
///
/// Cancellation is a normal outcome, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage ran to completion
    Done(T),
    /// The stage observed cancellation and produced nothing
    Cancelled,
}

impl<T> StageOutcome<T> {
    /// Whether the stage was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageOutcome::Cancelled)
    }

    /// Transform the completed value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> StageOutcome<U> {
        match self {
            StageOutcome::Done(v) => StageOutcome::Done(f(v)),
            StageOutcome::Cancelled => StageOutcome::Cancelled,
        }
    }

    /// The completed value, if any
    pub fn done(self) -> Option<T> {
        match self {
            StageOutcome::Done(v) => Some(v),
            StageOutcome::Cancelled => None,
        }
    }
}

/// Shape of the normalized input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// A single PDF document
    Document,
    /// One or more images, in user order
    Images,
    /// Pasted text
    Text,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentKind::Document => "document",
            ContentKind::Images => "images",
            ContentKind::Text => "text",
        };
        write!(f, "{}", s)
    }
}

/// Raised when stage-1 text is too short to be trusted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityWarning {
    /// Human-readable explanation
    pub reason: String,
    /// Minimum acceptable trimmed length
    pub threshold_chars: usize,
    /// Trimmed length actually extracted
    pub actual_chars: usize,
}

/// Output of the extraction stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Joined text of all inputs, may be empty
    pub raw_text: String,
    /// One entry per image, or a single entry for documents and text
    pub per_input_texts: Vec<String>,
    /// Kind of the content the text came from
    pub content_kind: ContentKind,
    /// Present iff the trimmed text is below the kind's threshold
    pub quality_warning: Option<QualityWarning>,
}

impl ExtractionResult {
    /// Trimmed character count of the raw text
    pub fn trimmed_chars(&self) -> usize {
        self.raw_text.trim().chars().count()
    }

    /// Whether the structuring stage may run on this result
    pub fn is_cleared(&self) -> bool {
        self.quality_warning.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_outcome_map() {
        let done: StageOutcome<u32> = StageOutcome::Done(2);
        assert_eq!(done.map(|v| v * 2), StageOutcome::Done(4));

        let cancelled: StageOutcome<u32> = StageOutcome::Cancelled;
        assert!(cancelled.clone().map(|v| v * 2).is_cancelled());
        assert_eq!(cancelled.done(), None);
    }

    #[test]
    fn test_trimmed_chars_counts_characters() {
        let result = ExtractionResult {
            raw_text: "  مسابقه  ".to_string(),
            per_input_texts: vec![],
            content_kind: ContentKind::Text,
            quality_warning: None,
        };
        assert_eq!(result.trimmed_chars(), 6);
        assert!(result.is_cleared());
    }
}
