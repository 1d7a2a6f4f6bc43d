//! Photo batches and per-item analysis state

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BatchId, BatchItemId, RecordId};

/// Sentinel topic value meaning "score against the contest as a whole"
pub const GENERAL_TOPIC: &str = "__GENERAL__";

/// Scoring policy forwarded to the inference service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "topic", rename_all = "snake_case")]
pub enum TopicFocus {
    /// Score against the contest as a whole, any topic fits
    Holistic,
    /// Score primarily against one topic
    Topic(String),
}

impl TopicFocus {
    /// Parse a user-supplied topic; empty or the sentinel means holistic
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == GENERAL_TOPIC {
            TopicFocus::Holistic
        } else {
            TopicFocus::Topic(trimmed.to_string())
        }
    }
}

impl fmt::Display for TopicFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicFocus::Holistic => write!(f, "holistic"),
            TopicFocus::Topic(t) => write!(f, "topic '{}'", t),
        }
    }
}

/// A photo submitted for analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    /// File name
    pub name: String,
    /// MIME type
    pub mime: String,
    /// Image bytes, not serialized
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Optional note from the user about this photo
    pub note: Option<String>,
}

/// Per-item state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not started
    Queued,
    /// Inference call in flight
    Running,
    /// Analysis recorded
    Done,
    /// Inference call failed
    Failed,
    /// Never ran, or aborted mid-flight
    Cancelled,
}

impl ItemStatus {
    /// Whether the item has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Failed | ItemStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        matches!(
            (self, next),
            (Queued, Running) | (Queued, Cancelled) | (Running, Done) | (Running, Failed) | (Running, Cancelled)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Queued => "queued",
            ItemStatus::Running => "running",
            ItemStatus::Done => "done",
            ItemStatus::Failed => "failed",
            ItemStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Analysis of one photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAnalysis {
    /// Critique text
    pub critique: String,
    /// Suitability score, 0..=10
    pub score: f64,
    /// Why the score was given
    pub score_reasoning: String,
    /// Editing suggestions, only for scores at or above the threshold
    pub editing_notes: Option<String>,
}

/// One photo in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Item identifier
    pub id: BatchItemId,
    /// The photo
    pub input: ItemInput,
    status: ItemStatus,
    /// Analysis when `Done`
    pub result: Option<ItemAnalysis>,
    /// Failure or cancellation message
    pub error: Option<String>,
}

impl BatchItem {
    /// Create a queued item
    pub fn new(input: ItemInput) -> Self {
        Self {
            id: BatchItemId::new(),
            input,
            status: ItemStatus::Queued,
            result: None,
            error: None,
        }
    }

    /// Current status
    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: ItemStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Illegal item transition {} -> {} for '{}'",
                self.status, next, self.input.name
            ));
        }
        self.status = next;
        Ok(())
    }
}

/// Aggregate state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Some item is still queued or running
    Running,
    /// Every item is done
    Completed,
    /// At least one item was cancelled
    Cancelled,
    /// No item cancelled, at least one failed
    PartiallyFailed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::PartiallyFailed => "partially_failed",
        };
        write!(f, "{}", s)
    }
}

/// A set of photos analyzed against one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Batch identifier
    pub id: BatchId,
    /// Record the batch is analyzed against
    pub record_id: RecordId,
    /// Scoring policy
    pub focus: TopicFocus,
    /// Items in input order
    pub items: Vec<BatchItem>,
}

impl Batch {
    /// Create a batch with every item queued
    pub fn new(record_id: RecordId, focus: TopicFocus, inputs: Vec<ItemInput>) -> Self {
        Self {
            id: BatchId::new(),
            record_id,
            focus,
            items: inputs.into_iter().map(BatchItem::new).collect(),
        }
    }

    /// Aggregate status derived from the items
    pub fn status(&self) -> BatchStatus {
        if self.items.iter().any(|i| !i.status().is_terminal()) {
            BatchStatus::Running
        } else if self.items.iter().any(|i| i.status() == ItemStatus::Cancelled) {
            BatchStatus::Cancelled
        } else if self.items.iter().any(|i| i.status() == ItemStatus::Failed) {
            BatchStatus::PartiallyFailed
        } else {
            BatchStatus::Completed
        }
    }

    /// Number of items in a given status
    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status() == status).count()
    }

    /// Remove one analyzed photo by position, keeping the others in order
    ///
    /// Only items that reached a final state can be removed.
    pub fn remove_item(&mut self, position: usize) -> Result<BatchItem, String> {
        let item = self
            .items
            .get(position)
            .ok_or_else(|| format!("Batch has no item #{}", position + 1))?;
        if !item.status().is_terminal() {
            return Err(format!("'{}' is still {}", item.input.name, item.status()));
        }
        Ok(self.items.remove(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> ItemInput {
        ItemInput {
            name: name.to_string(),
            mime: "image/jpeg".to_string(),
            bytes: vec![1, 2, 3],
            note: None,
        }
    }

    #[test]
    fn test_topic_focus_parse() {
        assert_eq!(TopicFocus::parse(""), TopicFocus::Holistic);
        assert_eq!(TopicFocus::parse(GENERAL_TOPIC), TopicFocus::Holistic);
        assert_eq!(
            TopicFocus::parse(" Nature "),
            TopicFocus::Topic("Nature".to_string())
        );
    }

    #[test]
    fn test_item_transitions() {
        let mut item = BatchItem::new(input("a.jpg"));
        assert!(item.transition(ItemStatus::Done).is_err());
        item.transition(ItemStatus::Running).unwrap();
        item.transition(ItemStatus::Done).unwrap();
        assert!(item.transition(ItemStatus::Running).is_err());
        assert!(item.transition(ItemStatus::Cancelled).is_err());

        let mut skipped = BatchItem::new(input("b.jpg"));
        skipped.transition(ItemStatus::Cancelled).unwrap();
        assert_eq!(skipped.status(), ItemStatus::Cancelled);
    }

    #[test]
    fn test_batch_status_derivation() {
        let mut batch = Batch::new(
            RecordId::new(),
            TopicFocus::Holistic,
            vec![input("a.jpg"), input("b.jpg")],
        );
        assert_eq!(batch.status(), BatchStatus::Running);

        batch.items[0].transition(ItemStatus::Running).unwrap();
        batch.items[0].transition(ItemStatus::Failed).unwrap();
        batch.items[1].transition(ItemStatus::Running).unwrap();
        batch.items[1].transition(ItemStatus::Done).unwrap();
        assert_eq!(batch.status(), BatchStatus::PartiallyFailed);

        let mut cancelled = Batch::new(
            RecordId::new(),
            TopicFocus::Holistic,
            vec![input("a.jpg"), input("b.jpg")],
        );
        cancelled.items[0].transition(ItemStatus::Running).unwrap();
        cancelled.items[0].transition(ItemStatus::Failed).unwrap();
        cancelled.items[1].transition(ItemStatus::Cancelled).unwrap();
        assert_eq!(cancelled.status(), BatchStatus::Cancelled);
    }

    #[test]
    fn test_remove_item_keeps_order() {
        let mut b = Batch::new(
            RecordId::new(),
            TopicFocus::Holistic,
            vec![input("a"), input("b"), input("c")],
        );
        for item in &mut b.items {
            item.transition(ItemStatus::Cancelled).unwrap();
        }

        let removed = b.remove_item(1).unwrap();
        assert_eq!(removed.input.name, "b");
        let names: Vec<_> = b.items.iter().map(|i| i.input.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(b.remove_item(5).is_err());
    }

    #[test]
    fn test_remove_running_item_rejected() {
        let mut b = Batch::new(RecordId::new(), TopicFocus::Holistic, vec![input("a")]);
        b.items[0].transition(ItemStatus::Running).unwrap();
        assert!(b.remove_item(0).is_err());
        assert_eq!(b.items.len(), 1);
    }

    #[test]
    fn test_bytes_not_serialized() {
        let json = serde_json::to_string(&input("a.jpg")).unwrap();
        assert!(!json.contains("bytes"));
    }
}
