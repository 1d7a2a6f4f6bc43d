//! Metrics collection for batch analysis

use festa_domain::{Batch, ItemStatus};
use std::collections::HashMap;

/// Metrics collected across batches
///
/// Tracks final item states, scores that had to be zeroed, and runtime.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerMetrics {
    /// Items per final status
    pub items: HashMap<ItemStatus, usize>,

    /// Scores replaced by 0 because they were missing or out of range
    pub zeroed_scores: usize,

    /// Editing notes dropped below the threshold
    pub dropped_notes: usize,

    /// Batches run to the end, cancelled or not
    pub batch_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl AnalyzerMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the final state of every item in a finished batch
    pub fn record_batch(&mut self, batch: &Batch) {
        for item in &batch.items {
            *self.items.entry(item.status()).or_insert(0) += 1;
        }
        self.batch_count += 1;
    }

    /// Record a score replaced by 0
    pub fn record_zeroed_score(&mut self) {
        self.zeroed_scores += 1;
    }

    /// Record editing notes discarded for a low score
    pub fn record_dropped_notes(&mut self) {
        self.dropped_notes += 1;
    }

    /// Items that ended in `status`
    pub fn total(&self, status: ItemStatus) -> usize {
        self.items.get(&status).copied().unwrap_or(0)
    }

    /// Items across all statuses
    pub fn total_items(&self) -> usize {
        self.items.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.items.clear();
        self.zeroed_scores = 0;
        self.dropped_notes = 0;
        self.batch_count = 0;
        self.total_runtime_ms = 0;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Analyzer Metrics Summary".to_string(),
            "========================".to_string(),
            format!("Batches: {}", self.batch_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
        ];

        if !self.items.is_empty() {
            lines.push("Items by status:".to_string());
            for status in [ItemStatus::Done, ItemStatus::Failed, ItemStatus::Cancelled] {
                lines.push(format!("  {}: {}", status, self.total(status)));
            }
            lines.push(format!("  Total: {}", self.total_items()));
            lines.push(String::new());
        }

        lines.push(format!("Zeroed scores: {}", self.zeroed_scores));
        lines.push(format!("Dropped editing notes: {}", self.dropped_notes));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use festa_domain::{ItemInput, RecordId, TopicFocus};

    fn batch(n: usize) -> Batch {
        let inputs = (0..n)
            .map(|i| ItemInput {
                name: format!("{}.jpg", i),
                mime: "image/jpeg".to_string(),
                bytes: vec![0],
                note: None,
            })
            .collect();
        Batch::new(RecordId::new(), TopicFocus::Holistic, inputs)
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = AnalyzerMetrics::new();
        assert_eq!(metrics.total_items(), 0);
        assert_eq!(metrics.batch_count, 0);
    }

    #[test]
    fn test_record_batch() {
        let mut b = batch(3);
        b.items[0].transition(ItemStatus::Running).unwrap();
        b.items[0].transition(ItemStatus::Done).unwrap();
        b.items[1].transition(ItemStatus::Running).unwrap();
        b.items[1].transition(ItemStatus::Failed).unwrap();
        b.items[2].transition(ItemStatus::Cancelled).unwrap();

        let mut metrics = AnalyzerMetrics::new();
        metrics.record_batch(&b);
        metrics.record_batch(&b);

        assert_eq!(metrics.total(ItemStatus::Done), 2);
        assert_eq!(metrics.total(ItemStatus::Cancelled), 2);
        assert_eq!(metrics.total_items(), 6);
        assert_eq!(metrics.batch_count, 2);
    }

    #[test]
    fn test_reset() {
        let mut metrics = AnalyzerMetrics::new();
        metrics.record_batch(&batch(2));
        metrics.record_zeroed_score();
        metrics.reset();

        assert_eq!(metrics.total_items(), 0);
        assert_eq!(metrics.zeroed_scores, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = AnalyzerMetrics::new();
        metrics.record_zeroed_score();
        metrics.record_dropped_notes();
        metrics.total_runtime_ms = 1500;

        let summary = metrics.summary();
        assert!(summary.contains("Batches: 0"));
        assert!(summary.contains("Total runtime: 1500ms"));
        assert!(summary.contains("Zeroed scores: 1"));
        assert!(summary.contains("Dropped editing notes: 1"));
    }
}
