//! Batch suitability analysis
//!
//! Photos are scored one at a time, in input order, against a record and its
//! analysis context. Every state change is published on a `watch` channel so
//! a UI can render partial results while the batch runs; the analyzer is the
//! only writer.

use std::sync::Arc;
use std::time::Instant;

use festa_domain::{
    AbortCoordinator, AnalysisContext, Batch, BatchItem, CancelToken, ItemAnalysis, ItemInput,
    ItemStatus, OperationId, OperationKind, OperationStatus, StructuredRecord, TopicFocus,
};
use festa_llm::{InferenceError, InferenceService, ItemAnalysisRequest, ItemAnalysisResponse};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{AnalyzerConfig, AnalyzerError, AnalyzerMetrics};

/// Message recorded on items stopped by cancellation
pub const CANCELLED_MESSAGE: &str = "cancelled by user";

/// Highest score the service may give
pub const MAX_SCORE: f64 = 10.0;

/// Bring a raw score into `0..=10`
///
/// Anything missing, non-finite or out of range becomes 0 rather than being
/// pulled to the nearest bound.
pub fn clamp_score(raw: Option<f64>) -> f64 {
    match raw {
        Some(score) if score.is_finite() && (0.0..=MAX_SCORE).contains(&score) => score,
        _ => 0.0,
    }
}

/// A batch run registered with the abort coordinator
#[derive(Debug, Clone)]
pub struct BatchRun {
    /// Operation the batch ran under
    pub operation_id: OperationId,
    /// Final batch, every item terminal
    pub batch: Batch,
}

/// Scores photos against a contest
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use festa_analyzer::BatchAnalyzer;
/// use festa_domain::{CancelToken, ContentKind, StructuredRecord, TopicFocus};
/// use festa_llm::MockInference;
///
/// # async fn example(
/// #     context: festa_domain::AnalysisContext,
/// #     photos: Vec<festa_domain::ItemInput>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let mut analyzer = BatchAnalyzer::default_config(Arc::new(MockInference::new()));
/// let progress = analyzer.subscribe();
///
/// let record = StructuredRecord::new("poster.pdf", ContentKind::Document, "text");
/// let batch = analyzer
///     .run_batch(&record, photos, &context, TopicFocus::Holistic, &CancelToken::new())
///     .await?;
/// println!("{}", batch.status());
/// # Ok(())
/// # }
/// ```
pub struct BatchAnalyzer {
    inference: Arc<dyn InferenceService>,
    config: AnalyzerConfig,
    metrics: AnalyzerMetrics,
    progress: watch::Sender<Option<Batch>>,
}

impl BatchAnalyzer {
    /// Create an analyzer with the given configuration
    pub fn new(inference: Arc<dyn InferenceService>, config: AnalyzerConfig) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            inference,
            config,
            metrics: AnalyzerMetrics::new(),
            progress,
        }
    }

    /// Create an analyzer with default configuration
    pub fn default_config(inference: Arc<dyn InferenceService>) -> Self {
        Self::new(inference, AnalyzerConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &AnalyzerMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Observe batch snapshots; `None` until the first batch starts
    pub fn subscribe(&self) -> watch::Receiver<Option<Batch>> {
        self.progress.subscribe()
    }

    fn check(&self, items: &[ItemInput], context: &AnalysisContext) -> Result<(), AnalyzerError> {
        if items.is_empty() {
            return Err(AnalyzerError::EmptyBatch);
        }
        if items.len() > self.config.max_items {
            return Err(AnalyzerError::TooManyItems {
                count: items.len(),
                max: self.config.max_items,
            });
        }
        if context.text.trim().is_empty() {
            return Err(AnalyzerError::MissingContext);
        }
        Ok(())
    }

    /// Register an `AnalyzeBatch` operation and run the batch under it
    ///
    /// Any batch already running is cancelled first. Input errors are
    /// reported before that happens, so a rejected batch never disturbs a
    /// running one.
    pub async fn analyze(
        &mut self,
        coordinator: &AbortCoordinator,
        record: &StructuredRecord,
        items: Vec<ItemInput>,
        context: &AnalysisContext,
        focus: TopicFocus,
    ) -> Result<BatchRun, AnalyzerError> {
        self.check(&items, context)?;

        let (operation_id, cancel) = coordinator.begin_operation(OperationKind::AnalyzeBatch);
        coordinator.set_status(operation_id, OperationStatus::Running);

        match self.run_batch(record, items, context, focus, &cancel).await {
            Ok(batch) => {
                coordinator.finish(operation_id, OperationStatus::Completed);
                Ok(BatchRun { operation_id, batch })
            }
            Err(e) => {
                coordinator.fail(operation_id, e.to_string());
                Err(e)
            }
        }
    }

    /// Score every photo in order, stopping at cancellation
    ///
    /// Per-item failures are recorded on the item and do not stop the batch.
    /// When `cancel` fires, the item in flight is marked cancelled unless its
    /// result already arrived, and no further item starts. On return every
    /// item is terminal.
    pub async fn run_batch(
        &mut self,
        record: &StructuredRecord,
        items: Vec<ItemInput>,
        context: &AnalysisContext,
        focus: TopicFocus,
        cancel: &CancelToken,
    ) -> Result<Batch, AnalyzerError> {
        self.check(&items, context)?;

        let started = Instant::now();
        let mut batch = Batch::new(record.id, focus, items);
        info!(
            "Analyzing {} photo(s) for '{}' ({})",
            batch.items.len(),
            record.label(),
            batch.focus
        );
        self.publish(&batch);

        let mut stopped = false;
        for index in 0..batch.items.len() {
            if stopped || cancel.is_cancelled() {
                stopped = true;
                settle(&mut batch.items[index], ItemStatus::Cancelled);
                batch.items[index].error = Some(CANCELLED_MESSAGE.to_string());
                continue;
            }

            settle(&mut batch.items[index], ItemStatus::Running);
            self.publish(&batch);

            let request = item_request(record, &batch.items[index], context, &batch.focus);
            let call = self.inference.analyze_item(&request, cancel);
            let outcome = timeout(self.config.item_timeout(), call).await;

            let item = &mut batch.items[index];
            match outcome {
                Ok(Ok(response)) => {
                    let analysis = self.finish_analysis(response, &item.input.name);
                    debug!("'{}' scored {}", item.input.name, analysis.score);
                    item.result = Some(analysis);
                    settle(item, ItemStatus::Done);
                }
                Ok(Err(InferenceError::Aborted)) => {
                    item.error = Some(CANCELLED_MESSAGE.to_string());
                    settle(item, ItemStatus::Cancelled);
                    stopped = true;
                }
                Ok(Err(e)) => {
                    warn!("Analysis of '{}' failed: {}", item.input.name, e);
                    item.error = Some(e.to_string());
                    settle(item, ItemStatus::Failed);
                }
                Err(_) => {
                    let message = format!(
                        "Analysis timed out after {}s",
                        self.config.item_timeout_secs
                    );
                    warn!("'{}': {}", item.input.name, message);
                    item.error = Some(message);
                    settle(item, ItemStatus::Failed);
                }
            }
            self.publish(&batch);
        }

        self.publish(&batch);
        self.metrics.record_batch(&batch);
        self.metrics.total_runtime_ms += started.elapsed().as_millis() as u64;
        info!(
            "Batch {} {}: {} done, {} failed, {} cancelled",
            batch.id,
            batch.status(),
            batch.count(ItemStatus::Done),
            batch.count(ItemStatus::Failed),
            batch.count(ItemStatus::Cancelled)
        );
        Ok(batch)
    }

    fn finish_analysis(&mut self, response: ItemAnalysisResponse, name: &str) -> ItemAnalysis {
        let ItemAnalysisResponse {
            critique,
            score: raw,
            score_reasoning,
            editing_notes,
        } = response;

        let score = clamp_score(raw);
        if raw != Some(score) {
            warn!("Score {:?} for '{}' is outside 0..={}, using 0", raw, name, MAX_SCORE);
            self.metrics.record_zeroed_score();
        }

        let editing_notes = editing_notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let editing_notes = match editing_notes {
            Some(_) if score < self.config.editing_notes_threshold => {
                self.metrics.record_dropped_notes();
                None
            }
            notes => notes,
        };

        ItemAnalysis {
            critique: critique.trim().to_string(),
            score,
            score_reasoning: score_reasoning.trim().to_string(),
            editing_notes,
        }
    }

    fn publish(&self, batch: &Batch) {
        self.progress.send_replace(Some(batch.clone()));
    }
}

fn item_request(
    record: &StructuredRecord,
    item: &BatchItem,
    context: &AnalysisContext,
    focus: &TopicFocus,
) -> ItemAnalysisRequest {
    ItemAnalysisRequest {
        image: item.input.bytes.clone(),
        mime: item.input.mime.clone(),
        record_name: record.name.clone(),
        topics: record.topics.clone(),
        objectives: record.objectives.clone(),
        analysis_text: context.text.clone(),
        focus: focus.clone(),
        note: item
            .input
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    }
}

fn settle(item: &mut BatchItem, next: ItemStatus) {
    if let Err(e) = item.transition(next) {
        warn!("{}", e);
    }
}
