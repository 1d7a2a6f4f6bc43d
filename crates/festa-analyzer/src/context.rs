//! Smart analysis context
//!
//! Before photos can be scored, the contest is researched once: the service
//! looks up past winners and judging style and writes a short analysis. That
//! text, with its web sources, is what every photo is judged against.

use std::sync::Arc;

use chrono::Utc;
use festa_domain::{
    dedup_attributions, AbortCoordinator, AnalysisContext, CancelToken, OperationId,
    OperationKind, OperationStatus, StageOutcome, StructuredRecord,
};
use festa_llm::{InferenceError, InferenceService, SmartAnalysisRequest};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{AnalyzerConfig, AnalyzerError};

/// A context request registered with the abort coordinator
#[derive(Debug, Clone)]
pub struct ContextRun {
    /// Operation the request ran under
    pub operation_id: OperationId,
    /// The context, or `Cancelled`
    pub outcome: StageOutcome<AnalysisContext>,
}

/// Produces the analysis context for a record
pub struct ContextBuilder {
    inference: Arc<dyn InferenceService>,
    config: AnalyzerConfig,
}

impl ContextBuilder {
    /// Create a builder
    pub fn new(inference: Arc<dyn InferenceService>, config: AnalyzerConfig) -> Self {
        Self { inference, config }
    }

    /// Register a `SmartAnalysis` operation and build under it
    pub async fn run(
        &self,
        coordinator: &AbortCoordinator,
        record: &StructuredRecord,
        user_notes: Option<&str>,
    ) -> Result<ContextRun, AnalyzerError> {
        let (operation_id, cancel) = coordinator.begin_operation(OperationKind::SmartAnalysis);
        coordinator.set_status(operation_id, OperationStatus::Running);

        match self.build(record, user_notes, &cancel).await {
            Ok(outcome) => {
                let status = match outcome {
                    StageOutcome::Done(_) => OperationStatus::Completed,
                    StageOutcome::Cancelled => OperationStatus::Cancelled,
                };
                coordinator.finish(operation_id, status);
                Ok(ContextRun {
                    operation_id,
                    outcome,
                })
            }
            Err(e) => {
                coordinator.fail(operation_id, e.to_string());
                Err(e)
            }
        }
    }

    /// Research the contest and write its analysis
    ///
    /// Needs the contest name. A response that arrives after `cancel` fired
    /// is discarded.
    pub async fn build(
        &self,
        record: &StructuredRecord,
        user_notes: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<StageOutcome<AnalysisContext>, AnalyzerError> {
        let name = record
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(AnalyzerError::MissingRecordName)?;

        if cancel.is_cancelled() {
            return Ok(StageOutcome::Cancelled);
        }

        let user_notes = user_notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let request = SmartAnalysisRequest {
            name: name.to_string(),
            topics: record.topics.clone(),
            objectives: record.objectives.clone(),
            user_notes: user_notes.clone(),
        };

        let call = self.inference.smart_analysis(&request, cancel);
        let response = match timeout(self.config.context_timeout(), call).await {
            Ok(Ok(response)) => response,
            Ok(Err(InferenceError::Aborted)) => return Ok(StageOutcome::Cancelled),
            Ok(Err(e)) => {
                warn!("Smart analysis for '{}' failed: {}", name, e);
                return Err(e.into());
            }
            Err(_) => return Err(AnalyzerError::Timeout(self.config.context_timeout_secs)),
        };

        if cancel.is_cancelled() {
            debug!("Discarding smart analysis for '{}' after cancellation", name);
            return Ok(StageOutcome::Cancelled);
        }

        let text = response.text.trim();
        if text.is_empty() {
            let empty = InferenceError::InvalidResponse("Smart analysis was empty".to_string());
            return Err(empty.into());
        }

        let sources = dedup_attributions(response.sources);
        info!("Smart analysis for '{}': {} source(s)", name, sources.len());
        Ok(StageOutcome::Done(AnalysisContext {
            text: text.to_string(),
            sources,
            user_notes,
            generated_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use festa_domain::{ContentKind, SourceAttribution};
    use festa_llm::{MockInference, SmartAnalysisResponse};

    fn record(name: Option<&str>) -> StructuredRecord {
        let mut r = StructuredRecord::new("poster.pdf", ContentKind::Document, "raw");
        r.name = name.map(str::to_string);
        r.topics = vec!["Street".to_string()];
        r
    }

    fn source(uri: &str, title: &str) -> SourceAttribution {
        SourceAttribution {
            uri: uri.to_string(),
            title: title.to_string(),
        }
    }

    fn builder(mock: &MockInference) -> ContextBuilder {
        ContextBuilder::new(Arc::new(mock.clone()), AnalyzerConfig::default())
    }

    #[tokio::test]
    async fn test_build_dedups_sources_and_keeps_notes() {
        let mock = MockInference::new();
        mock.push_analysis(Ok(SmartAnalysisResponse {
            text: "  Past winners favour candid moments.  ".to_string(),
            sources: vec![
                source("https://a", "A"),
                source("https://b", "B"),
                source("https://a", "A again"),
            ],
        }));

        let outcome = builder(&mock)
            .build(
                &record(Some("Street Stories")),
                Some(" black and white "),
                &CancelToken::new(),
            )
            .await
            .unwrap();

        let StageOutcome::Done(context) = outcome else {
            panic!("expected a context");
        };
        assert_eq!(context.text, "Past winners favour candid moments.");
        assert_eq!(context.sources.len(), 2);
        assert_eq!(context.sources[0].title, "A");
        assert_eq!(context.user_notes.as_deref(), Some("black and white"));
    }

    #[tokio::test]
    async fn test_missing_name_rejected_without_call() {
        let mock = MockInference::new();
        let result = builder(&mock)
            .build(&record(Some("   ")), None, &CancelToken::new())
            .await;
        assert!(matches!(result, Err(AnalyzerError::MissingRecordName)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_in_flight() {
        let mock = MockInference::gated();
        let builder = builder(&mock);
        let cancel = CancelToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                builder.build(&record(Some("Nature Lens")), None, &cancel).await
            })
        };
        mock.wait_for_calls(1).await;
        cancel.cancel();

        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_analysis_is_invalid_response() {
        let mock = MockInference::new();
        mock.push_analysis(Ok(SmartAnalysisResponse {
            text: " ".to_string(),
            sources: vec![],
        }));
        let result = builder(&mock)
            .build(&record(Some("Nature Lens")), None, &CancelToken::new())
            .await;
        assert!(matches!(
            result,
            Err(AnalyzerError::Inference(InferenceError::InvalidResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_failure_retires_operation() {
        let mock = MockInference::new();
        let error = InferenceError::Configuration("API key rejected".to_string());
        mock.push_analysis(Err(error.clone()));
        let coordinator = AbortCoordinator::new();

        let result = builder(&mock)
            .run(&coordinator, &record(Some("Nature Lens")), None)
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), error.to_string());
        assert!(!err.is_retryable());
        assert_eq!(coordinator.live(OperationKind::SmartAnalysis), None);
    }

    #[tokio::test]
    async fn test_run_completes_operation() {
        let mock = MockInference::new();
        let coordinator = AbortCoordinator::new();

        let run = builder(&mock)
            .run(&coordinator, &record(Some("Nature Lens")), None)
            .await
            .unwrap();

        let op = coordinator.snapshot(run.operation_id).unwrap();
        assert_eq!(op.kind, OperationKind::SmartAnalysis);
        assert_eq!(op.status, OperationStatus::Completed);
        assert!(matches!(run.outcome, StageOutcome::Done(_)));
    }
}
