//! The ingest pipeline
//!
//! ```text
//! InputSet → normalize → extract → [quality gate] → structure → confirm → commit
//! ```
//!
//! Everything runs under one Operation registered with the abort coordinator.
//! Starting another ingest of the same kind cancels this one; cancellation at
//! any point ends the run with `IngestOutcome::Cancelled` and leaves the store
//! untouched.

use std::sync::{Arc, Mutex};

use festa_domain::traits::RecordStore;
use festa_domain::{
    AbortCoordinator, CancelToken, ContentKind, ExtractionResult, OperationId, OperationKind,
    OperationStatus, SourceDescriptor, StageOutcome, StructuredRecord,
};
use festa_gatekeeper::{ConfirmationGate, GateDecision, GateError, UserInteraction, WarningChoice};
use festa_llm::InferenceService;
use thiserror::Error;
use tracing::{info, warn};

use crate::content::{ContentNormalizer, InputSet};
use crate::document::{DocumentReader, LopdfReader};
use crate::extractor::ExtractionCoordinator;
use crate::structurer::Structurer;
use crate::{ExtractionError, ExtractorConfig};

/// Why an ingest run failed
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Normalization, extraction or structuring failed
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Confirmation or commit failed
    #[error(transparent)]
    Gate(#[from] GateError),
}

impl PipelineError {
    /// Whether the failed step may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Extraction(e) => e.is_retryable(),
            PipelineError::Gate(e) => e.is_retryable(),
        }
    }
}

/// How an ingest run ended
#[derive(Debug)]
pub enum IngestOutcome {
    /// The record was confirmed and saved
    Committed(StructuredRecord),
    /// The user chose to edit the record before saving
    ///
    /// The operation still finishes as `Completed`, but nothing is written to
    /// the store. Saving the edited record is up to the caller.
    ReturnedToEdit(StructuredRecord),
    /// The run was cancelled; nothing was saved
    Cancelled,
    /// A stage failed
    Failed(PipelineError),
}

/// Result of one ingest run
#[derive(Debug)]
pub struct IngestReport {
    /// Operation the run was registered under
    pub operation_id: OperationId,
    /// How it ended
    pub outcome: IngestOutcome,
    /// Stage-1 output, when extraction got that far
    ///
    /// Feed it to [`IngestPipeline::retry_structure`] after a structuring failure.
    pub extraction: Option<ExtractionResult>,
    /// Name shown for the input set
    pub display_name: Option<String>,
}

/// Runs the ingest stages against one store
pub struct IngestPipeline<S: RecordStore> {
    coordinator: AbortCoordinator,
    normalizer: ContentNormalizer,
    extractor: ExtractionCoordinator,
    structurer: Structurer,
    gate: ConfirmationGate,
    interaction: Arc<dyn UserInteraction>,
    store: Arc<Mutex<S>>,
    inference: Arc<dyn InferenceService>,
    config: ExtractorConfig,
}

impl<S> IngestPipeline<S>
where
    S: RecordStore + Send,
    S::Error: std::fmt::Display,
{
    /// Create a pipeline reading PDFs with `lopdf` and the default gate
    pub fn new(
        inference: Arc<dyn InferenceService>,
        interaction: Arc<dyn UserInteraction>,
        store: Arc<Mutex<S>>,
        coordinator: AbortCoordinator,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            coordinator,
            normalizer: ContentNormalizer::new(config.max_images),
            extractor: ExtractionCoordinator::new(
                Arc::clone(&inference),
                Arc::new(LopdfReader),
                config.clone(),
            ),
            structurer: Structurer::new(Arc::clone(&inference), config.clone()),
            gate: ConfirmationGate::default_config(),
            interaction,
            store,
            inference,
            config,
        }
    }

    /// Use a different document reader
    pub fn with_reader(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.extractor = ExtractionCoordinator::new(
            Arc::clone(&self.inference),
            reader,
            self.config.clone(),
        );
        self
    }

    /// Use a differently configured confirmation gate
    pub fn with_gate(mut self, gate: ConfirmationGate) -> Self {
        self.gate = gate;
        self
    }

    /// The coordinator runs are registered with
    pub fn coordinator(&self) -> &AbortCoordinator {
        &self.coordinator
    }

    /// The content normalizer
    pub fn normalizer(&self) -> &ContentNormalizer {
        &self.normalizer
    }

    /// Run the whole pipeline for an input set
    ///
    /// With `ack_warning` a stage-1 quality warning is accepted without
    /// asking the user.
    pub async fn run(&self, input: InputSet, ack_warning: bool) -> IngestReport {
        let kind = input.operation_kind();
        let (op, cancel) = self.coordinator.begin_operation(kind);
        info!("Ingest {} started ({})", op, kind);

        let content = match self.normalizer.normalize(input) {
            Ok(content) => content,
            Err(e) => return self.failed(op, e.into(), None, None),
        };
        let display_name = Some(content.display_name.clone());
        self.coordinator.set_status(op, OperationStatus::Running);

        let extraction = match self.extractor.extract(&content, &cancel).await {
            Ok(StageOutcome::Done(result)) => result,
            Ok(StageOutcome::Cancelled) => return self.cancelled(op, None, display_name),
            Err(e) => return self.failed(op, e.into(), None, display_name),
        };

        let extraction = match self.clear_warning(op, extraction, ack_warning, &cancel).await {
            Ok(StageOutcome::Done(result)) => result,
            Ok(StageOutcome::Cancelled) => return self.cancelled(op, None, display_name),
            Err(e) => return self.failed(op, e.into(), None, display_name),
        };

        let descriptors = content.descriptors.clone();
        let report = self
            .structure_and_commit(op, &cancel, extraction, &content.display_name, descriptors)
            .await;
        if matches!(report.outcome, IngestOutcome::Committed(_)) {
            self.normalizer.clear(kind);
        }
        report
    }

    /// Re-run structuring, confirmation and commit on existing stage-1 text
    ///
    /// Runs under a new Operation. Any quality warning on `extraction` is
    /// treated as already acknowledged.
    pub async fn retry_structure(
        &self,
        extraction: ExtractionResult,
        display_name: &str,
    ) -> IngestReport {
        let kind = match extraction.content_kind {
            ContentKind::Text => OperationKind::ExtractText,
            ContentKind::Document | ContentKind::Images => OperationKind::ExtractFile,
        };
        let (op, cancel) = self.coordinator.begin_operation(kind);
        info!("Retrying structuring for '{}' as {}", display_name, op);
        self.coordinator.set_status(op, OperationStatus::Running);

        let descriptors = self
            .normalizer
            .current(kind)
            .filter(|c| c.display_name == display_name)
            .map(|c| c.descriptors.clone())
            .unwrap_or_default();
        let extraction = self.extractor.acknowledge(extraction);
        let report = self
            .structure_and_commit(op, &cancel, extraction, display_name, descriptors)
            .await;
        if matches!(report.outcome, IngestOutcome::Committed(_)) {
            self.normalizer.clear(kind);
        }
        report
    }

    async fn clear_warning(
        &self,
        op: OperationId,
        extraction: ExtractionResult,
        ack_warning: bool,
        cancel: &CancelToken,
    ) -> Result<StageOutcome<ExtractionResult>, GateError> {
        let Some(warning) = extraction.quality_warning.clone() else {
            return Ok(StageOutcome::Done(extraction));
        };
        if ack_warning {
            return Ok(StageOutcome::Done(self.extractor.acknowledge(extraction)));
        }

        self.coordinator.set_status(op, OperationStatus::AwaitingGate);
        let choice = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StageOutcome::Cancelled),
            choice = self
                .interaction
                .resolve_quality_warning(&warning, &extraction.raw_text) => choice?,
        };

        match choice {
            WarningChoice::Continue => {
                self.coordinator.set_status(op, OperationStatus::Running);
                Ok(StageOutcome::Done(self.extractor.acknowledge(extraction)))
            }
            WarningChoice::Cancel => {
                info!("User stopped {} at the quality warning", op);
                Ok(StageOutcome::Cancelled)
            }
        }
    }

    async fn structure_and_commit(
        &self,
        op: OperationId,
        cancel: &CancelToken,
        extraction: ExtractionResult,
        display_name: &str,
        descriptors: Vec<SourceDescriptor>,
    ) -> IngestReport {
        let name = Some(display_name.to_string());

        let structured = self
            .structurer
            .structure(&extraction.raw_text, display_name, extraction.content_kind, cancel)
            .await;
        let mut record = match structured {
            Ok(StageOutcome::Done(record)) => record,
            Ok(StageOutcome::Cancelled) => return self.cancelled(op, Some(extraction), name),
            Err(e) => return self.failed(op, e.into(), Some(extraction), name),
        };
        record.source_descriptors = descriptors;

        self.coordinator.set_status(op, OperationStatus::AwaitingConfirmation);
        let decision = match self.gate.present(record, self.interaction.as_ref(), cancel).await {
            Ok(StageOutcome::Done(decision)) => decision,
            Ok(StageOutcome::Cancelled) => return self.cancelled(op, Some(extraction), name),
            Err(e) => return self.failed(op, e.into(), Some(extraction), name),
        };

        let record = match decision {
            GateDecision::Accepted(record) => record,
            GateDecision::ReturnToEdit(record) => {
                self.coordinator.finish(op, OperationStatus::Completed);
                return IngestReport {
                    operation_id: op,
                    outcome: IngestOutcome::ReturnedToEdit(record),
                    extraction: Some(extraction),
                    display_name: name,
                };
            }
        };

        if cancel.is_cancelled() {
            return self.cancelled(op, Some(extraction), name);
        }

        match self.commit(record) {
            Ok(saved) => {
                self.coordinator.finish(op, OperationStatus::Completed);
                IngestReport {
                    operation_id: op,
                    outcome: IngestOutcome::Committed(saved),
                    extraction: Some(extraction),
                    display_name: name,
                }
            }
            Err(e) => self.failed(op, e.into(), Some(extraction), name),
        }
    }

    fn commit(&self, record: StructuredRecord) -> Result<StructuredRecord, GateError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        self.gate.commit(record, &mut *store)
    }

    fn cancelled(
        &self,
        op: OperationId,
        extraction: Option<ExtractionResult>,
        display_name: Option<String>,
    ) -> IngestReport {
        self.coordinator.finish(op, OperationStatus::Cancelled);
        IngestReport {
            operation_id: op,
            outcome: IngestOutcome::Cancelled,
            extraction,
            display_name,
        }
    }

    fn failed(
        &self,
        op: OperationId,
        error: PipelineError,
        extraction: Option<ExtractionResult>,
        display_name: Option<String>,
    ) -> IngestReport {
        warn!("Ingest {} failed: {}", op, error);
        self.coordinator.fail(op, error.to_string());
        IngestReport {
            operation_id: op,
            outcome: IngestOutcome::Failed(error),
            extraction,
            display_name,
        }
    }
}
