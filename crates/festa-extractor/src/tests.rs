//! Pipeline tests

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use festa_domain::traits::{RecordQuery, RecordStore};
    use festa_domain::{
        AbortCoordinator, OperationKind, OperationStatus, RecordId, StructuredRecord,
    };
    use festa_gatekeeper::{ConfirmChoice, GateError, ScriptedInteraction, WarningChoice};
    use festa_llm::{InferenceError, MockInference, RawContestFields, StructuredResponse};
    use festa_store::{MemoryStore, StoreError};

    use crate::{
        ExtractionError, ExtractorConfig, IngestOutcome, IngestPipeline, InputFile, InputSet,
        PipelineError,
    };

    const ANNOUNCEMENT: &str =
        "Third national photography festival. Topics: nature, portrait. Deadline 1403/02/10.";

    fn fields_with_deadline() -> StructuredResponse {
        StructuredResponse {
            fields: RawContestFields {
                name: Some("National Photo Festival".to_string()),
                topics: Some("nature, portrait".to_string()),
                deadline_persian: Some("1403/02/10".to_string()),
                ..Default::default()
            },
            sources: Vec::new(),
        }
    }

    fn pipeline_with<S: RecordStore + Send>(
        mock: &MockInference,
        ui: &ScriptedInteraction,
        store: S,
    ) -> (IngestPipeline<S>, Arc<Mutex<S>>)
    where
        S::Error: std::fmt::Display,
    {
        let store = Arc::new(Mutex::new(store));
        let pipeline = IngestPipeline::new(
            Arc::new(mock.clone()),
            Arc::new(ui.clone()),
            Arc::clone(&store),
            AbortCoordinator::new(),
            ExtractorConfig::default(),
        );
        (pipeline, store)
    }

    fn images(n: usize) -> InputSet {
        InputSet::Files(
            (0..n)
                .map(|i| InputFile::new(format!("page{}.jpg", i + 1), "image/jpeg", vec![0xFF; 16]))
                .collect(),
        )
    }

    fn status(pipeline: &IngestPipeline<MemoryStore>, id: festa_domain::OperationId) -> OperationStatus {
        pipeline.coordinator().snapshot(id).unwrap().status
    }

    #[tokio::test]
    async fn test_text_ingest_commits_record() {
        let mock = MockInference::new();
        mock.push_structured(Ok(fields_with_deadline()));
        let ui = ScriptedInteraction::new();
        let (pipeline, store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let report = pipeline.run(InputSet::Text(ANNOUNCEMENT.to_string()), false).await;

        let IngestOutcome::Committed(record) = report.outcome else {
            panic!("expected commit");
        };
        assert_eq!(record.display_name, "pasted-text.txt");
        assert_eq!(record.raw_text, ANNOUNCEMENT);
        assert_eq!(record.deadline_gregorian(), Some("2024-04-29"));
        assert_eq!(ui.reviews_seen().len(), 1);
        assert_eq!(store.lock().unwrap().len(), 1);
        assert_eq!(status(&pipeline, report.operation_id), OperationStatus::Completed);
        assert!(pipeline.normalizer().current(OperationKind::ExtractText).is_none());
    }

    #[tokio::test]
    async fn test_short_image_text_stops_before_structuring() {
        let mock = MockInference::new();
        mock.push_text(Ok("logo".to_string()));
        let ui = ScriptedInteraction::new();
        ui.push_warning(WarningChoice::Cancel);
        let (pipeline, store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let report = pipeline.run(images(1), false).await;

        assert!(matches!(report.outcome, IngestOutcome::Cancelled));
        assert_eq!(mock.structured_call_count(), 0);
        assert_eq!(ui.warnings_seen()[0].actual_chars, 4);
        assert!(store.lock().unwrap().is_empty());
        assert_eq!(status(&pipeline, report.operation_id), OperationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_short_text_continues_after_user_agrees() {
        let mock = MockInference::new();
        let ui = ScriptedInteraction::new();
        ui.push_warning(WarningChoice::Continue);
        let (pipeline, _store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let report = pipeline.run(InputSet::Text("Deadline 1403/02/10".to_string()), false).await;

        assert!(matches!(report.outcome, IngestOutcome::Committed(_)));
        assert_eq!(ui.warnings_seen().len(), 1);
        assert_eq!(mock.structured_call_count(), 1);
    }

    #[tokio::test]
    async fn test_acknowledged_warning_skips_prompt() {
        let mock = MockInference::new();
        mock.push_text(Ok("logo".to_string()));
        let ui = ScriptedInteraction::new();
        let (pipeline, _store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let report = pipeline.run(images(1), true).await;

        assert!(matches!(report.outcome, IngestOutcome::Committed(_)));
        assert!(ui.warnings_seen().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_on_second_image_fails_run() {
        let mock = MockInference::new();
        mock.push_text(Ok("Page one of the announcement text".to_string()));
        mock.push_text(Err(InferenceError::Transient("HTTP 503".to_string())));
        let ui = ScriptedInteraction::new();
        let (pipeline, store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let report = pipeline.run(images(3), false).await;

        let IngestOutcome::Failed(error) = &report.outcome else {
            panic!("expected failure");
        };
        assert!(error.is_retryable());
        assert!(report.extraction.is_none());
        assert_eq!(mock.call_count(), 2);
        assert!(store.lock().unwrap().is_empty());

        let op = pipeline.coordinator().snapshot(report.operation_id).unwrap();
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.error.as_deref(), Some(error.to_string().as_str()));
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_calls() {
        let mock = MockInference::new();
        let ui = ScriptedInteraction::new();
        let (pipeline, _store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let mixed = InputSet::Files(vec![
            InputFile::new("a.pdf", "application/pdf", vec![1]),
            InputFile::new("b.jpg", "image/jpeg", vec![1]),
        ]);
        let report = pipeline.run(mixed, false).await;

        assert!(matches!(
            report.outcome,
            IngestOutcome::Failed(PipelineError::Extraction(
                ExtractionError::InvalidInputComposition(_)
            ))
        ));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_new_run_cancels_previous_of_same_kind() {
        let mock = MockInference::gated();
        let ui = ScriptedInteraction::new();
        let (pipeline, store) = pipeline_with(&mock, &ui, MemoryStore::new());
        let pipeline = Arc::new(pipeline);

        let first = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.run(images(2), false).await })
        };
        mock.wait_for_calls(1).await;

        let second = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.run(images(1), false).await })
        };

        let first = first.await.unwrap();
        assert!(matches!(first.outcome, IngestOutcome::Cancelled));
        assert_eq!(status(&pipeline, first.operation_id), OperationStatus::Cancelled);

        mock.release(10);
        let second = second.await.unwrap();
        assert!(matches!(second.outcome, IngestOutcome::Committed(_)));
        assert_eq!(store.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_confirmation_saves_nothing() {
        let mock = MockInference::new();
        mock.push_structured(Ok(fields_with_deadline()));
        let ui = ScriptedInteraction::hanging();
        let (pipeline, store) = pipeline_with(&mock, &ui, MemoryStore::new());
        let pipeline = Arc::new(pipeline);

        let task = {
            let pipeline = Arc::clone(&pipeline);
            let input = InputSet::Text(ANNOUNCEMENT.to_string());
            tokio::spawn(async move { pipeline.run(input, false).await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            while ui.reviews_seen().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("confirmation was never requested");

        assert!(pipeline.coordinator().cancel_kind(OperationKind::ExtractText));
        let report = task.await.unwrap();

        assert!(matches!(report.outcome, IngestOutcome::Cancelled));
        assert!(store.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_choice_returns_record_unsaved() {
        let mock = MockInference::new();
        mock.push_structured(Ok(fields_with_deadline()));
        let ui = ScriptedInteraction::new();
        ui.push_confirmation(ConfirmChoice::Edit);
        let (pipeline, store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let report = pipeline.run(InputSet::Text(ANNOUNCEMENT.to_string()), false).await;

        assert!(matches!(report.outcome, IngestOutcome::ReturnedToEdit(_)));
        assert_eq!(status(&pipeline, report.operation_id), OperationStatus::Completed);
        assert!(store.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_structure_reuses_stage_one_text() {
        let mock = MockInference::new();
        mock.push_text(Ok("A long enough transcription of the poster".to_string()));
        mock.push_structured(Err(InferenceError::InvalidResponse("not JSON".to_string())));
        mock.push_structured(Ok(fields_with_deadline()));
        let ui = ScriptedInteraction::new();
        let (pipeline, store) = pipeline_with(&mock, &ui, MemoryStore::new());

        let failed = pipeline.run(images(1), false).await;
        let IngestOutcome::Failed(error) = &failed.outcome else {
            panic!("expected structuring failure");
        };
        assert!(error.is_retryable());

        let extraction = failed.extraction.clone().unwrap();
        let display_name = failed.display_name.clone().unwrap();
        let retried = pipeline.retry_structure(extraction, &display_name).await;

        let IngestOutcome::Committed(record) = retried.outcome else {
            panic!("expected commit after retry");
        };
        assert_eq!(record.display_name, "page1.jpg");
        assert_eq!(record.source_descriptors.len(), 1);
        assert_eq!(mock.structured_call_count(), 2);
        assert_eq!(store.lock().unwrap().len(), 1);
    }

    struct FailingStore;

    impl RecordStore for FailingStore {
        type Error = StoreError;

        fn create(&mut self, _record: StructuredRecord) -> Result<RecordId, Self::Error> {
            Err(StoreError::InvalidData("read-only database".to_string()))
        }

        fn update(&mut self, _record: StructuredRecord) -> Result<(), Self::Error> {
            Err(StoreError::InvalidData("read-only database".to_string()))
        }

        fn delete(&mut self, _id: RecordId) -> Result<bool, Self::Error> {
            Ok(false)
        }

        fn get(&self, _id: RecordId) -> Result<Option<StructuredRecord>, Self::Error> {
            Ok(None)
        }

        fn list(&self, _query: &RecordQuery) -> Result<Vec<StructuredRecord>, Self::Error> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_record() {
        let mock = MockInference::new();
        mock.push_structured(Ok(fields_with_deadline()));
        let ui = ScriptedInteraction::new();
        let (pipeline, _store) = pipeline_with(&mock, &ui, FailingStore);

        let report = pipeline.run(InputSet::Text(ANNOUNCEMENT.to_string()), false).await;

        let IngestOutcome::Failed(PipelineError::Gate(error)) = report.outcome else {
            panic!("expected persistence failure");
        };
        assert!(error.is_retryable());
        assert!(matches!(error, GateError::Persistence { .. }));
        let record = error.into_record().unwrap();
        assert_eq!(record.name.as_deref(), Some("National Photo Festival"));
    }
}
