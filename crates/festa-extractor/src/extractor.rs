//! Stage 1: raw text extraction
//!
//! Documents are read locally, images are transcribed one at a time by the
//! inference service, and pasted text passes through. The joined text then
//! goes through the quality gate.

use std::future::Future;
use std::sync::Arc;

use festa_domain::{CancelToken, ContentKind, ExtractionResult, QualityWarning, StageOutcome};
use festa_llm::{InferenceError, InferenceService};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::content::{InputFile, NormalizedContent, Payload};
use crate::document::DocumentReader;
use crate::{ExtractionError, ExtractorConfig};

/// Runs stage 1 for a normalized content set
pub struct ExtractionCoordinator {
    inference: Arc<dyn InferenceService>,
    reader: Arc<dyn DocumentReader>,
    config: ExtractorConfig,
}

impl ExtractionCoordinator {
    /// Create a coordinator
    pub fn new(
        inference: Arc<dyn InferenceService>,
        reader: Arc<dyn DocumentReader>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            inference,
            reader,
            config,
        }
    }

    /// Extract raw text and apply the quality gate
    pub async fn extract(
        &self,
        content: &NormalizedContent,
        cancel: &CancelToken,
    ) -> Result<StageOutcome<ExtractionResult>, ExtractionError> {
        if cancel.is_cancelled() {
            return Ok(StageOutcome::Cancelled);
        }

        let per_input_texts = match &content.payload {
            Payload::Document(file) => match self.read_document(file, cancel).await? {
                StageOutcome::Done(text) => vec![text],
                StageOutcome::Cancelled => return Ok(StageOutcome::Cancelled),
            },
            Payload::Images(images) => match self.transcribe_images(images, cancel).await? {
                StageOutcome::Done(texts) => texts,
                StageOutcome::Cancelled => return Ok(StageOutcome::Cancelled),
            },
            Payload::Text(text) => vec![text.clone()],
        };

        let raw_text = per_input_texts.join(&self.config.image_separator);
        let mut result = ExtractionResult {
            raw_text,
            per_input_texts,
            content_kind: content.kind,
            quality_warning: None,
        };
        result.quality_warning = self.quality_check(&result);

        if let Some(warning) = &result.quality_warning {
            warn!(
                "Short text from '{}': {} of {} chars",
                content.display_name, warning.actual_chars, warning.threshold_chars
            );
        } else {
            info!(
                "Extracted {} chars from '{}'",
                result.trimmed_chars(),
                content.display_name
            );
        }
        Ok(StageOutcome::Done(result))
    }

    /// Clear the quality warning so structuring may proceed on the same text
    pub fn acknowledge(&self, mut result: ExtractionResult) -> ExtractionResult {
        if let Some(warning) = result.quality_warning.take() {
            info!(
                "Quality warning acknowledged ({} chars)",
                warning.actual_chars
            );
        }
        result
    }

    /// Warning for text below its kind's threshold
    pub fn quality_check(&self, result: &ExtractionResult) -> Option<QualityWarning> {
        let (threshold, reason) = match result.content_kind {
            ContentKind::Images => (
                self.config.min_image_text_chars,
                "Very little text was extracted from the image(s); they may not be a contest announcement",
            ),
            ContentKind::Text => (
                self.config.min_input_text_chars,
                "The text is very short and may not contain enough information",
            ),
            ContentKind::Document => return None,
        };
        let actual = result.trimmed_chars();
        (actual < threshold).then(|| QualityWarning {
            reason: reason.to_string(),
            threshold_chars: threshold,
            actual_chars: actual,
        })
    }

    async fn read_document(
        &self,
        file: &InputFile,
        cancel: &CancelToken,
    ) -> Result<StageOutcome<String>, ExtractionError> {
        let reader = Arc::clone(&self.reader);
        let bytes = file.bytes.clone();
        let read = async {
            tokio::task::spawn_blocking(move || reader.read_text(&bytes))
                .await
                .map_err(|e| ExtractionError::Document(format!("Reader task failed: {}", e)))?
        };
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StageOutcome::Cancelled),
            text = self.timed("document read", read) => text?,
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        debug!("Read {} chars from '{}'", text.chars().count(), file.name);
        Ok(StageOutcome::Done(text))
    }

    async fn transcribe_images(
        &self,
        images: &[InputFile],
        cancel: &CancelToken,
    ) -> Result<StageOutcome<Vec<String>>, ExtractionError> {
        let mut texts = Vec::with_capacity(images.len());

        for (idx, image) in images.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(StageOutcome::Cancelled);
            }
            debug!("Transcribing image {}/{} '{}'", idx + 1, images.len(), image.name);

            let call = async {
                self.inference
                    .extract_text(&image.bytes, &image.mime, cancel)
                    .await
                    .map_err(ExtractionError::from)
            };
            match self.timed("image transcription", call).await {
                Ok(text) => texts.push(text),
                Err(ExtractionError::Inference(InferenceError::Aborted)) => {
                    return Ok(StageOutcome::Cancelled)
                }
                Err(e) => {
                    warn!("Transcription of '{}' failed: {}", image.name, e);
                    return Err(e);
                }
            }

            // A response that lands after cancellation is discarded
            if cancel.is_cancelled() {
                return Ok(StageOutcome::Cancelled);
            }
        }
        Ok(StageOutcome::Done(texts))
    }

    async fn timed<T, F>(&self, stage: &'static str, fut: F) -> Result<T, ExtractionError>
    where
        F: Future<Output = Result<T, ExtractionError>>,
    {
        timeout(self.config.stage_timeout(), fut)
            .await
            .map_err(|_| ExtractionError::Timeout {
                stage,
                secs: self.config.stage_timeout_secs,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentNormalizer, InputSet};
    use festa_llm::{InferenceCall, MockInference};

    struct FixedReader(&'static str);

    impl DocumentReader for FixedReader {
        fn read_text(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    fn coordinator(mock: &MockInference, reader: &'static str) -> ExtractionCoordinator {
        ExtractionCoordinator::new(
            Arc::new(mock.clone()),
            Arc::new(FixedReader(reader)),
            ExtractorConfig::default(),
        )
    }

    fn images(n: usize) -> NormalizedContent {
        let files = (0..n)
            .map(|i| InputFile::new(format!("{}.png", i), "image/png", vec![i as u8; 4]))
            .collect();
        let normalizer = ContentNormalizer::new(10);
        (*normalizer.normalize(InputSet::Files(files)).unwrap()).clone()
    }

    fn text(s: &str) -> NormalizedContent {
        let normalizer = ContentNormalizer::new(10);
        (*normalizer.normalize(InputSet::Text(s.to_string())).unwrap()).clone()
    }

    fn document() -> NormalizedContent {
        let normalizer = ContentNormalizer::new(10);
        let file = InputFile::new("call.pdf", "application/pdf", b"%PDF".to_vec());
        (*normalizer.normalize(InputSet::Files(vec![file])).unwrap()).clone()
    }

    #[tokio::test]
    async fn test_images_joined_in_order() {
        let mock = MockInference::new();
        mock.push_text(Ok("First page of the announcement".to_string()));
        mock.push_text(Ok("Second page with the deadline".to_string()));

        let result = coordinator(&mock, "")
            .extract(&images(2), &CancelToken::new())
            .await
            .unwrap()
            .done()
            .unwrap();

        assert_eq!(
            result.raw_text,
            "First page of the announcement\n\n--- next image ---\n\nSecond page with the deadline"
        );
        assert_eq!(result.per_input_texts.len(), 2);
        assert!(result.is_cleared());
        assert_eq!(
            mock.calls()[1],
            InferenceCall::ExtractText { mime: "image/png".to_string(), bytes: 4 }
        );
    }

    #[tokio::test]
    async fn test_short_image_text_warns() {
        let mock = MockInference::new();
        mock.push_text(Ok("logo".to_string()));

        let result = coordinator(&mock, "")
            .extract(&images(1), &CancelToken::new())
            .await
            .unwrap()
            .done()
            .unwrap();
        let warning = result.quality_warning.clone().unwrap();
        assert_eq!(warning.threshold_chars, 30);
        assert_eq!(warning.actual_chars, 4);

        let acknowledged = coordinator(&mock, "").acknowledge(result.clone());
        assert!(acknowledged.is_cleared());
        assert_eq!(acknowledged.raw_text, result.raw_text);
    }

    #[tokio::test]
    async fn test_text_threshold_is_fifty() {
        let mock = MockInference::new();
        let c = coordinator(&mock, "");

        let short = c.extract(&text(&"a".repeat(49)), &CancelToken::new()).await.unwrap();
        assert!(short.done().unwrap().quality_warning.is_some());

        let enough = c.extract(&text(&"a".repeat(50)), &CancelToken::new()).await.unwrap();
        assert!(enough.done().unwrap().is_cleared());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_image_fails_whole_extraction() {
        let mock = MockInference::new();
        mock.push_text(Ok("first".to_string()));
        mock.push_text(Err(InferenceError::Transient("HTTP 503".to_string())));

        let result = coordinator(&mock, "")
            .extract(&images(3), &CancelToken::new())
            .await;
        assert!(matches!(
            result,
            Err(ExtractionError::Inference(InferenceError::Transient(_)))
        ));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancel_mid_images_stops_calls() {
        let mock = MockInference::gated();
        let c = Arc::new(coordinator(&mock, ""));
        let cancel = CancelToken::new();

        let task = {
            let c = Arc::clone(&c);
            let cancel = cancel.clone();
            tokio::spawn(async move { c.extract(&images(3), &cancel).await })
        };

        mock.release(1);
        mock.wait_for_calls(2).await;
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_is_hard_error() {
        let mock = MockInference::new();
        let result = coordinator(&mock, "   \n").extract(&document(), &CancelToken::new()).await;
        assert!(matches!(result, Err(ExtractionError::EmptyDocument)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_document_has_no_quality_gate() {
        let mock = MockInference::new();
        let result = coordinator(&mock, "short")
            .extract(&document(), &CancelToken::new())
            .await
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(result.raw_text, "short");
        assert!(result.is_cleared());
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_calls() {
        let mock = MockInference::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = coordinator(&mock, "").extract(&images(2), &cancel).await.unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(mock.call_count(), 0);
    }
}
