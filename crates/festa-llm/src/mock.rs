//! Deterministic scripted provider for tests and offline runs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use festa_domain::{CancelToken, TopicFocus};
use tokio::sync::{watch, Semaphore};

use crate::error::InferenceError;
use crate::types::{
    ItemAnalysisRequest, ItemAnalysisResponse, RawContestFields, SmartAnalysisRequest,
    SmartAnalysisResponse, StructuredResponse,
};
use crate::{race_cancel, InferenceService};

/// Default transcription, long enough to clear every quality gate
pub const DEFAULT_TRANSCRIPTION: &str =
    "Photography contest announcement. Deadline: 1403/02/10. Topics: Nature, Portrait.";

/// One recorded call to the mock
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceCall {
    /// `extract_text`
    ExtractText {
        /// MIME type of the image
        mime: String,
        /// Image byte length
        bytes: usize,
    },
    /// `extract_structured`
    ExtractStructured {
        /// Stage-1 text
        text: String,
        /// Display name
        display_name: String,
    },
    /// `analyze_item`
    AnalyzeItem {
        /// MIME type of the photo
        mime: String,
        /// Scoring policy
        focus: TopicFocus,
        /// Photographer's note
        note: Option<String>,
    },
    /// `smart_analysis`
    SmartAnalysis {
        /// Contest name
        name: String,
    },
}

#[derive(Default)]
struct MockState {
    texts: VecDeque<Result<String, InferenceError>>,
    structured: VecDeque<Result<StructuredResponse, InferenceError>>,
    items: VecDeque<Result<ItemAnalysisResponse, InferenceError>>,
    analyses: VecDeque<Result<SmartAnalysisResponse, InferenceError>>,
    calls: Vec<InferenceCall>,
}

/// Mock inference service with scripted results
///
/// Each operation has its own queue of results; when a queue is empty a
/// fixed default is returned. Every call is logged. With [`MockInference::gated`]
/// each call additionally waits for a permit from [`MockInference::release`],
/// which lets tests hold a call "in flight" and cancel around it.
///
/// # Examples
///
/// ```
/// use festa_llm::{InferenceError, InferenceService, MockInference};
/// use festa_domain::CancelToken;
///
/// # async fn example() {
/// let mock = MockInference::new();
/// mock.push_text(Ok("first image".to_string()));
/// mock.push_text(Err(InferenceError::Transient("HTTP 503".to_string())));
///
/// let cancel = CancelToken::new();
/// assert_eq!(mock.extract_text(b"img", "image/png", &cancel).await.unwrap(), "first image");
/// assert!(mock.extract_text(b"img", "image/png", &cancel).await.is_err());
/// assert_eq!(mock.call_count(), 2);
/// # }
/// ```
#[derive(Clone)]
pub struct MockInference {
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Semaphore>>,
    started: Arc<watch::Sender<usize>>,
}

impl MockInference {
    /// Create a mock that answers immediately
    pub fn new() -> Self {
        let (started, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            gate: None,
            started: Arc::new(started),
        }
    }

    /// Create a mock whose calls wait for [`MockInference::release`]
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Let `n` gated calls proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Queue a result for `extract_text`
    pub fn push_text(&self, result: Result<String, InferenceError>) {
        self.state().texts.push_back(result);
    }

    /// Queue a result for `extract_structured`
    pub fn push_structured(&self, result: Result<StructuredResponse, InferenceError>) {
        self.state().structured.push_back(result);
    }

    /// Queue a result for `analyze_item`
    pub fn push_item(&self, result: Result<ItemAnalysisResponse, InferenceError>) {
        self.state().items.push_back(result);
    }

    /// Queue a result for `smart_analysis`
    pub fn push_analysis(&self, result: Result<SmartAnalysisResponse, InferenceError>) {
        self.state().analyses.push_back(result);
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<InferenceCall> {
        self.state().calls.clone()
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of `extract_structured` calls made so far
    pub fn structured_call_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, InferenceCall::ExtractStructured { .. }))
            .count()
    }

    /// Wait until at least `n` calls have started
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.started.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    fn record(&self, call: InferenceCall) {
        let count = {
            let mut state = self.state();
            state.calls.push(call);
            state.calls.len()
        };
        self.started.send_replace(count);
    }

    async fn pass_gate(&self) -> Result<(), InferenceError> {
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| InferenceError::Transient(format!("Mock gate closed: {}", e)))?;
            permit.forget();
        }
        Ok(())
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

/// Default analysis returned when no result is scripted
pub fn default_item_analysis() -> ItemAnalysisResponse {
    ItemAnalysisResponse {
        critique: "Fits the contest reasonably well.".to_string(),
        score: Some(5.0),
        score_reasoning: "Relevant subject, average execution.".to_string(),
        editing_notes: None,
    }
}

#[async_trait]
impl InferenceService for MockInference {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract_text(
        &self,
        image: &[u8],
        mime: &str,
        cancel: &CancelToken,
    ) -> Result<String, InferenceError> {
        self.record(InferenceCall::ExtractText {
            mime: mime.to_string(),
            bytes: image.len(),
        });
        race_cancel(cancel, async {
            self.pass_gate().await?;
            self.state()
                .texts
                .pop_front()
                .unwrap_or_else(|| Ok(DEFAULT_TRANSCRIPTION.to_string()))
        })
        .await
    }

    async fn extract_structured(
        &self,
        text: &str,
        display_name: &str,
        cancel: &CancelToken,
    ) -> Result<StructuredResponse, InferenceError> {
        self.record(InferenceCall::ExtractStructured {
            text: text.to_string(),
            display_name: display_name.to_string(),
        });
        race_cancel(cancel, async {
            self.pass_gate().await?;
            self.state().structured.pop_front().unwrap_or_else(|| {
                Ok(StructuredResponse {
                    fields: RawContestFields::default(),
                    sources: Vec::new(),
                })
            })
        })
        .await
    }

    async fn analyze_item(
        &self,
        request: &ItemAnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<ItemAnalysisResponse, InferenceError> {
        self.record(InferenceCall::AnalyzeItem {
            mime: request.mime.clone(),
            focus: request.focus.clone(),
            note: request.note.clone(),
        });
        race_cancel(cancel, async {
            self.pass_gate().await?;
            self.state()
                .items
                .pop_front()
                .unwrap_or_else(|| Ok(default_item_analysis()))
        })
        .await
    }

    async fn smart_analysis(
        &self,
        request: &SmartAnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<SmartAnalysisResponse, InferenceError> {
        self.record(InferenceCall::SmartAnalysis {
            name: request.name.clone(),
        });
        race_cancel(cancel, async {
            self.pass_gate().await?;
            self.state().analyses.pop_front().unwrap_or_else(|| {
                Ok(SmartAnalysisResponse {
                    text: format!("Analysis of {}", request.name),
                    sources: Vec::new(),
                })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_scripted_results_in_order() {
        let mock = MockInference::new();
        mock.push_text(Ok("one".to_string()));
        mock.push_text(Ok("two".to_string()));
        let cancel = CancelToken::new();

        assert_eq!(mock.extract_text(b"a", "image/png", &cancel).await.unwrap(), "one");
        assert_eq!(mock.extract_text(b"bb", "image/png", &cancel).await.unwrap(), "two");
        assert_eq!(
            mock.extract_text(b"c", "image/png", &cancel).await.unwrap(),
            DEFAULT_TRANSCRIPTION
        );
        assert_eq!(
            mock.calls()[1],
            InferenceCall::ExtractText { mime: "image/png".to_string(), bytes: 2 }
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_call_is_aborted() {
        let mock = MockInference::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = mock.extract_text(b"a", "image/png", &cancel).await;
        assert_eq!(result, Err(InferenceError::Aborted));
    }

    #[tokio::test]
    async fn test_gated_call_aborts_on_cancel() {
        let mock = MockInference::gated();
        let cancel = CancelToken::new();

        let task = {
            let mock = mock.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { mock.extract_text(b"a", "image/png", &cancel).await })
        };

        mock.wait_for_calls(1).await;
        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(InferenceError::Aborted));
    }

    #[tokio::test]
    async fn test_gated_call_proceeds_on_release() {
        let mock = MockInference::gated();
        mock.push_text(Ok("released".to_string()));
        let cancel = CancelToken::new();

        let task = {
            let mock = mock.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { mock.extract_text(b"a", "image/png", &cancel).await })
        };

        mock.wait_for_calls(1).await;
        mock.release(1);
        assert_eq!(task.await.unwrap().unwrap(), "released");
    }
}
