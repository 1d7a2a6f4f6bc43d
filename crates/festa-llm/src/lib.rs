//! Festa Inference Layer
//!
//! The seam between the pipeline and the external inference service.
//!
//! # Architecture
//!
//! The pipeline only ever talks to the [`InferenceService`] trait. It has one
//! method per logical operation:
//!
//! - `extract_text`: transcribe one image
//! - `extract_structured`: turn stage-1 text into contest fields
//! - `analyze_item`: score one photo against an analysis context
//! - `smart_analysis`: produce the analysis context for a contest
//!
//! Every method takes the caller's [`CancelToken`] and returns
//! [`InferenceError::Aborted`] if it fires while the call is in flight. The
//! in-flight HTTP request is dropped at that point; its response, if any, is
//! never seen.
//!
//! # Providers
//!
//! - `MockInference`: Deterministic scripted provider for testing
//! - `GeminiProvider`: Gemini REST API integration

#![warn(missing_docs)]

mod config;
mod error;
pub mod gemini;
pub mod mock;
mod parse;
mod prompt;
mod types;

use std::future::Future;

use async_trait::async_trait;
use festa_domain::CancelToken;

pub use config::GeminiConfig;
pub use error::InferenceError;
pub use gemini::GeminiProvider;
pub use mock::{InferenceCall, MockInference};
pub use parse::strip_code_fence;
pub use types::{
    ItemAnalysisRequest, ItemAnalysisResponse, RawCapacity, RawContestFields,
    SmartAnalysisRequest, SmartAnalysisResponse, StructuredResponse,
};

/// The external inference service
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Transcribe all visible text in one image
    async fn extract_text(
        &self,
        image: &[u8],
        mime: &str,
        cancel: &CancelToken,
    ) -> Result<String, InferenceError>;

    /// Extract contest fields from stage-1 text
    async fn extract_structured(
        &self,
        text: &str,
        display_name: &str,
        cancel: &CancelToken,
    ) -> Result<StructuredResponse, InferenceError>;

    /// Score one photo against a contest analysis
    async fn analyze_item(
        &self,
        request: &ItemAnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<ItemAnalysisResponse, InferenceError>;

    /// Produce the analysis context for a contest
    async fn smart_analysis(
        &self,
        request: &SmartAnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<SmartAnalysisResponse, InferenceError>;
}

/// Run `fut` unless `cancel` fires first
///
/// Cancellation wins ties, so an already-cancelled token never starts the
/// request.
pub async fn race_cancel<T, F>(cancel: &CancelToken, fut: F) -> Result<T, InferenceError>
where
    F: Future<Output = Result<T, InferenceError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InferenceError::Aborted),
        result = fut => result,
    }
}
