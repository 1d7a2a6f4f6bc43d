//! Festa Extractor
//!
//! Turns a contest announcement (one PDF, a handful of photos of a poster, or
//! pasted text) into a confirmed, saved `StructuredRecord`.
//!
//! # Architecture
//!
//! ```text
//! InputSet → ContentNormalizer → ExtractionCoordinator → quality gate
//!          → Structurer → ConfirmationGate → RecordStore
//! ```
//!
//! # Key Features
//!
//! - **Input validation**: one PDF, 1..N images or non-blank text, rejected
//!   before any network call
//! - **Sequential transcription**: one image at a time, in user order
//! - **Quality gate**: short stage-1 text halts the run until the user decides
//! - **Normalization**: digits, Persian letters, topics, capacity, links and
//!   the Jalali/Gregorian deadline pair
//! - **Cancellation**: every stage returns `StageOutcome::Cancelled` instead of
//!   an error when its operation is cancelled
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use festa_domain::AbortCoordinator;
//! use festa_extractor::{ExtractorConfig, IngestOutcome, IngestPipeline, InputSet};
//! use festa_gatekeeper::ScriptedInteraction;
//! use festa_llm::MockInference;
//! use festa_store::MemoryStore;
//!
//! # async fn example() {
//! let pipeline = IngestPipeline::new(
//!     Arc::new(MockInference::new()),
//!     Arc::new(ScriptedInteraction::new()),
//!     Arc::new(Mutex::new(MemoryStore::new())),
//!     AbortCoordinator::new(),
//!     ExtractorConfig::default(),
//! );
//!
//! let report = pipeline
//!     .run(InputSet::Text("Photo contest, deadline 1403/02/10 ...".to_string()), false)
//!     .await;
//! if let IngestOutcome::Committed(record) = report.outcome {
//!     println!("Saved {}", record.label());
//! }
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;

pub mod content;
pub mod document;
pub mod extractor;
pub mod pipeline;
pub mod structurer;

#[cfg(test)]
mod tests;

pub use config::{ExtractorConfig, DEFAULT_IMAGE_SEPARATOR};
pub use content::{ContentNormalizer, InputFile, InputSet, NormalizedContent, Payload};
pub use document::{DocumentReader, LopdfReader};
pub use error::ExtractionError;
pub use extractor::ExtractionCoordinator;
pub use pipeline::{IngestOutcome, IngestPipeline, IngestReport, PipelineError};
pub use structurer::Structurer;
