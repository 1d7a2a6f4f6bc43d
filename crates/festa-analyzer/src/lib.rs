//! Festa Analyzer
//!
//! Scores contest photos against a structured record.
//!
//! # Overview
//!
//! Analysis happens in two steps:
//! - **Context**: the contest is researched once (`ContextBuilder`), producing
//!   an `AnalysisContext` that is saved on the record
//! - **Batch**: photos are scored one by one against the record and its
//!   context (`BatchAnalyzer`), each getting a critique, a 0..=10 score and,
//!   for strong photos only, editing notes
//!
//! Both run under an operation of their own kind, so starting a new batch
//! cancels the one in flight and leaves extraction alone.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use festa_analyzer::{AnalyzerConfig, BatchAnalyzer, ContextBuilder};
//! use festa_domain::{AbortCoordinator, ItemInput, StageOutcome, StructuredRecord, TopicFocus};
//! use festa_llm::MockInference;
//!
//! # async fn example(mut record: StructuredRecord, photos: Vec<ItemInput>) -> Result<(), Box<dyn std::error::Error>> {
//! let inference = Arc::new(MockInference::new());
//! let coordinator = AbortCoordinator::new();
//!
//! let builder = ContextBuilder::new(inference.clone(), AnalyzerConfig::default());
//! if let StageOutcome::Done(context) = builder.run(&coordinator, &record, None).await?.outcome {
//!     record.smart_analysis = Some(context);
//! }
//!
//! let mut analyzer = BatchAnalyzer::default_config(inference);
//! if let Some(context) = &record.smart_analysis {
//!     let run = analyzer
//!         .analyze(&coordinator, &record, photos, context, TopicFocus::Holistic)
//!         .await?;
//!     println!("{}", run.batch.status());
//! }
//! println!("{}", analyzer.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! max_items = 10
//! editing_notes_threshold = 7.0
//! item_timeout_secs = 90
//! context_timeout_secs = 180
//! ```

#![warn(missing_docs)]

mod analyzer;
mod config;
mod context;
mod error;
mod metrics;

pub use analyzer::{clamp_score, BatchAnalyzer, BatchRun, CANCELLED_MESSAGE, MAX_SCORE};
pub use config::AnalyzerConfig;
pub use context::{ContextBuilder, ContextRun};
pub use error::AnalyzerError;
pub use metrics::AnalyzerMetrics;
