//! Festa Domain Layer
//!
//! This crate contains the core model for Festa: the values every other
//! crate passes around, and the trait seams behind which infrastructure
//! lives.
//!
//! ## Key Concepts
//!
//! - **Operation**: One user-initiated, cancellable unit of work
//! - **Abort Coordinator**: Owns cancel handles; one live operation per kind
//! - **ExtractionResult**: Stage-1 text plus an optional quality warning
//! - **StructuredRecord**: The contest facts, with a reconciled deadline pair
//! - **Batch**: Photos scored against a record, with per-item state
//! - **StageOutcome**: Cancellation as a result variant, never an error
//!
//! ## Architecture
//!
//! - No I/O: calendars, text normalization and state machines only
//! - Storage and inference implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abort;
pub mod batch;
pub mod calendar;
pub mod ids;
pub mod operation;
pub mod outcome;
pub mod record;
pub mod text;
pub mod traits;

// Re-exports for convenience
pub use abort::{AbortCoordinator, CancelToken};
pub use batch::{
    Batch, BatchItem, BatchStatus, ItemAnalysis, ItemInput, ItemStatus, TopicFocus, GENERAL_TOPIC,
};
pub use calendar::JalaliDate;
pub use ids::{BatchId, BatchItemId, OperationId, RecordId};
pub use operation::{Operation, OperationKind, OperationStatus};
pub use outcome::{ContentKind, ExtractionResult, QualityWarning, StageOutcome};
pub use record::{
    dedup_attributions, AnalysisContext, Capacity, SourceAttribution, SourceDescriptor,
    StructuredRecord,
};
pub use traits::{BatchStore, RecordQuery, RecordStore};
