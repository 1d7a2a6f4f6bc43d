//! Festa Gatekeeper
//!
//! The confirmation step between structured extraction and storage.
//!
//! The gatekeeper provides:
//! - Deadline pair reconciliation (derive the missing side, Jalali wins on
//!   disagreement)
//! - Soft review notes (implausible year, past deadline, discarded dates)
//! - The `UserInteraction` seam through which the pipeline asks the user
//! - Commit of accepted records to any `RecordStore`
//!
//! # Examples
//!
//! ```no_run
//! use festa_gatekeeper::{ConfirmationGate, GateConfig};
//!
//! let gate = ConfirmationGate::new(GateConfig::default());
//!
//! // Confirm with the user, then save
//! // let decision = gate.present(record, &interaction, &cancel).await?;
//! // let saved = gate.commit(record, &mut store)?;
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod gate;
mod interaction;
mod mock;
mod review;

pub use config::GateConfig;
pub use error::GateError;
pub use gate::{ConfirmationGate, GateDecision};
pub use interaction::{ConfirmChoice, UserInteraction, WarningChoice};
pub use mock::ScriptedInteraction;
pub use review::{DeadlineReview, ReviewNote, ReviewStatus};
