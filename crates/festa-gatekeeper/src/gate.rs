//! Confirmation gate
//!
//! The last stop before a record is saved. When the record carries a deadline
//! the user confirms it; the gate has no timeout and only cancellation can
//! interrupt the wait.

use festa_domain::traits::RecordStore;
use festa_domain::{CancelToken, StageOutcome, StructuredRecord};
use tracing::{debug, info, warn};

use crate::{
    ConfirmChoice, DeadlineReview, GateConfig, GateError, ReviewNote, ReviewStatus, UserInteraction,
};

/// What the user decided about a record
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Ready to commit
    Accepted(StructuredRecord),
    /// The user wants to edit before saving
    ReturnToEdit(StructuredRecord),
}

/// Reviews deadlines with the user and commits accepted records
pub struct ConfirmationGate {
    config: GateConfig,
}

impl ConfirmationGate {
    /// Create a gate with the given configuration
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Create a gate with default configuration
    pub fn default_config() -> Self {
        Self::new(GateConfig::default())
    }

    /// Review a record's deadline relative to today
    pub fn review(&self, record: &StructuredRecord) -> DeadlineReview {
        DeadlineReview::with_config(record, &self.config, chrono::Local::now().date_naive())
    }

    /// Ask the user to confirm the record's deadline
    ///
    /// Records without a deadline pass straight through. Cancellation while
    /// waiting abandons the record.
    pub async fn present(
        &self,
        mut record: StructuredRecord,
        interaction: &dyn UserInteraction,
        cancel: &CancelToken,
    ) -> Result<StageOutcome<GateDecision>, GateError> {
        if !record.has_deadline() {
            debug!("Record {} has no deadline; skipping confirmation", record.id);
            return Ok(StageOutcome::Done(GateDecision::Accepted(record)));
        }

        let mut review = self.review(&record);
        let mut rejected = 0u32;

        loop {
            if cancel.is_cancelled() {
                info!("Confirmation of record {} cancelled", record.id);
                return Ok(StageOutcome::Cancelled);
            }

            let choice = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Confirmation of record {} cancelled", record.id);
                    return Ok(StageOutcome::Cancelled);
                }
                choice = interaction.confirm_deadline(&review) => choice?,
            };

            match choice {
                ConfirmChoice::Accept => {
                    review.apply(&mut record).map_err(GateError::Config)?;
                    info!("Deadline of record {} accepted", record.id);
                    return Ok(StageOutcome::Done(GateDecision::Accepted(record)));
                }
                ConfirmChoice::Edit => {
                    info!("Record {} returned to editing", record.id);
                    return Ok(StageOutcome::Done(GateDecision::ReturnToEdit(record)));
                }
                ConfirmChoice::Amend { persian, gregorian } => {
                    match amend(&record, persian.as_deref(), gregorian.as_deref()) {
                        Ok(amended) => {
                            info!(
                                "Deadline of record {} amended to {}",
                                amended.id,
                                amended.deadline_persian().unwrap_or("none")
                            );
                            return Ok(StageOutcome::Done(GateDecision::Accepted(amended)));
                        }
                        Err(reason) => {
                            rejected += 1;
                            warn!(
                                "Rejected deadline amendment ({}/{}): {}",
                                rejected, self.config.max_amend_attempts, reason
                            );
                            if rejected >= self.config.max_amend_attempts {
                                return Ok(StageOutcome::Done(GateDecision::ReturnToEdit(record)));
                            }
                            review = self.review(&record);
                            review.notes.push(ReviewNote::RejectedAmendment(reason));
                            review.status = ReviewStatus::NeedsAttention;
                        }
                    }
                }
            }
        }
    }

    /// Save a record, creating it or overwriting the stored version
    ///
    /// On failure the record travels back inside the error.
    pub fn commit<S: RecordStore>(
        &self,
        mut record: StructuredRecord,
        store: &mut S,
    ) -> Result<StructuredRecord, GateError>
    where
        S::Error: std::fmt::Display,
    {
        record.touch();

        let exists = match store.get(record.id) {
            Ok(found) => found.is_some(),
            Err(e) => return Err(persistence(e, record)),
        };

        let written = if exists {
            store.update(record.clone())
        } else {
            store.create(record.clone()).map(|_| ())
        };

        match written {
            Ok(()) => {
                info!(
                    "{} record {} '{}'",
                    if exists { "Updated" } else { "Saved" },
                    record.id,
                    record.label()
                );
                Ok(record)
            }
            Err(e) => Err(persistence(e, record)),
        }
    }
}

fn persistence<E: std::fmt::Display>(error: E, record: StructuredRecord) -> GateError {
    warn!("Failed to save record {}: {}", record.id, error);
    GateError::Persistence {
        message: error.to_string(),
        record: Box::new(record),
    }
}

/// Apply an amendment: the Jalali date wins, the Gregorian one is the fallback
fn amend(
    record: &StructuredRecord,
    persian: Option<&str>,
    gregorian: Option<&str>,
) -> Result<StructuredRecord, String> {
    let persian = persian.map(str::trim).filter(|s| !s.is_empty());
    let gregorian = gregorian.map(str::trim).filter(|s| !s.is_empty());

    let mut amended = record.clone();

    // A typed Jalali date is authoritative; when invalid the Gregorian one is not consulted
    match (persian, gregorian) {
        (Some(p), _) => amended.set_deadline_persian(p)?,
        (None, Some(g)) => amended.set_deadline_gregorian(g)?,
        (None, None) => return Err("no date given".to_string()),
    }
    Ok(amended)
}
