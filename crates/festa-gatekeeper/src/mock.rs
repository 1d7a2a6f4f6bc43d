//! Scripted interaction for tests

use async_trait::async_trait;
use festa_domain::QualityWarning;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::{ConfirmChoice, DeadlineReview, GateError, UserInteraction, WarningChoice};

#[derive(Default)]
struct Script {
    warnings: VecDeque<WarningChoice>,
    confirmations: VecDeque<ConfirmChoice>,
    warnings_seen: Vec<QualityWarning>,
    reviews_seen: Vec<DeadlineReview>,
}

/// `UserInteraction` that replays queued answers
///
/// An empty queue answers `Continue` / `Accept`. A hanging instance never
/// answers a confirmation, which lets tests cancel while the gate waits.
#[derive(Clone, Default)]
pub struct ScriptedInteraction {
    script: Arc<Mutex<Script>>,
    hang_on_confirm: bool,
}

impl ScriptedInteraction {
    /// Answer everything affirmatively
    pub fn new() -> Self {
        Self::default()
    }

    /// Never answer a deadline confirmation
    pub fn hanging() -> Self {
        Self {
            hang_on_confirm: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an answer to the next quality warning
    pub fn push_warning(&self, choice: WarningChoice) -> &Self {
        self.lock().warnings.push_back(choice);
        self
    }

    /// Queue an answer to the next deadline confirmation
    pub fn push_confirmation(&self, choice: ConfirmChoice) -> &Self {
        self.lock().confirmations.push_back(choice);
        self
    }

    /// Quality warnings shown so far
    pub fn warnings_seen(&self) -> Vec<QualityWarning> {
        self.lock().warnings_seen.clone()
    }

    /// Deadline reviews shown so far
    pub fn reviews_seen(&self) -> Vec<DeadlineReview> {
        self.lock().reviews_seen.clone()
    }
}

#[async_trait]
impl UserInteraction for ScriptedInteraction {
    async fn resolve_quality_warning(
        &self,
        warning: &QualityWarning,
        _raw_text: &str,
    ) -> Result<WarningChoice, GateError> {
        let mut script = self.lock();
        script.warnings_seen.push(warning.clone());
        Ok(script.warnings.pop_front().unwrap_or(WarningChoice::Continue))
    }

    async fn confirm_deadline(&self, review: &DeadlineReview) -> Result<ConfirmChoice, GateError> {
        let next = {
            let mut script = self.lock();
            script.reviews_seen.push(review.clone());
            script.confirmations.pop_front()
        };
        if self.hang_on_confirm {
            std::future::pending::<()>().await;
        }
        Ok(next.unwrap_or(ConfirmChoice::Accept))
    }
}
