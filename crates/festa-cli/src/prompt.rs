//! Terminal prompts for the questions the pipeline asks.

use async_trait::async_trait;
use festa_domain::QualityWarning;
use festa_gatekeeper::{ConfirmChoice, DeadlineReview, GateError, UserInteraction, WarningChoice};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::output::Formatter;

/// Characters of extracted text shown next to a quality warning
const PREVIEW_CHARS: usize = 200;

/// What the user typed at the deadline prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineAction {
    /// Keep the deadline
    Accept,
    /// Go back and edit
    Edit,
    /// Type a Jalali date
    Persian,
    /// Type a Gregorian date
    Gregorian,
}

/// Interpret the answer to "continue with this text?"
///
/// Only an explicit yes continues.
pub fn parse_warning_answer(answer: &str) -> WarningChoice {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "c" | "continue" => WarningChoice::Continue,
        _ => WarningChoice::Cancel,
    }
}

/// Interpret the answer at the deadline prompt; `None` asks again
pub fn parse_deadline_answer(answer: &str) -> Option<DeadlineAction> {
    match answer.trim().to_lowercase().as_str() {
        "" | "a" | "accept" | "y" | "yes" => Some(DeadlineAction::Accept),
        "e" | "edit" => Some(DeadlineAction::Edit),
        "p" | "persian" | "j" | "jalali" => Some(DeadlineAction::Persian),
        "g" | "gregorian" => Some(DeadlineAction::Gregorian),
        _ => None,
    }
}

/// Asks on the terminal
///
/// With `assume_yes` nothing is asked: warnings are continued past and
/// deadlines accepted.
pub struct TerminalInteraction {
    formatter: Formatter,
    assume_yes: bool,
}

impl TerminalInteraction {
    /// Create a prompter
    pub fn new(formatter: Formatter, assume_yes: bool) -> Self {
        Self {
            formatter,
            assume_yes,
        }
    }
}

/// Read one line without blocking the runtime; `None` on Ctrl+C or EOF
async fn read_line(prompt: String) -> Result<Option<String>, GateError> {
    tokio::task::spawn_blocking(move || {
        let mut editor =
            DefaultEditor::new().map_err(|e| GateError::Interaction(e.to_string()))?;
        match editor.readline(&prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(GateError::Interaction(e.to_string())),
        }
    })
    .await
    .map_err(|e| GateError::Interaction(format!("Prompt task failed: {}", e)))?
}

/// Ask a yes/no question; anything but yes is no
pub async fn confirm(question: &str) -> Result<bool, GateError> {
    let answer = read_line(format!("{} [y/N] ", question)).await?;
    Ok(answer
        .map(|a| matches!(a.trim().to_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false))
}

#[async_trait]
impl UserInteraction for TerminalInteraction {
    async fn resolve_quality_warning(
        &self,
        warning: &QualityWarning,
        raw_text: &str,
    ) -> Result<WarningChoice, GateError> {
        eprintln!("{}", self.formatter.warning(&warning.reason));
        if self.assume_yes {
            return Ok(WarningChoice::Continue);
        }

        let preview: String = raw_text.trim().chars().take(PREVIEW_CHARS).collect();
        if preview.is_empty() {
            eprintln!("  (no text was extracted)");
        } else {
            eprintln!("  Extracted: {}", preview);
        }

        let answer = read_line("Continue with this text? [y/N] ".to_string()).await?;
        Ok(answer
            .map(|a| parse_warning_answer(&a))
            .unwrap_or(WarningChoice::Cancel))
    }

    async fn confirm_deadline(&self, review: &DeadlineReview) -> Result<ConfirmChoice, GateError> {
        eprintln!("{}", self.formatter.format_review(review));
        if self.assume_yes {
            return Ok(ConfirmChoice::Accept);
        }

        loop {
            let Some(answer) =
                read_line("[a]ccept, [e]dit, [p]ersian date, [g]regorian date: ".to_string())
                    .await?
            else {
                return Ok(ConfirmChoice::Edit);
            };

            let action = match parse_deadline_answer(&answer) {
                Some(action) => action,
                None => {
                    eprintln!("{}", self.formatter.warning("Please answer a, e, p or g"));
                    continue;
                }
            };

            return Ok(match action {
                DeadlineAction::Accept => ConfirmChoice::Accept,
                DeadlineAction::Edit => ConfirmChoice::Edit,
                DeadlineAction::Persian => {
                    match read_line("Jalali date (YYYY/MM/DD): ".to_string()).await? {
                        Some(date) => ConfirmChoice::Amend {
                            persian: Some(date),
                            gregorian: None,
                        },
                        None => ConfirmChoice::Edit,
                    }
                }
                DeadlineAction::Gregorian => {
                    match read_line("Gregorian date (YYYY-MM-DD): ".to_string()).await? {
                        Some(date) => ConfirmChoice::Amend {
                            persian: None,
                            gregorian: Some(date),
                        },
                        None => ConfirmChoice::Edit,
                    }
                }
            });
        }
    }
}
