//! Deadline review
//!
//! Reconciles a record's Jalali/Gregorian deadline pair and collects the notes
//! the user should see before accepting it.

use chrono::NaiveDate;
use festa_domain::calendar::{format_gregorian, parse_gregorian};
use festa_domain::{JalaliDate, StructuredRecord};
use std::fmt;

use crate::GateConfig;

/// Overall review status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    /// Nothing beyond informational notes
    Clear,

    /// At least one note the user should look at
    NeedsAttention,
}

/// Something the reviewer noticed about the deadline pair
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewNote {
    /// Gregorian side was derived from the Jalali date
    DerivedGregorian,

    /// Jalali side was derived from the Gregorian date
    DerivedPersian,

    /// The service returned a Gregorian date that disagreed with the Jalali
    /// one; the Jalali date won
    Disagreement {
        /// Jalali date that was kept
        persian: String,
        /// Gregorian date that was discarded
        discarded_gregorian: String,
    },

    /// The stored pair denotes two different days; the Jalali date wins
    Mismatch {
        /// Stored Jalali date
        persian: String,
        /// Stored Gregorian date
        gregorian: String,
    },

    /// Jalali date could not be used
    InvalidPersian(String),

    /// Gregorian date could not be used
    InvalidGregorian(String),

    /// Jalali year outside the plausible range
    ImplausibleYear {
        /// Year found
        year: i32,
        /// Lower bound
        min: i32,
        /// Upper bound
        max: i32,
    },

    /// Deadline is already behind us
    PastDeadline {
        /// Days since the deadline
        days_ago: i64,
    },

    /// The user's last amendment could not be applied
    RejectedAmendment(String),
}

impl ReviewNote {
    /// Whether the note should draw the user's attention
    pub fn is_warning(&self) -> bool {
        !matches!(self, ReviewNote::DerivedGregorian | ReviewNote::DerivedPersian)
    }
}

impl fmt::Display for ReviewNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewNote::DerivedGregorian => write!(f, "Gregorian date derived from the Jalali date"),
            ReviewNote::DerivedPersian => write!(f, "Jalali date derived from the Gregorian date"),
            ReviewNote::Disagreement { persian, discarded_gregorian } => write!(
                f,
                "Announcement's Gregorian date {} disagrees with {}; the Jalali date was used",
                discarded_gregorian, persian
            ),
            ReviewNote::Mismatch { persian, gregorian } => write!(
                f,
                "Stored dates {} and {} are different days; the Jalali date was used",
                persian, gregorian
            ),
            ReviewNote::InvalidPersian(msg) => write!(f, "Jalali date unusable: {}", msg),
            ReviewNote::InvalidGregorian(msg) => write!(f, "Gregorian date unusable: {}", msg),
            ReviewNote::ImplausibleYear { year, min, max } => {
                write!(f, "Year {} is outside {}..={}", year, min, max)
            }
            ReviewNote::PastDeadline { days_ago } => {
                write!(f, "Deadline passed {} day(s) ago", days_ago)
            }
            ReviewNote::RejectedAmendment(msg) => write!(f, "Amendment rejected: {}", msg),
        }
    }
}

/// Reconciled deadline pair plus review notes
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineReview {
    /// Jalali deadline, `YYYY/MM/DD`
    pub persian: Option<String>,

    /// Gregorian deadline, `YYYY-MM-DD`
    pub gregorian: Option<String>,

    /// Overall status
    pub status: ReviewStatus,

    /// Notes in the order they were found
    pub notes: Vec<ReviewNote>,
}

impl DeadlineReview {
    /// Review a record with the default rules, relative to today
    pub fn of(record: &StructuredRecord) -> Self {
        Self::with_config(record, &GateConfig::default(), chrono::Local::now().date_naive())
    }

    /// Review a record with explicit rules and reference day
    pub fn with_config(record: &StructuredRecord, config: &GateConfig, today: NaiveDate) -> Self {
        let mut notes = Vec::new();

        let persian = record.deadline_persian().map(JalaliDate::parse);
        let gregorian = record.deadline_gregorian().map(parse_gregorian);

        let (persian, gregorian) = match (persian, gregorian) {
            (Some(Ok(jalali)), stored) => match jalali.to_gregorian() {
                Ok(derived) => {
                    match stored {
                        Some(Ok(g)) if g != derived => notes.push(ReviewNote::Mismatch {
                            persian: jalali.to_string(),
                            gregorian: format_gregorian(g),
                        }),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            notes.push(ReviewNote::InvalidGregorian(e));
                            notes.push(ReviewNote::DerivedGregorian);
                        }
                        None => notes.push(ReviewNote::DerivedGregorian),
                    }
                    (Some(jalali), Some(derived))
                }
                Err(e) => {
                    notes.push(ReviewNote::InvalidPersian(e));
                    (None, None)
                }
            },
            // An invalid Jalali date takes its Gregorian pair with it
            (Some(Err(e)), _) => {
                notes.push(ReviewNote::InvalidPersian(e));
                (None, None)
            }
            (None, stored) => Self::from_gregorian_side(stored, &mut notes),
        };

        if let (Some(discarded), Some(jalali)) = (&record.superseded_gregorian, &persian) {
            notes.push(ReviewNote::Disagreement {
                persian: jalali.to_string(),
                discarded_gregorian: discarded.clone(),
            });
        }

        if let Some(jalali) = &persian {
            let year = jalali.year();
            if year < config.min_plausible_year || year > config.max_plausible_year {
                notes.push(ReviewNote::ImplausibleYear {
                    year,
                    min: config.min_plausible_year,
                    max: config.max_plausible_year,
                });
            }
        }

        if config.flag_past_deadlines {
            if let Some(date) = gregorian {
                let days_ago = (today - date).num_days();
                if days_ago > 0 {
                    notes.push(ReviewNote::PastDeadline { days_ago });
                }
            }
        }

        let status = if notes.iter().any(ReviewNote::is_warning) {
            ReviewStatus::NeedsAttention
        } else {
            ReviewStatus::Clear
        };

        Self {
            persian: persian.map(|d| d.to_string()),
            gregorian: gregorian.map(format_gregorian),
            status,
            notes,
        }
    }

    fn from_gregorian_side(
        stored: Option<Result<NaiveDate, String>>,
        notes: &mut Vec<ReviewNote>,
    ) -> (Option<JalaliDate>, Option<NaiveDate>) {
        match stored {
            Some(Ok(g)) => match JalaliDate::from_gregorian(g) {
                Ok(jalali) => {
                    notes.push(ReviewNote::DerivedPersian);
                    (Some(jalali), Some(g))
                }
                Err(e) => {
                    notes.push(ReviewNote::InvalidGregorian(e));
                    (None, None)
                }
            },
            Some(Err(e)) => {
                notes.push(ReviewNote::InvalidGregorian(e));
                (None, None)
            }
            None => (None, None),
        }
    }

    /// Whether the reconciled pair holds a deadline
    pub fn has_deadline(&self) -> bool {
        self.persian.is_some()
    }

    /// Write the reconciled pair back to the record
    pub fn apply(&self, record: &mut StructuredRecord) -> Result<(), String> {
        match (&self.persian, &self.gregorian) {
            (Some(persian), _) => record.set_deadline_persian(persian),
            (None, Some(gregorian)) => record.set_deadline_gregorian(gregorian),
            (None, None) => {
                record.clear_deadline();
                Ok(())
            }
        }
    }
}
