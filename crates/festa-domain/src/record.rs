//! Structured contest record
//!
//! The record is the user-facing result of an extraction. Its deadline is kept
//! as a Jalali/Gregorian pair that always denotes the same day; the setters
//! below are the only way to change it after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calendar::{gregorian_to_persian, parse_gregorian, persian_to_gregorian, JalaliDate};
use crate::outcome::ContentKind;
use crate::{BatchId, RecordId};

/// Maximum number of photos a contest accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Capacity {
    /// A plain number of photos
    Count(u32),
    /// Free-form description ("up to 5 per section", ...)
    Text(String),
}

impl Capacity {
    /// Interpret a raw capacity value: all ASCII digits become a count
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = trimmed.parse::<u32>() {
                return Some(Capacity::Count(n));
            }
        }
        Some(Capacity::Text(trimmed.to_string()))
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Count(n) => write!(f, "{}", n),
            Capacity::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One input the record was extracted from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// File name as supplied by the user
    pub name: String,
    /// MIME type
    pub mime: String,
    /// Byte size of the input
    pub size: usize,
}

/// A web source cited by the inference service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttribution {
    /// Source URI, the deduplication key
    pub uri: String,
    /// Title, falls back to the URI
    pub title: String,
}

/// Deduplicate attributions by uri, keeping first-seen order
pub fn dedup_attributions(sources: Vec<SourceAttribution>) -> Vec<SourceAttribution> {
    let mut seen = std::collections::HashSet::new();
    sources
        .into_iter()
        .filter(|s| !s.uri.is_empty() && seen.insert(s.uri.clone()))
        .collect()
}

/// Contest analysis produced for photo scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Free-form analysis text
    pub text: String,
    /// Web sources the analysis was grounded on
    pub sources: Vec<SourceAttribution>,
    /// Notes the user supplied when requesting the analysis
    pub user_notes: Option<String>,
    /// When the analysis was produced
    pub generated_at: DateTime<Utc>,
}

/// A contest announcement turned into structured facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// Record identifier
    pub id: RecordId,
    /// Display name derived from the inputs
    pub display_name: String,
    /// Kind of content the record came from
    pub source_kind: ContentKind,
    /// Inputs the record came from
    pub source_descriptors: Vec<SourceDescriptor>,
    /// Contest name
    pub name: Option<String>,
    /// Contest topics
    pub topics: Vec<String>,
    /// Stated objectives
    pub objectives: Option<String>,
    /// Maximum number of photos
    pub capacity: Option<Capacity>,
    deadline_persian: Option<String>,
    deadline_gregorian: Option<String>,
    /// Gregorian deadline the service returned that disagreed with the Jalali one
    pub superseded_gregorian: Option<String>,
    /// Required image dimensions or file size
    pub image_size: Option<String>,
    /// How to submit
    pub submission_method: Option<String>,
    /// Web sources cited by the inference service
    pub source_attributions: Vec<SourceAttribution>,
    /// Stage-1 text the record was produced from
    pub raw_text: String,
    /// Analysis context, if one has been produced
    pub smart_analysis: Option<AnalysisContext>,
    /// Most recent batch analyzed against this record
    pub last_batch_id: Option<BatchId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl StructuredRecord {
    /// Create an empty record for the given source
    pub fn new(display_name: impl Into<String>, source_kind: ContentKind, raw_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            display_name: display_name.into(),
            source_kind,
            source_descriptors: Vec::new(),
            name: None,
            topics: Vec::new(),
            objectives: None,
            capacity: None,
            deadline_persian: None,
            deadline_gregorian: None,
            superseded_gregorian: None,
            image_size: None,
            submission_method: None,
            source_attributions: Vec::new(),
            raw_text: raw_text.into(),
            smart_analysis: None,
            last_batch_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Jalali deadline, `YYYY/MM/DD`
    pub fn deadline_persian(&self) -> Option<&str> {
        self.deadline_persian.as_deref()
    }

    /// Gregorian deadline, `YYYY-MM-DD`
    pub fn deadline_gregorian(&self) -> Option<&str> {
        self.deadline_gregorian.as_deref()
    }

    /// Whether any deadline is present
    pub fn has_deadline(&self) -> bool {
        self.deadline_persian.is_some() || self.deadline_gregorian.is_some()
    }

    /// Set the Jalali deadline and derive the Gregorian one
    ///
    /// On error the record is left unchanged.
    pub fn set_deadline_persian(&mut self, value: &str) -> Result<(), String> {
        let date = JalaliDate::parse(value)?;
        let gregorian = persian_to_gregorian(&date.to_string())?;
        self.deadline_persian = Some(date.to_string());
        self.deadline_gregorian = Some(gregorian);
        self.superseded_gregorian = None;
        Ok(())
    }

    /// Set the Gregorian deadline and derive the Jalali one
    ///
    /// On error the record is left unchanged.
    pub fn set_deadline_gregorian(&mut self, value: &str) -> Result<(), String> {
        let date = parse_gregorian(value)?;
        let formatted = crate::calendar::format_gregorian(date);
        let persian = gregorian_to_persian(&formatted)?;
        self.deadline_gregorian = Some(formatted);
        self.deadline_persian = Some(persian);
        self.superseded_gregorian = None;
        Ok(())
    }

    /// Remove both deadlines
    pub fn clear_deadline(&mut self) {
        self.deadline_persian = None;
        self.deadline_gregorian = None;
        self.superseded_gregorian = None;
    }

    /// Mark the record as modified now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Human label: contest name, else display name
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StructuredRecord {
        StructuredRecord::new("poster.pdf", ContentKind::Document, "text")
    }

    #[test]
    fn test_capacity_parse() {
        assert_eq!(Capacity::parse("10"), Some(Capacity::Count(10)));
        assert_eq!(Capacity::parse(" 5 "), Some(Capacity::Count(5)));
        assert_eq!(
            Capacity::parse("up to 5"),
            Some(Capacity::Text("up to 5".to_string()))
        );
        assert_eq!(Capacity::parse(""), None);
    }

    #[test]
    fn test_set_persian_derives_gregorian() {
        let mut r = record();
        r.set_deadline_persian("1403/02/10").unwrap();
        assert_eq!(r.deadline_persian(), Some("1403/02/10"));
        assert_eq!(r.deadline_gregorian(), Some("2024-04-29"));
    }

    #[test]
    fn test_set_gregorian_derives_persian() {
        let mut r = record();
        r.set_deadline_gregorian("2024-03-20").unwrap();
        assert_eq!(r.deadline_persian(), Some("1403/01/01"));
    }

    #[test]
    fn test_invalid_deadline_leaves_record_unchanged() {
        let mut r = record();
        r.set_deadline_persian("1403/02/10").unwrap();
        assert!(r.set_deadline_persian("1402/12/30").is_err());
        assert!(r.set_deadline_gregorian("2024-13-01").is_err());
        assert_eq!(r.deadline_persian(), Some("1403/02/10"));
        assert_eq!(r.deadline_gregorian(), Some("2024-04-29"));
    }

    #[test]
    fn test_dedup_attributions_keeps_first() {
        let sources = vec![
            SourceAttribution { uri: "https://a".into(), title: "A".into() },
            SourceAttribution { uri: "https://b".into(), title: "B".into() },
            SourceAttribution { uri: "https://a".into(), title: "A2".into() },
        ];
        let deduped = dedup_attributions(sources);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "A");
        assert_eq!(deduped[1].uri, "https://b");
    }

    #[test]
    fn test_record_serde_round_trip() {
        let mut r = record();
        r.name = Some("Festival".to_string());
        r.capacity = Some(Capacity::Count(3));
        r.set_deadline_persian("1403/02/10").unwrap();
        let json = serde_json::to_string(&r).unwrap();
        let back: StructuredRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
