//! Request and response types for inference calls

use festa_domain::{SourceAttribution, TopicFocus};
use serde::{Deserialize, Serialize};

/// Capacity as returned by the service: a JSON number or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCapacity {
    /// `"maxPhotos": 10`
    Number(serde_json::Number),
    /// `"maxPhotos": "up to 10"`
    Text(String),
}

impl RawCapacity {
    /// String form used for normalization downstream
    pub fn as_text(&self) -> String {
        match self {
            RawCapacity::Number(n) => n.to_string(),
            RawCapacity::Text(s) => s.clone(),
        }
    }
}

/// Contest fields exactly as the service returned them
///
/// No normalization happens here; the structuring stage owns that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawContestFields {
    /// Contest name
    pub name: Option<String>,
    /// Objectives
    pub objectives: Option<String>,
    /// Comma-separated topics
    pub topics: Option<String>,
    /// Maximum number of photos
    pub max_photos: Option<RawCapacity>,
    /// Jalali deadline as returned
    pub deadline_persian: Option<String>,
    /// Gregorian deadline as returned
    pub deadline_gregorian: Option<String>,
    /// Image size requirements
    pub image_size: Option<String>,
    /// Submission method
    pub submission_method: Option<String>,
}

/// Structured extraction result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredResponse {
    /// Parsed fields
    pub fields: RawContestFields,
    /// Web sources the answer was grounded on, in service order
    pub sources: Vec<SourceAttribution>,
}

/// Everything needed to score one photo
#[derive(Debug, Clone)]
pub struct ItemAnalysisRequest {
    /// Image bytes
    pub image: Vec<u8>,
    /// Image MIME type
    pub mime: String,
    /// Contest name
    pub record_name: Option<String>,
    /// Contest topics
    pub topics: Vec<String>,
    /// Contest objectives
    pub objectives: Option<String>,
    /// The analysis context text photos are judged against
    pub analysis_text: String,
    /// Scoring policy
    pub focus: TopicFocus,
    /// Photographer's note about this photo
    pub note: Option<String>,
}

/// Photo analysis as returned by the service
///
/// `score` is `None` when the service returned a non-number.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAnalysisResponse {
    /// Critique text
    pub critique: String,
    /// Raw score, not yet clamped
    pub score: Option<f64>,
    /// Why the score was given
    pub score_reasoning: String,
    /// Editing suggestions, if any
    pub editing_notes: Option<String>,
}

/// Input for producing an analysis context
#[derive(Debug, Clone, PartialEq)]
pub struct SmartAnalysisRequest {
    /// Contest name, required
    pub name: String,
    /// Contest topics
    pub topics: Vec<String>,
    /// Contest objectives
    pub objectives: Option<String>,
    /// Extra notes from the user
    pub user_notes: Option<String>,
}

/// Analysis context as returned by the service
#[derive(Debug, Clone, PartialEq)]
pub struct SmartAnalysisResponse {
    /// Analysis text
    pub text: String,
    /// Web sources the analysis was grounded on
    pub sources: Vec<SourceAttribution>,
}
