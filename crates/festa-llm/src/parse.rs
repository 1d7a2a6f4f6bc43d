//! Parse service output into typed responses

use serde_json::Value;
use tracing::warn;

use crate::error::InferenceError;
use crate::types::{ItemAnalysisResponse, RawContestFields};

/// Strip a surrounding markdown code fence, if present
///
/// Models sometimes wrap JSON in ```` ```json ... ``` ```` even when asked
/// not to.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening line
    let body = match body.find('\n') {
        Some(idx) if body[..idx].chars().all(|c| c.is_ascii_alphanumeric()) => &body[idx + 1..],
        _ => body,
    };
    body.trim()
}

/// Parse the structured-extraction JSON object
pub fn parse_contest_fields(response: &str) -> Result<RawContestFields, InferenceError> {
    let json_str = strip_code_fence(response);
    if json_str.is_empty() {
        return Err(InferenceError::InvalidResponse(
            "Empty structured response".to_string(),
        ));
    }
    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        InferenceError::InvalidResponse(format!(
            "Failed to parse structured response: {}. Response text: {}",
            e, json_str
        ))
    })?;
    if !value.is_object() {
        return Err(InferenceError::InvalidResponse(
            "Expected a JSON object".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Parse the photo-analysis JSON object
///
/// A missing or non-numeric score is reported as `None`; clamping is the
/// analyzer's job.
pub fn parse_item_analysis(response: &str) -> Result<ItemAnalysisResponse, InferenceError> {
    let json_str = strip_code_fence(response);
    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        InferenceError::InvalidResponse(format!(
            "Failed to parse image analysis: {}. Response text: {}",
            e, json_str
        ))
    })?;
    let obj = value
        .as_object()
        .ok_or_else(|| InferenceError::InvalidResponse("Expected a JSON object".to_string()))?;

    let text_field = |key: &str| -> String {
        obj.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let score = match obj.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        other => {
            warn!("Non-numeric score in image analysis: {:?}", other);
            None
        }
    };

    let editing_notes = obj
        .get("editingNotes")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(ItemAnalysisResponse {
        critique: text_field("critique"),
        score,
        score_reasoning: text_field("scoreReasoning"),
        editing_notes,
    })
}
