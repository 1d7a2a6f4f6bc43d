//! Stage 2: structured information extraction
//!
//! One inference call turns stage-1 text into contest fields. Everything the
//! service returns is normalized here: digits, Persian letters, topics,
//! capacity, links and the deadline pair. A field that fails validation is
//! dropped with a warning; it never fails the stage.

use std::sync::Arc;

use festa_domain::calendar::{format_gregorian, parse_gregorian};
use festa_domain::text::{normalize_persian, normalize_submission_method, to_western_digits};
use festa_domain::{
    dedup_attributions, CancelToken, Capacity, ContentKind, SourceAttribution, StageOutcome,
    StructuredRecord,
};
use festa_llm::{InferenceError, InferenceService, RawContestFields, StructuredResponse};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{ExtractionError, ExtractorConfig};

/// Runs stage 2
pub struct Structurer {
    inference: Arc<dyn InferenceService>,
    config: ExtractorConfig,
}

impl Structurer {
    /// Create a structurer
    pub fn new(inference: Arc<dyn InferenceService>, config: ExtractorConfig) -> Self {
        Self { inference, config }
    }

    /// Extract a structured record from stage-1 text
    pub async fn structure(
        &self,
        raw_text: &str,
        display_name: &str,
        kind: ContentKind,
        cancel: &CancelToken,
    ) -> Result<StageOutcome<StructuredRecord>, ExtractionError> {
        if cancel.is_cancelled() {
            return Ok(StageOutcome::Cancelled);
        }

        let call = self.inference.extract_structured(raw_text, display_name, cancel);
        let response = match timeout(self.config.stage_timeout(), call).await {
            Ok(Ok(response)) => response,
            Ok(Err(InferenceError::Aborted)) => return Ok(StageOutcome::Cancelled),
            Ok(Err(e)) => {
                warn!("Structured extraction for '{}' failed: {}", display_name, e);
                return Err(e.into());
            }
            Err(_) => {
                return Err(ExtractionError::Timeout {
                    stage: "structured extraction",
                    secs: self.config.stage_timeout_secs,
                })
            }
        };

        if cancel.is_cancelled() {
            debug!("Discarding structured response for '{}' after cancellation", display_name);
            return Ok(StageOutcome::Cancelled);
        }

        let record = build_record(response, raw_text, display_name, kind);
        info!(
            "Structured '{}': name={:?}, {} topic(s), deadline={}",
            display_name,
            record.name,
            record.topics.len(),
            record.deadline_persian().unwrap_or("none")
        );
        Ok(StageOutcome::Done(record))
    }
}

/// Turn a service response into a normalized record
pub fn build_record(
    response: StructuredResponse,
    raw_text: &str,
    display_name: &str,
    kind: ContentKind,
) -> StructuredRecord {
    let StructuredResponse { fields, sources } = response;
    let RawContestFields {
        name,
        objectives,
        topics,
        max_photos,
        deadline_persian,
        deadline_gregorian,
        image_size,
        submission_method,
    } = fields;

    let mut record = StructuredRecord::new(display_name, kind, raw_text);
    record.name = clean_text(name);
    record.objectives = clean_text(objectives);
    record.image_size = clean_text(image_size);
    record.topics = topics.as_deref().map(split_topics).unwrap_or_default();
    record.capacity = max_photos.and_then(|raw| Capacity::parse(&to_western_digits(&raw.as_text())));
    record.submission_method = submission_method
        .map(|m| normalize_submission_method(&m))
        .filter(|m| !m.is_empty());
    record.source_attributions = dedup_attributions(sources.into_iter().map(with_title).collect());

    reconcile_deadline(&mut record, deadline_persian, deadline_gregorian);
    record
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| normalize_persian(v.trim()))
        .filter(|v| !v.is_empty())
}

/// Split on Latin and Arabic commas, dropping empties
pub fn split_topics(raw: &str) -> Vec<String> {
    raw.split([',', '،'])
        .map(|t| normalize_persian(t.trim()))
        .filter(|t| !t.is_empty())
        .collect()
}

fn with_title(source: SourceAttribution) -> SourceAttribution {
    if source.title.trim().is_empty() {
        SourceAttribution {
            title: source.uri.clone(),
            uri: source.uri,
        }
    } else {
        source
    }
}

/// Jalali date wins; the Gregorian date is used only when no Jalali date was given
///
/// An invalid Jalali date drops the whole pair.
fn reconcile_deadline(
    record: &mut StructuredRecord,
    persian: Option<String>,
    gregorian: Option<String>,
) {
    let persian = persian.map(|p| to_western_digits(p.trim())).filter(|p| !p.is_empty());
    let gregorian = gregorian.map(|g| to_western_digits(g.trim())).filter(|g| !g.is_empty());

    if let Some(p) = &persian {
        match record.set_deadline_persian(p) {
            Ok(()) => {
                if let Some(g) = &gregorian {
                    match parse_gregorian(g) {
                        Ok(date) => {
                            let stated = format_gregorian(date);
                            if record.deadline_gregorian() != Some(stated.as_str()) {
                                warn!(
                                    "Gregorian deadline {} disagrees with Jalali {}; keeping the Jalali date",
                                    stated, p
                                );
                                record.superseded_gregorian = Some(stated);
                            }
                        }
                        Err(e) => warn!("Ignoring Gregorian deadline: {}", e),
                    }
                }
                return;
            }
            Err(e) => {
                warn!(
                    "Dropping Jalali deadline '{}' and its Gregorian pair: {}",
                    p, e
                );
                return;
            }
        }
    }

    if let Some(g) = &gregorian {
        if let Err(e) = record.set_deadline_gregorian(g) {
            warn!("Dropping Gregorian deadline '{}': {}", g, e);
        }
    }
}
