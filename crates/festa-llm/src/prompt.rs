//! Prompt construction for the inference calls

use festa_domain::TopicFocus;

use crate::types::{ItemAnalysisRequest, SmartAnalysisRequest};

const TRANSCRIBE_INSTRUCTIONS: &str = "\
Extract all visible text from this image. The text may be in English, Persian, or both. \
Prioritize accuracy and return only the extracted text, with no commentary.";

const STRUCTURED_INSTRUCTIONS: &str = r#"You extract facts from photography contest announcements.
The text may be in English, Persian, or a mix. Return ONLY one JSON object with these keys
(use null when a field is not found):

- "name": string, the official contest name (in Persian if the source is English)
- "objectives": string, the stated goals of the contest; prefer the text over web results
- "topics": string, all themes or sections separated by commas; prefer the text over web results
- "maxPhotos": number or string, the maximum number of photos per participant
- "deadlinePersian": string, the Jalali deadline as YYYY/MM/DD when the source states one
- "deadlineGregorian": string, the Gregorian deadline as YYYY-MM-DD
- "imageSize": string, required dimensions, resolution or file size
- "submissionMethod": string, ONLY the full URL or e-mail address when submission is online,
  otherwise a short description of the method

If key facts (especially the deadline) are missing or ambiguous and an official website is
mentioned, search it and prefer the website's values for the deadline. Keep deadlines and the
submission method in their original form."#;

const ITEM_INSTRUCTIONS: &str = r#"You are a discerning photo contest judge. Evaluate the attached image strictly
against the contest analysis below and any topic focus. Thematic relevance matters most: a
technically flawless image that does not fit the contest must score low (0-3).

Return ONLY one JSON object with these keys:
- "critique": string, how the image aligns with the analysis, strengths and weaknesses
- "score": number from 0 to 10, the image's chance of success in this contest
- "scoreReasoning": string, the main reasons for the score
- "editingNotes": string or null; ONLY if score is 7 or higher, a critique of the current edit
  and concrete suggestions (global, local, crop, color). Otherwise null."#;

const SMART_ANALYSIS_INSTRUCTIONS: &str = r#"You are an expert analyst of photography contests. Using web search, study
previous editions of the contest (winners, recurring subjects, successful styles) and, where
possible, its jury and their known preferences. Then write a detailed analysis with these
sections, each introduced by a bold heading:

**Contest history:**
**Jury (if known):**
**Recommended genres and styles:**
**Concrete photo ideas:**
**Technical notes:**
**Common mistakes to avoid:**
**Summary and recommendations:**

Say explicitly when information could not be found. Return only the analysis text, in Persian."#;

/// Prompt for transcribing one image
pub fn transcribe_prompt() -> &'static str {
    TRANSCRIBE_INSTRUCTIONS
}

/// Prompt for structured extraction from stage-1 text
pub fn structured_prompt(text: &str, display_name: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(STRUCTURED_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Source file: \"{}\"\n", display_name));
    prompt.push_str("Text:\n---\n");
    prompt.push_str(text);
    prompt.push_str("\n---\n");
    prompt
}

/// Prompt for scoring one photo
pub fn item_prompt(request: &ItemAnalysisRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str(ITEM_INSTRUCTIONS);
    prompt.push_str("\n\n");

    prompt.push_str("Contest:\n");
    prompt.push_str(&format!(
        "- Name: {}\n",
        request.record_name.as_deref().unwrap_or("N/A")
    ));
    prompt.push_str(&format!("- Topics: {}\n", join_or_na(&request.topics)));
    prompt.push_str(&format!(
        "- Objectives: {}\n\n",
        request.objectives.as_deref().unwrap_or("N/A")
    ));

    prompt.push_str("Contest analysis:\n--- START ---\n");
    prompt.push_str(&request.analysis_text);
    prompt.push_str("\n--- END ---\n\n");

    match &request.focus {
        TopicFocus::Topic(topic) => prompt.push_str(&format!(
            "Selected topic focus: {}\nWeigh the image's relevance to this topic most heavily; \
             poor alignment must lower the score even for a good image.\n\n",
            topic
        )),
        TopicFocus::Holistic => prompt.push_str(
            "No topic was selected; evaluate against the contest as a whole.\n\n",
        ),
    }

    if let Some(note) = request.note.as_deref().filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!(
            "Photographer's note about this image: \"{}\"\n\
             Treat it as context about intent; it does not override an objective assessment.\n",
            note.trim()
        ));
    }

    prompt
}

/// Prompt for producing the analysis context
pub fn smart_analysis_prompt(request: &SmartAnalysisRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str(SMART_ANALYSIS_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Contest: \"{}\"\n", request.name));
    prompt.push_str(&format!("Topics: {}\n", join_or_na(&request.topics)));
    prompt.push_str(&format!(
        "Objectives: {}\n",
        request.objectives.as_deref().unwrap_or("N/A")
    ));
    if let Some(notes) = request.user_notes.as_deref().filter(|n| !n.trim().is_empty()) {
        prompt.push_str("\nUser notes:\n--- START ---\n");
        prompt.push_str(notes.trim());
        prompt.push_str("\n--- END ---\n");
    }
    prompt
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_request(focus: TopicFocus, note: Option<&str>) -> ItemAnalysisRequest {
        ItemAnalysisRequest {
            image: vec![],
            mime: "image/jpeg".to_string(),
            record_name: Some("Nature Lens".to_string()),
            topics: vec!["Landscape".to_string(), "Wildlife".to_string()],
            objectives: None,
            analysis_text: "Minimalism wins".to_string(),
            focus,
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_structured_prompt_embeds_text() {
        let prompt = structured_prompt("Deadline: 1403/02/10", "poster.pdf");
        assert!(prompt.contains("\"poster.pdf\""));
        assert!(prompt.contains("Deadline: 1403/02/10"));
        assert!(prompt.contains("deadlinePersian"));
    }

    #[test]
    fn test_item_prompt_topic_focus() {
        let prompt = item_prompt(&item_request(TopicFocus::Topic("Wildlife".into()), None));
        assert!(prompt.contains("Selected topic focus: Wildlife"));
        assert!(prompt.contains("Landscape, Wildlife"));
        assert!(prompt.contains("Objectives: N/A"));

        let holistic = item_prompt(&item_request(TopicFocus::Holistic, Some("  ")));
        assert!(holistic.contains("No topic was selected"));
        assert!(!holistic.contains("Photographer's note"));
    }

    #[test]
    fn test_item_prompt_note() {
        let prompt = item_prompt(&item_request(TopicFocus::Holistic, Some("Shot at dawn")));
        assert!(prompt.contains("\"Shot at dawn\""));
    }

    #[test]
    fn test_smart_analysis_prompt() {
        let prompt = smart_analysis_prompt(&SmartAnalysisRequest {
            name: "Nature Lens".to_string(),
            topics: vec![],
            objectives: Some("Awareness".to_string()),
            user_notes: Some("Jury favors film".to_string()),
        });
        assert!(prompt.contains("Contest: \"Nature Lens\""));
        assert!(prompt.contains("Topics: N/A"));
        assert!(prompt.contains("Jury favors film"));
    }
}
