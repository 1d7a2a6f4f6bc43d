//! Gemini Provider Implementation
//!
//! Talks to the `generateContent` REST endpoint of the Gemini API.
//!
//! # Features
//!
//! - Inline base64 image parts for transcription and photo scoring
//! - Web-search grounding for structured extraction and smart analysis
//! - JSON response mode for photo scoring
//! - Retry with exponential backoff, for transient failures only
//! - Every request and backoff sleep races the caller's cancel token
//!
//! # Examples
//!
//! ```no_run
//! use festa_llm::{GeminiConfig, GeminiProvider};
//!
//! let config = GeminiConfig::default().with_api_key("my-key");
//! let provider = GeminiProvider::new(config).unwrap();
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use festa_domain::{dedup_attributions, CancelToken, SourceAttribution};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::InferenceError;
use crate::parse::{parse_contest_fields, parse_item_analysis};
use crate::prompt;
use crate::types::{
    ItemAnalysisRequest, ItemAnalysisResponse, SmartAnalysisRequest, SmartAnalysisResponse,
    StructuredResponse,
};
use crate::{race_cancel, InferenceService};

/// Gemini API provider
pub struct GeminiProvider {
    config: GeminiConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<ResponseContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorBody {
    message: String,
    status: String,
}

struct Reply {
    text: String,
    sources: Vec<SourceAttribution>,
}

impl GeminiProvider {
    /// Create a provider from configuration
    ///
    /// Fails with `Configuration` when no API key is set or the config is
    /// invalid.
    pub fn new(config: GeminiConfig) -> Result<Self, InferenceError> {
        config.validate().map_err(InferenceError::Configuration)?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                InferenceError::Configuration("Gemini API key is not set".to_string())
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| InferenceError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Provider configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }

    /// Send one request with retries, racing every attempt against `cancel`
    async fn generate(
        &self,
        model: &str,
        body: &GenerateRequest,
        cancel: &CancelToken,
    ) -> Result<Reply, InferenceError> {
        let url = self.url(model);

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.config.max_retries {
            match race_cancel(cancel, self.send_once(&url, body)).await {
                Ok(reply) => return Ok(reply),
                Err(e) if matches!(e, InferenceError::Transient(_)) => {
                    warn!("Gemini attempt {} failed: {}", attempts + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            attempts += 1;
            if attempts < self.config.max_retries {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                race_cancel(cancel, async {
                    tokio::time::sleep(delay).await;
                    Ok(())
                })
                .await?;
            }
        }

        Err(last_error
            .unwrap_or_else(|| InferenceError::Transient("Max retries exceeded".to_string())))
    }

    async fn send_once(&self, url: &str, body: &GenerateRequest) -> Result<Reply, InferenceError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| InferenceError::Transient(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &text));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            InferenceError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;
        Ok(into_reply(parsed))
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> InferenceError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let detail = if envelope.error.message.is_empty() {
        body.to_string()
    } else if envelope.error.status.is_empty() {
        envelope.error.message
    } else {
        format!("{}: {}", envelope.error.status, envelope.error.message)
    };
    let message = format!("HTTP {}: {}", status, detail);

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        InferenceError::Transient(message)
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || status == reqwest::StatusCode::NOT_FOUND
        || status == reqwest::StatusCode::BAD_REQUEST
    {
        InferenceError::Configuration(message)
    } else {
        InferenceError::InvalidResponse(message)
    }
}

fn into_reply(response: GenerateResponse) -> Reply {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Reply {
            text: String::new(),
            sources: Vec::new(),
        };
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let sources = candidate
        .grounding_metadata
        .map(|g| {
            g.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri.filter(|u| !u.is_empty())?;
                    let title = web.title.filter(|t| !t.is_empty()).unwrap_or_else(|| uri.clone());
                    Some(SourceAttribution { uri, title })
                })
                .collect()
        })
        .unwrap_or_default();

    Reply {
        text,
        sources: dedup_attributions(sources),
    }
}

fn image_part(image: &[u8], mime: &str) -> Part {
    Part::InlineData(InlineData {
        mime_type: mime.to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(image),
    })
}

fn search_tool() -> Vec<Tool> {
    vec![Tool {
        google_search: serde_json::Map::new(),
    }]
}

#[async_trait]
impl InferenceService for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract_text(
        &self,
        image: &[u8],
        mime: &str,
        cancel: &CancelToken,
    ) -> Result<String, InferenceError> {
        debug!("Transcribing {} image ({} bytes)", mime, image.len());
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    image_part(image, mime),
                    Part::Text(prompt::transcribe_prompt().to_string()),
                ],
            }],
            tools: Vec::new(),
            generation_config: None,
        };
        let reply = self
            .generate(&self.config.vision_model, &body, cancel)
            .await?;
        Ok(reply.text.trim().to_string())
    }

    async fn extract_structured(
        &self,
        text: &str,
        display_name: &str,
        cancel: &CancelToken,
    ) -> Result<StructuredResponse, InferenceError> {
        debug!("Structuring {} chars from '{}'", text.chars().count(), display_name);
        // Search grounding cannot be combined with a JSON response mime type
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text(prompt::structured_prompt(text, display_name))],
            }],
            tools: search_tool(),
            generation_config: None,
        };
        let reply = self.generate(&self.config.text_model, &body, cancel).await?;
        let fields = parse_contest_fields(&reply.text)?;
        Ok(StructuredResponse {
            fields,
            sources: reply.sources,
        })
    }

    async fn analyze_item(
        &self,
        request: &ItemAnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<ItemAnalysisResponse, InferenceError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    image_part(&request.image, &request.mime),
                    Part::Text(prompt::item_prompt(request)),
                ],
            }],
            tools: Vec::new(),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };
        let reply = self
            .generate(&self.config.vision_model, &body, cancel)
            .await?;
        parse_item_analysis(&reply.text)
    }

    async fn smart_analysis(
        &self,
        request: &SmartAnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<SmartAnalysisResponse, InferenceError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text(prompt::smart_analysis_prompt(request))],
            }],
            tools: search_tool(),
            generation_config: None,
        };
        let reply = self.generate(&self.config.text_model, &body, cancel).await?;
        let text = reply.text.trim().to_string();
        if text.is_empty() {
            return Err(InferenceError::InvalidResponse(
                "Empty analysis text".to_string(),
            ));
        }
        Ok(SmartAnalysisResponse {
            text,
            sources: reply.sources,
        })
    }
}
