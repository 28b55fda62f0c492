//! Google Gemini `generateContent` provider.
//!
//! Documents travel as `inlineData` parts (base64 + MIME type) next to the
//! text parts of the same turn. Structured output uses `responseMimeType:
//! application/json` plus a `responseSchema`; the reply text is the
//! concatenation of the first candidate's non-thought text parts.

use super::{GenerateRequest, GenerateResponse, InferenceService, Part, ResponseFormat};
use crate::error::InferenceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const PROVIDER_NAME: &str = "gemini";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// HTTPS client for one Gemini model.
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: Option<u64>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[async_trait]
impl InferenceService for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError> {
        let body = build_body(request);

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let parsed = parse_response(&text)?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model, parsed.prompt_tokens, parsed.completion_tokens
        );
        Ok(parsed)
    }
}

impl GeminiProvider {
    fn transport_error(&self, e: reqwest::Error) -> InferenceError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => InferenceError::Timeout { secs },
            _ => InferenceError::Transport(e.to_string()),
        }
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: WireBlob<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    usage_metadata: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Debug, Deserialize)]
struct WireResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
    status: Option<String>,
}

fn build_body(request: &GenerateRequest) -> WireRequest<'_> {
    let contents = request
        .contents
        .iter()
        .map(|content| WireContent {
            role: content.role.as_str(),
            parts: content
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => WirePart::Text { text },
                    Part::InlineData { mime_type, data } => WirePart::Inline {
                        inline_data: WireBlob {
                            mime_type,
                            data,
                        },
                    },
                })
                .collect(),
        })
        .collect();

    let mut config = WireGenerationConfig {
        temperature: request.temperature,
        max_output_tokens: request.max_output_tokens,
        ..Default::default()
    };
    if let ResponseFormat::Json { ref schema } = request.response_format {
        config.response_mime_type = Some("application/json");
        config.response_schema = Some(schema);
    }

    let has_config = config.response_mime_type.is_some()
        || config.temperature.is_some()
        || config.max_output_tokens.is_some();

    WireRequest {
        contents,
        generation_config: has_config.then_some(config),
    }
}

fn parse_response(body: &str) -> Result<GenerateResponse, InferenceError> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

    let text: String = wire
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    let (prompt_tokens, completion_tokens) = wire
        .usage_metadata
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or((0, 0));

    Ok(GenerateResponse {
        text: (!text.is_empty()).then_some(text),
        prompt_tokens,
        completion_tokens,
    })
}

/// Pull the human-readable message out of a Gemini error body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<WireErrorBody>(body) {
        Ok(WireErrorBody { error }) => match error.status {
            Some(status) => format!("{status}: {}", error.message),
            None => error.message,
        },
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Content;
    use serde_json::json;
    use std::sync::Arc;

    fn body_json(request: &GenerateRequest) -> serde_json::Value {
        serde_json::to_value(build_body(request)).unwrap()
    }

    #[test]
    fn inline_document_and_text_share_a_turn() {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![
                Part::InlineData {
                    mime_type: "application/pdf".into(),
                    data: Arc::from("JVBERg=="),
                },
                Part::Text("Summarise".into()),
            ])],
            ..Default::default()
        };

        assert_eq!(
            body_json(&request),
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "application/pdf", "data": "JVBERg=="}},
                        {"text": "Summarise"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn json_format_sets_generation_config() {
        let schema = json!({"type": "OBJECT"});
        let request = GenerateRequest {
            contents: vec![Content::user_text("hi")],
            response_format: ResponseFormat::Json {
                schema: schema.clone(),
            },
            temperature: Some(0.2),
            max_output_tokens: None,
        };

        let body = body_json(&request);
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"], schema);
        assert_eq!(config["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(2.0));
        assert!(config.get("maxOutputTokens").is_none());
    }

    #[test]
    fn history_roles_use_model_label() {
        let request = GenerateRequest {
            contents: vec![Content::user_text("q"), Content::model_text("a")],
            ..Default::default()
        };
        let body = body_json(&request);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
    }

    #[test]
    fn parse_concatenates_text_parts_and_skips_thoughts() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking…", "thought": true},
                    {"text": "Hello, "},
                    {"text": "world"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 7}
        })
        .to_string();

        let parsed = parse_response(&body).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("Hello, world"));
        assert_eq!(parsed.prompt_tokens, 120);
        assert_eq!(parsed.completion_tokens, 7);
    }

    #[test]
    fn parse_without_candidates_has_no_text() {
        let parsed = parse_response(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert_eq!(parsed.text, None);
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_response("<html>").unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn api_error_message_extracts_status() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "INVALID_ARGUMENT: API key not valid");
        assert_eq!(api_error_message("  "), "empty response body");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn endpoint_and_debug_redaction() {
        let provider = GeminiProvider::new("secret", "gemini-3-flash-preview")
            .with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-3-flash-preview:generateContent"
        );
        assert!(!format!("{provider:?}").contains("secret"));
    }
}
