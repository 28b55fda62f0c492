//! Analysis client: document → summary, key insights, suggested questions.
//!
//! The request asks for JSON constrained by
//! [`crate::prompts::analysis_response_schema`]. Models occasionally wrap
//! JSON in a Markdown fence even in JSON mode, so the reply is unwrapped
//! before parsing; anything that still fails to parse into
//! [`AnalysisResult`] is an [`LuminaError::AnalysisFailed`].

use super::document_part;
use crate::config::SessionConfig;
use crate::document::Document;
use crate::error::LuminaError;
use crate::prompts::analysis_response_schema;
use crate::provider::{Content, GenerateRequest, InferenceService, Part, ResponseFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Structured analysis of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub key_insights: Vec<String>,
    pub suggested_questions: Vec<String>,
}

/// Build the analysis request for `document`.
pub fn build_request(document: &Document, config: &SessionConfig) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content::user(vec![
            document_part(document),
            Part::Text(config.analysis_prompt().to_string()),
        ])],
        response_format: ResponseFormat::Json {
            schema: analysis_response_schema(),
        },
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    }
}

/// Request a fresh analysis of `document`.
///
/// # Errors
/// [`LuminaError::AnalysisFailed`] when the call fails, the service returns
/// no text, or the text is not a valid analysis.
pub async fn analyze(
    service: &Arc<dyn InferenceService>,
    document: &Document,
    config: &SessionConfig,
) -> Result<AnalysisResult, LuminaError> {
    let start = Instant::now();
    let request = build_request(document, config);

    let response = service.generate(&request).await.map_err(|e| {
        warn!("Analysis of '{}' failed: {}", document.display_name(), e);
        LuminaError::AnalysisFailed {
            reason: e.to_string(),
        }
    })?;

    debug!(
        "Analysis: {} input tokens, {} output tokens, {:?}",
        response.prompt_tokens,
        response.completion_tokens,
        start.elapsed()
    );

    let text = response.text.ok_or_else(|| LuminaError::AnalysisFailed {
        reason: "the service returned no content".into(),
    })?;
    let result = parse_analysis(&text)?;

    info!(
        "Analysed '{}': {} insights, {} suggested questions",
        document.display_name(),
        result.key_insights.len(),
        result.suggested_questions.len()
    );
    Ok(result)
}

/// Parse the service's reply into an [`AnalysisResult`].
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, LuminaError> {
    let json = strip_code_fence(text);
    serde_json::from_str(json).map_err(|e| LuminaError::AnalysisFailed {
        reason: format!("response is not a valid analysis: {e}"),
    })
}

static RE_CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap()
});

/// Unwrap a reply that is entirely one fenced code block.
fn strip_code_fence(text: &str) -> &str {
    match RE_CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PDF_MEDIA_TYPE;
    use crate::upload::Upload;

    const VALID: &str = r#"{
        "summary": "A short report.",
        "keyInsights": ["one", "two"],
        "suggestedQuestions": ["why?"]
    }"#;

    #[test]
    fn parses_camel_case_fields() {
        let result = parse_analysis(VALID).unwrap();
        assert_eq!(result.summary, "A short report.");
        assert_eq!(result.key_insights, vec!["one", "two"]);
        assert_eq!(result.suggested_questions, vec!["why?"]);
    }

    #[test]
    fn unwraps_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```\n");
        assert_eq!(parse_analysis(&fenced).unwrap(), parse_analysis(VALID).unwrap());

        let bare_fence = format!("```\n{VALID}```");
        assert!(parse_analysis(&bare_fence).is_ok());
    }

    #[test]
    fn missing_field_is_analysis_failure() {
        let err = parse_analysis(r#"{"summary": "x", "keyInsights": []}"#).unwrap_err();
        assert!(matches!(err, LuminaError::AnalysisFailed { .. }));
        assert!(err.to_string().contains("suggestedQuestions"), "got: {err}");
    }

    #[test]
    fn non_json_is_analysis_failure() {
        let err = parse_analysis("Sure! Here is a summary of the document.").unwrap_err();
        assert!(matches!(err, LuminaError::AnalysisFailed { .. }));
    }

    #[test]
    fn request_carries_document_instruction_and_schema() {
        let doc = Document::from_upload(Upload::new("a.pdf", PDF_MEDIA_TYPE, b"%PDF".to_vec()))
            .unwrap();
        let config = SessionConfig::default();
        let request = build_request(&doc, &config);

        assert_eq!(request.contents.len(), 1);
        let parts = &request.contents[0].parts;
        assert_eq!(
            parts[0],
            Part::InlineData {
                mime_type: PDF_MEDIA_TYPE.into(),
                data: Arc::from(doc.encoded_content()),
            }
        );
        assert_eq!(parts[1], Part::Text(config.analysis_prompt().to_string()));
        assert!(matches!(request.response_format, ResponseFormat::Json { .. }));
    }
}
