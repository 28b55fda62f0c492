//! Fixed instructions and response schema sent to the inference service.
//!
//! Keeping every prompt here means a wording change touches exactly one
//! place, and tests can inspect the text without a live model.
//!
//! Callers can override the analysis instruction via
//! [`crate::config::SessionConfig::analysis_prompt`]; the schema is fixed
//! because [`crate::client::analysis::AnalysisResult`] depends on it.

use serde_json::{json, Value};

/// Instruction sent alongside the document for the one-shot analysis.
pub const ANALYSIS_PROMPT: &str = "Analyze this PDF and provide a comprehensive summary, 5 key insights, and 3 suggested follow-up questions for a user interested in the document's contents. Format the response as JSON.";

/// Reply substituted when a chat call returns no text.
pub const CHAT_FALLBACK_REPLY: &str = "I'm sorry, I couldn't process that request.";

/// JSON field names of the analysis response.
pub const SUMMARY_FIELD: &str = "summary";
pub const KEY_INSIGHTS_FIELD: &str = "keyInsights";
pub const SUGGESTED_QUESTIONS_FIELD: &str = "suggestedQuestions";

/// Structured-output schema for the analysis response.
///
/// All three fields are required; the insight and question counts are left
/// to the model.
pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            SUMMARY_FIELD: { "type": "STRING" },
            KEY_INSIGHTS_FIELD: {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            SUGGESTED_QUESTIONS_FIELD: {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": [SUMMARY_FIELD, KEY_INSIGHTS_FIELD, SUGGESTED_QUESTIONS_FIELD]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_all_fields() {
        let schema = analysis_response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, vec!["summary", "keyInsights", "suggestedQuestions"]);
        assert_eq!(schema["properties"]["keyInsights"]["items"]["type"], "STRING");
    }

    #[test]
    fn analysis_prompt_asks_for_json() {
        assert!(ANALYSIS_PROMPT.contains("JSON"));
        assert!(ANALYSIS_PROMPT.contains("summary"));
    }
}
