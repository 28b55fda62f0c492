//! Chat client: one follow-up question about the loaded document.
//!
//! The service keeps no state between calls, so every request re-sends the
//! whole transcript plus the document. Prior turns go first with their
//! speaker labels; the final user turn carries the document and the new
//! message together.

use super::document_part;
use crate::config::SessionConfig;
use crate::conversation::{ConversationTurn, Speaker};
use crate::document::Document;
use crate::error::LuminaError;
use crate::provider::{Content, GenerateRequest, InferenceService, Part, ProviderRole};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Build the chat request.
pub fn build_request(
    document: &Document,
    prior_turns: &[ConversationTurn],
    message: &str,
    config: &SessionConfig,
) -> GenerateRequest {
    let mut contents: Vec<Content> = prior_turns
        .iter()
        .map(|turn| Content {
            role: provider_role(turn.speaker),
            parts: vec![Part::Text(turn.text.clone())],
        })
        .collect();

    contents.push(Content::user(vec![
        document_part(document),
        Part::Text(message.to_string()),
    ]));

    GenerateRequest {
        contents,
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
        ..Default::default()
    }
}

fn provider_role(speaker: Speaker) -> ProviderRole {
    match speaker {
        Speaker::User => ProviderRole::User,
        Speaker::Assistant => ProviderRole::Model,
    }
}

/// Ask `message` about `document`, given the turns so far.
///
/// Returns the reply text, or `config.fallback_reply` when the service
/// answers without any text.
///
/// # Errors
/// [`LuminaError::ChatFailed`] when the call itself fails.
pub async fn chat(
    service: &Arc<dyn InferenceService>,
    document: &Document,
    prior_turns: &[ConversationTurn],
    message: &str,
    config: &SessionConfig,
) -> Result<String, LuminaError> {
    let start = Instant::now();
    let request = build_request(document, prior_turns, message, config);

    let response = service.generate(&request).await.map_err(|e| {
        warn!("Chat call failed after {:?}: {}", start.elapsed(), e);
        LuminaError::ChatFailed {
            reason: e.to_string(),
        }
    })?;

    debug!(
        "Chat turn {}: {} input tokens, {} output tokens, {:?}",
        prior_turns.len() / 2 + 1,
        response.prompt_tokens,
        response.completion_tokens,
        start.elapsed()
    );

    Ok(response
        .text
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| config.fallback_reply.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PDF_MEDIA_TYPE;
    use crate::upload::Upload;

    fn doc() -> Document {
        Document::from_upload(Upload::new("a.pdf", PDF_MEDIA_TYPE, b"%PDF-1.4".to_vec())).unwrap()
    }

    #[test]
    fn first_message_is_single_turn() {
        let request = build_request(&doc(), &[], "What is this?", &SessionConfig::default());
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role, ProviderRole::User);
        assert_eq!(
            request.contents[0].parts.last(),
            Some(&Part::Text("What is this?".into()))
        );
    }

    #[test]
    fn prior_turns_map_to_provider_labels() {
        let prior = vec![
            ConversationTurn::user("q1"),
            ConversationTurn::assistant("a1"),
        ];
        let request = build_request(&doc(), &prior, "q2", &SessionConfig::default());

        let roles: Vec<ProviderRole> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![ProviderRole::User, ProviderRole::Model, ProviderRole::User]
        );
        assert_eq!(request.contents[1].parts, vec![Part::Text("a1".into())]);
    }

    #[test]
    fn document_travels_with_the_new_message_only() {
        let prior = vec![ConversationTurn::user("q1")];
        let request = build_request(&doc(), &prior, "q2", &SessionConfig::default());

        let inline_count = |c: &Content| {
            c.parts
                .iter()
                .filter(|p| matches!(p, Part::InlineData { .. }))
                .count()
        };
        assert_eq!(inline_count(&request.contents[0]), 0);
        assert_eq!(inline_count(&request.contents[1]), 1);
    }
}
