//! The inference service seam.
//!
//! [`InferenceService`] is the opaque request/response contract the analysis
//! and chat clients talk to. A request is an ordered list of [`Content`]
//! turns, each made of text and inline-document [`Part`]s, plus the expected
//! response format. Providers translate it to their wire format;
//! [`gemini::GeminiProvider`] is the built-in one.
//!
//! Tests and embedders can pass any implementation through
//! [`crate::config::SessionConfigBuilder::provider`].

pub mod gemini;

use crate::config::SessionConfig;
use crate::error::{InferenceError, LuminaError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use gemini::GeminiProvider;

/// Speaker label as the inference service knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    User,
    Model,
}

impl ProviderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderRole::User => "user",
            ProviderRole::Model => "model",
        }
    }
}

/// One piece of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 data with its media type. Shared so re-sending the document on
    /// every chat call does not copy it.
    InlineData { mime_type: String, data: Arc<str> },
}

/// One turn of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: ProviderRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: ProviderRole::User,
            parts,
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: ProviderRole::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::Text(text.into())])
    }
}

/// What shape the reply must take.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free text.
    #[default]
    Text,
    /// JSON constrained by the given schema.
    Json { schema: serde_json::Value },
}

/// A complete generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub response_format: ResponseFormat,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

/// The provider's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Concatenated reply text; `None` when the service produced none.
    pub text: Option<String>,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// An external inference backend.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError>;
}

/// Environment variables checked, in order, for the Gemini API key.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Resolve the inference service, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider** (`config.provider_name`) — only `gemini` is built in.
/// 3. **API key** — `config.api_key`, else the first non-empty variable in
///    [`API_KEY_VARS`].
pub fn resolve_provider(config: &SessionConfig) -> Result<Arc<dyn InferenceService>, LuminaError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        if !name.eq_ignore_ascii_case(gemini::PROVIDER_NAME) {
            return Err(LuminaError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("Supported providers: {}", gemini::PROVIDER_NAME),
            });
        }
    }

    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(api_key_from_env)
        .ok_or_else(|| LuminaError::ProviderNotConfigured {
            provider: gemini::PROVIDER_NAME.to_string(),
            hint: format!(
                "No API key found.\nSet {} or pass one explicitly.",
                API_KEY_VARS.join(" or ")
            ),
        })?;

    debug!("Using {} provider with model {}", gemini::PROVIDER_NAME, config.model);

    let mut provider = GeminiProvider::new(api_key, config.model.clone());
    if let Some(ref base_url) = config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    if let Some(secs) = config.api_timeout_secs {
        provider = provider.with_timeout_secs(secs);
    }
    Ok(Arc::new(provider))
}

fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
}
