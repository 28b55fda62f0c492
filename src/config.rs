//! Configuration for a document session.
//!
//! Everything a [`crate::session::Session`] needs besides the document lives
//! in [`SessionConfig`], built via [`SessionConfigBuilder`]. Callers set only
//! what they care about and rely on the defaults for the rest.

use crate::error::LuminaError;
use crate::observer::SessionObserver;
use crate::prompts::{ANALYSIS_PROMPT, CHAT_FALLBACK_REPLY};
use crate::provider::InferenceService;
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Configuration for a document session.
///
/// # Example
/// ```rust
/// use lumina::SessionConfig;
///
/// let config = SessionConfig::builder()
///     .model("gemini-2.5-flash")
///     .temperature(0.2)
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.5-flash");
/// ```
#[derive(Clone)]
pub struct SessionConfig {
    /// Model identifier passed to the provider. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Provider name. Only `gemini` is built in. If None, Gemini is assumed.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over everything else.
    pub provider: Option<Arc<dyn InferenceService>>,

    /// API key. If None, read from `GEMINI_API_KEY` / `API_KEY`.
    pub api_key: Option<String>,

    /// Override of the provider's base URL (proxies, local emulators).
    pub base_url: Option<String>,

    /// Sampling temperature. None leaves the provider default.
    pub temperature: Option<f32>,

    /// Cap on generated tokens per call. None leaves the provider default.
    pub max_output_tokens: Option<u32>,

    /// Per-call timeout in seconds. Default: None (calls run to completion).
    pub api_timeout_secs: Option<u64>,

    /// Instruction sent with the document for analysis. If None, uses
    /// [`ANALYSIS_PROMPT`].
    pub analysis_prompt: Option<String>,

    /// Reply used when a chat call succeeds but returns no text.
    pub fallback_reply: String,

    /// Download timeout for URL uploads in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives session events. Default: none.
    pub observer: Option<Arc<dyn SessionObserver>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            api_key: None,
            base_url: None,
            temperature: None,
            max_output_tokens: None,
            api_timeout_secs: None,
            analysis_prompt: None,
            fallback_reply: CHAT_FALLBACK_REPLY.to_string(),
            download_timeout_secs: 120,
            observer: None,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("analysis_prompt", &self.analysis_prompt.is_some())
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn SessionObserver>"))
            .finish()
    }
}

impl SessionConfig {
    /// Create a new builder for `SessionConfig`.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The analysis instruction in effect.
    pub fn analysis_prompt(&self) -> &str {
        self.analysis_prompt.as_deref().unwrap_or(ANALYSIS_PROMPT)
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn InferenceService>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn analysis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.analysis_prompt = Some(prompt.into());
        self
    }

    pub fn fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.config.fallback_reply = reply.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SessionConfig, LuminaError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(LuminaError::InvalidConfig("Model must not be empty".into()));
        }
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(LuminaError::InvalidConfig(format!(
                    "Temperature must be 0.0–2.0, got {t}"
                )));
            }
        }
        if c.api_timeout_secs == Some(0) {
            return Err(LuminaError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.analysis_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(LuminaError::InvalidConfig(
                "Analysis prompt must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
