//! Error types for the lumina library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`LuminaError`] — returned by every public session, upload and client
//!   operation. The three variants a user can act on
//!   ([`LuminaError::InvalidFileType`], [`LuminaError::AnalysisFailed`],
//!   [`LuminaError::ChatFailed`]) each map to a fixed inline message via
//!   [`LuminaError::user_message`]; that message is what the session stores in
//!   its error slot.
//!
//! * [`InferenceError`] — raised by an [`crate::provider::InferenceService`]
//!   implementation (transport failure, non-2xx status, undecodable body).
//!   The analysis and chat clients wrap it into the matching
//!   [`LuminaError`] variant, so callers never match on provider details
//!   unless they want to.

use crate::session::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Inline message shown when an upload is not a PDF.
pub const INVALID_FILE_MESSAGE: &str = "Please select a valid PDF file.";
/// Inline message shown when the analysis request fails.
pub const ANALYSIS_FAILED_MESSAGE: &str = "An error occurred while analyzing the PDF.";
/// Inline message shown when a chat request fails.
pub const CHAT_FAILED_MESSAGE: &str = "Could not get a response from the AI.";

/// All errors returned by the lumina library.
#[derive(Debug, Error)]
pub enum LuminaError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The upload's declared media type is not `application/pdf`.
    #[error("'{name}' is not a PDF (declared type: {media_type})")]
    InvalidFileType { name: String, media_type: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Inference errors ──────────────────────────────────────────────────
    /// The analysis call failed or returned something that is not an analysis.
    #[error("Analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    /// The chat call itself failed.
    #[error("Chat request failed: {reason}")]
    ChatFailed { reason: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("Inference provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// Another request is outstanding; only one may be in flight.
    #[error("A request is already in progress (session is {phase})")]
    Busy { phase: Phase },

    /// A chat operation was attempted with no document loaded.
    #[error("No document is loaded; upload a PDF first")]
    NoDocument,

    /// An upload was attempted while a document is already loaded.
    #[error("A document is already loaded; reset the session before uploading another")]
    DocumentAlreadyLoaded,

    /// The session was reset while this request was in flight; its result
    /// was discarded.
    #[error("Session was reset before the request completed")]
    Cancelled,

    /// The message was empty or whitespace only.
    #[error("Message is empty")]
    EmptyMessage,

    /// `ask_suggested` was called with an index past the end of the list.
    #[error("No suggested question #{index} ({available} available)")]
    NoSuchSuggestion { index: usize, available: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LuminaError {
    /// The short message a front end shows inline for this error.
    ///
    /// Upload, analysis and chat failures use fixed wording; everything else
    /// falls back to the `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            LuminaError::InvalidFileType { .. } => INVALID_FILE_MESSAGE.to_string(),
            LuminaError::AnalysisFailed { .. } => ANALYSIS_FAILED_MESSAGE.to_string(),
            LuminaError::ChatFailed { .. } => CHAT_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// A failure reported by an inference provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The API answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_fixed_for_session_errors() {
        let e = LuminaError::InvalidFileType {
            name: "image.png".into(),
            media_type: "image/png".into(),
        };
        assert_eq!(e.user_message(), INVALID_FILE_MESSAGE);

        let e = LuminaError::AnalysisFailed {
            reason: "no content".into(),
        };
        assert_eq!(e.user_message(), ANALYSIS_FAILED_MESSAGE);

        let e = LuminaError::ChatFailed {
            reason: "503".into(),
        };
        assert_eq!(e.user_message(), CHAT_FAILED_MESSAGE);
    }

    #[test]
    fn invalid_file_type_display() {
        let e = LuminaError::InvalidFileType {
            name: "image.png".into(),
            media_type: "image/png".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("image.png"), "got: {msg}");
        assert!(msg.contains("image/png"), "got: {msg}");
    }

    #[test]
    fn busy_display_names_phase() {
        let e = LuminaError::Busy {
            phase: Phase::Chatting,
        };
        assert!(e.to_string().contains("chatting"));
    }

    #[test]
    fn no_such_suggestion_falls_back_to_display() {
        let e = LuminaError::NoSuchSuggestion {
            index: 4,
            available: 3,
        };
        assert_eq!(e.user_message(), e.to_string());
        assert!(e.to_string().contains("#4"));
    }

    #[test]
    fn api_error_display() {
        let e = InferenceError::Api {
            status: 429,
            message: "quota exceeded".into(),
        };
        assert!(e.to_string().contains("429"));
        assert!(e.to_string().contains("quota exceeded"));
    }
}
