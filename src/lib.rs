//! # lumina
//!
//! Load a PDF, get an LLM-written summary with key insights and suggested
//! follow-up questions, then ask questions grounded in the same document.
//!
//! ## Session Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload    path / URL / bytes → one Upload with a declared media type
//!  ├─ 2. Encode    bytes → base64 Document (+ temp-file render handle)
//!  ├─ 3. Analyze   document + instruction → JSON {summary, keyInsights, suggestedQuestions}
//!  └─ 4. Chat      transcript + document + question → free-text reply, appended to the log
//! ```
//!
//! A [`Session`] owns the document, its analysis and the conversation log,
//! and allows exactly one inference request in flight at a time.
//! [`Session::reset`] returns it to the empty state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumina::{Session, SessionConfig, Upload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-configured from GEMINI_API_KEY
//!     let session = Session::new(SessionConfig::default())?;
//!     let analysis = session.upload(Upload::from_path("paper.pdf")?).await?;
//!     println!("{}", analysis.summary);
//!     for insight in &analysis.key_insights {
//!         println!("  • {insight}");
//!     }
//!     println!("{}", session.ask_suggested(0).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lumina` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! lumina = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod observer;
pub mod prompts;
pub mod provider;
pub mod session;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::analysis::{analyze, AnalysisResult};
pub use client::chat::chat;
pub use config::{SessionConfig, SessionConfigBuilder, DEFAULT_MODEL};
pub use conversation::{ConversationLog, ConversationTurn, Speaker};
pub use document::{format_size, Document, RenderHandle, PDF_MEDIA_TYPE};
pub use error::{InferenceError, LuminaError};
pub use observer::{NoopObserver, ObserverHandle, SessionObserver};
pub use provider::{
    GeminiProvider, GenerateRequest, GenerateResponse, InferenceService, ProviderRole,
};
pub use session::{Phase, Session, SessionState};
pub use upload::Upload;
