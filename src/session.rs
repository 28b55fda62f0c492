//! The session controller: one document, its analysis, and the conversation.
//!
//! ## State machine
//!
//! ```text
//!            upload            encoded            result / failure
//!   Empty ──────────▶ Uploading ───────▶ Analyzing ──────────────────▶ Ready
//!     ▲                                                              │   ▲
//!     │ reset (from any phase)                                  send │   │ reply / failure
//!     └──────────────────────────────────────────────────────────    ▼   │
//!                                                                  Chatting
//! ```
//!
//! ## Single flight
//!
//! Every operation checks and advances the phase under one lock, so while a
//! request is outstanding a second `upload` or `send` fails with
//! [`LuminaError::Busy`] instead of issuing another call. Each request also
//! remembers the session *generation* it started in; [`Session::reset`]
//! bumps the generation, and a reply that resolves afterwards is dropped
//! with [`LuminaError::Cancelled`] rather than written into the new session.
//!
//! ## Failure handling
//!
//! Failures are recorded in a single error slot ([`SessionState::last_error`])
//! holding the error's [`LuminaError::user_message`] and returned to the
//! caller. Nothing is retried. A failed analysis leaves the document loaded
//! with no analysis; a failed chat leaves the user's turn in the log.

use crate::client::analysis::{self, AnalysisResult};
use crate::client::chat;
use crate::config::SessionConfig;
use crate::conversation::{ConversationLog, ConversationTurn};
use crate::document::{is_pdf_media_type, Document};
use crate::error::LuminaError;
use crate::provider::{resolve_provider, InferenceService};
use crate::upload::Upload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No document loaded.
    #[default]
    Empty,
    /// A document is being encoded.
    Uploading,
    /// The analysis request is in flight.
    Analyzing,
    /// A document is loaded and no request is in flight.
    Ready,
    /// A chat request is in flight.
    Chatting,
}

impl Phase {
    /// Whether an inference request is outstanding in this phase.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Uploading | Phase::Analyzing | Phase::Chatting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Empty => "empty",
            Phase::Uploading => "uploading",
            Phase::Analyzing => "analyzing",
            Phase::Ready => "ready",
            Phase::Chatting => "chatting",
        };
        f.write_str(s)
    }
}

/// Everything the session knows. `SessionState::default()` is the empty
/// session, and [`Session::reset`] always returns to exactly that value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub document: Option<Document>,
    pub analysis: Option<AnalysisResult>,
    pub log: ConversationLog,
    pub phase: Phase,
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn is_analyzing(&self) -> bool {
        self.phase == Phase::Analyzing
    }

    pub fn is_chatting(&self) -> bool {
        self.phase == Phase::Chatting
    }
}

/// Observer events, collected under the lock and delivered after it.
enum Event {
    Phase(Phase, Phase),
    DocumentLoaded(String, u64),
    AnalysisComplete(AnalysisResult),
    Turn(ConversationTurn),
    Error(String),
    Reset,
}

struct Inner {
    state: SessionState,
    generation: u64,
}

impl Inner {
    fn set_phase(&mut self, to: Phase, events: &mut Vec<Event>) {
        let from = self.state.phase;
        if from != to {
            debug!("Session phase: {} → {}", from, to);
            self.state.phase = to;
            events.push(Event::Phase(from, to));
        }
    }

    fn record_error(&mut self, err: &LuminaError, events: &mut Vec<Event>) {
        warn!("{}", err);
        let message = err.user_message();
        self.state.last_error = Some(message.clone());
        events.push(Event::Error(message));
    }

    fn append(&mut self, turn: ConversationTurn, events: &mut Vec<Event>) {
        self.state.log.append(turn.clone());
        events.push(Event::Turn(turn));
    }
}

/// A document-assistant session.
///
/// Operations take `&self`; share a session between tasks with `Arc`.
///
/// # Example
/// ```rust,no_run
/// use lumina::{Session, SessionConfig, Upload};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Provider auto-configured from GEMINI_API_KEY
/// let session = Session::new(SessionConfig::default())?;
/// let analysis = session.upload(Upload::from_path("report.pdf")?).await?;
/// println!("{}", analysis.summary);
///
/// let answer = session.send("What is the conclusion?").await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
pub struct Session {
    config: SessionConfig,
    provider: Arc<dyn InferenceService>,
    inner: Mutex<Inner>,
}

impl Session {
    /// Create an empty session, resolving the provider from `config`.
    pub fn new(config: SessionConfig) -> Result<Self, LuminaError> {
        let provider = resolve_provider(&config)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Create an empty session that talks to `provider`.
    pub fn with_provider(config: SessionConfig, provider: Arc<dyn InferenceService>) -> Self {
        info!("New session using provider '{}'", provider.name());
        Self {
            config,
            provider,
            inner: Mutex::new(Inner {
                state: SessionState::default(),
                generation: 0,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase
    }

    /// Load a document and analyze it.
    ///
    /// Only allowed from [`Phase::Empty`]. On success the session is
    /// [`Phase::Ready`] with the document and its analysis.
    ///
    /// # Errors
    /// * [`LuminaError::InvalidFileType`] — not a PDF; the session stays empty.
    /// * [`LuminaError::AnalysisFailed`] — the document stays loaded, the
    ///   session is `Ready` without an analysis.
    /// * [`LuminaError::Busy`] / [`LuminaError::DocumentAlreadyLoaded`] —
    ///   nothing changed.
    /// * [`LuminaError::Cancelled`] — the session was reset meanwhile.
    pub async fn upload(&self, upload: Upload) -> Result<AnalysisResult, LuminaError> {
        // ── Step 1: Validate and enter Uploading ─────────────────────────
        let mut events = Vec::new();
        let started = {
            let mut inner = self.lock();
            match inner.state.phase {
                Phase::Empty => {
                    if is_pdf_media_type(&upload.media_type) {
                        inner.state.last_error = None;
                        inner.set_phase(Phase::Uploading, &mut events);
                        Ok(inner.generation)
                    } else {
                        let err = LuminaError::InvalidFileType {
                            name: upload.name.clone(),
                            media_type: upload.media_type.clone(),
                        };
                        inner.record_error(&err, &mut events);
                        Err(err)
                    }
                }
                Phase::Ready => Err(LuminaError::DocumentAlreadyLoaded),
                phase => Err(LuminaError::Busy { phase }),
            }
        };
        self.emit(events);
        let generation = started?;
        info!("Uploading '{}' ({} bytes)", upload.name, upload.bytes.len());

        // ── Step 2: Encode off the async executor ────────────────────────
        let built = tokio::task::spawn_blocking(move || Document::from_upload(upload))
            .await
            .map_err(|e| LuminaError::Internal(format!("encoding task failed: {e}")))
            .and_then(|r| r);

        let mut events = Vec::new();
        let loaded = {
            let mut inner = self.lock();
            if inner.generation != generation {
                Err(LuminaError::Cancelled)
            } else {
                match built {
                    Ok(document) => {
                        events.push(Event::DocumentLoaded(
                            document.display_name().to_string(),
                            document.byte_size(),
                        ));
                        inner.state.document = Some(document.clone());
                        inner.set_phase(Phase::Analyzing, &mut events);
                        Ok(document)
                    }
                    Err(err) => {
                        inner.record_error(&err, &mut events);
                        inner.set_phase(Phase::Empty, &mut events);
                        Err(err)
                    }
                }
            }
        };
        self.emit(events);
        let document = loaded?;

        // ── Step 3: Analyze ──────────────────────────────────────────────
        let outcome = analysis::analyze(&self.provider, &document, &self.config).await;

        let mut events = Vec::new();
        let result = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!("Dropping analysis of '{}': session was reset", document.display_name());
                Err(LuminaError::Cancelled)
            } else {
                match outcome {
                    Ok(result) => {
                        inner.state.analysis = Some(result.clone());
                        events.push(Event::AnalysisComplete(result.clone()));
                        inner.set_phase(Phase::Ready, &mut events);
                        Ok(result)
                    }
                    Err(err) => {
                        inner.record_error(&err, &mut events);
                        inner.set_phase(Phase::Ready, &mut events);
                        Err(err)
                    }
                }
            }
        };
        self.emit(events);
        result
    }

    /// Ask a question about the loaded document.
    ///
    /// The user turn is appended before the call and is kept even if the
    /// call fails. On success the reply is appended and returned.
    ///
    /// # Errors
    /// * [`LuminaError::EmptyMessage`], [`LuminaError::NoDocument`],
    ///   [`LuminaError::Busy`] — nothing changed.
    /// * [`LuminaError::ChatFailed`] — the user turn stays, the error is recorded.
    /// * [`LuminaError::Cancelled`] — the session was reset meanwhile.
    pub async fn send(&self, message: impl Into<String>) -> Result<String, LuminaError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(LuminaError::EmptyMessage);
        }

        let mut events = Vec::new();
        let started = {
            let mut inner = self.lock();
            match (inner.state.phase, inner.state.document.clone()) {
                (Phase::Ready, Some(document)) => {
                    let prior = inner.state.log.turns().to_vec();
                    inner.append(ConversationTurn::user(message.clone()), &mut events);
                    inner.set_phase(Phase::Chatting, &mut events);
                    Ok((inner.generation, document, prior))
                }
                (Phase::Empty, _) | (Phase::Ready, None) => Err(LuminaError::NoDocument),
                (phase, _) => Err(LuminaError::Busy { phase }),
            }
        };
        self.emit(events);
        let (generation, document, prior) = started?;

        let outcome = chat::chat(&self.provider, &document, &prior, &message, &self.config).await;

        let mut events = Vec::new();
        let result = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!("Dropping chat reply: session was reset");
                Err(LuminaError::Cancelled)
            } else {
                match outcome {
                    Ok(reply) => {
                        inner.append(ConversationTurn::assistant(reply.clone()), &mut events);
                        inner.state.last_error = None;
                        inner.set_phase(Phase::Ready, &mut events);
                        Ok(reply)
                    }
                    Err(err) => {
                        inner.record_error(&err, &mut events);
                        inner.set_phase(Phase::Ready, &mut events);
                        Err(err)
                    }
                }
            }
        };
        self.emit(events);
        result
    }

    /// Send the analysis' suggested question at `index` (0-based).
    pub async fn ask_suggested(&self, index: usize) -> Result<String, LuminaError> {
        let question = {
            let inner = self.lock();
            let questions = inner
                .state
                .analysis
                .as_ref()
                .map(|a| a.suggested_questions.as_slice())
                .unwrap_or_default();
            let question = questions.get(index).cloned();
            question.ok_or(LuminaError::NoSuchSuggestion {
                index,
                available: questions.len(),
            })
        }?;
        self.send(question).await
    }

    /// Discard everything and return to [`Phase::Empty`].
    ///
    /// A request still in flight runs to completion, but its result is
    /// dropped.
    pub fn reset(&self) {
        let mut events = Vec::new();
        {
            let mut inner = self.lock();
            let from = inner.state.phase;
            inner.generation += 1;
            inner.state = SessionState::default();
            if from != Phase::Empty {
                events.push(Event::Phase(from, Phase::Empty));
            }
            events.push(Event::Reset);
        }
        info!("Session reset");
        self.emit(events);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, events: Vec<Event>) {
        let Some(ref observer) = self.config.observer else {
            return;
        };
        for event in events {
            match event {
                Event::Phase(from, to) => observer.on_phase_change(from, to),
                Event::DocumentLoaded(name, size) => observer.on_document_loaded(&name, size),
                Event::AnalysisComplete(result) => observer.on_analysis_complete(&result),
                Event::Turn(turn) => observer.on_turn_appended(&turn),
                Event::Error(message) => observer.on_error(&message),
                Event::Reset => observer.on_reset(),
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider.name())
            .field("phase", &self.phase())
            .finish()
    }
}
