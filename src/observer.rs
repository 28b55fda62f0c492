//! Observer trait for session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via
//! [`crate::config::SessionConfigBuilder::observer`] to be told about every
//! state transition as it happens: a terminal spinner, a GUI store, or a
//! log sink can all render from these events without polling.
//!
//! Events fire after the session has released its internal lock, so an
//! observer may call [`crate::session::Session::snapshot`] from inside a
//! callback.
//!
//! # Example
//!
//! ```rust
//! use lumina::{SessionConfig, SessionObserver, Phase};
//! use std::sync::Arc;
//!
//! struct PhaseLogger;
//!
//! impl SessionObserver for PhaseLogger {
//!     fn on_phase_change(&self, from: Phase, to: Phase) {
//!         eprintln!("{from} → {to}");
//!     }
//! }
//!
//! let config = SessionConfig::builder()
//!     .observer(Arc::new(PhaseLogger) as Arc<dyn SessionObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::client::analysis::AnalysisResult;
use crate::conversation::ConversationTurn;
use crate::session::Phase;
use std::sync::Arc;

/// Called by the session as its state changes.
///
/// All methods have default no-op implementations so implementors only
/// override what they care about.
pub trait SessionObserver: Send + Sync {
    /// The session moved from one phase to another.
    fn on_phase_change(&self, from: Phase, to: Phase) {
        let _ = (from, to);
    }

    /// A document was accepted and is now the session's document.
    fn on_document_loaded(&self, display_name: &str, byte_size: u64) {
        let _ = (display_name, byte_size);
    }

    /// The analysis for the current document arrived.
    fn on_analysis_complete(&self, result: &AnalysisResult) {
        let _ = result;
    }

    /// A turn was appended to the conversation log.
    fn on_turn_appended(&self, turn: &ConversationTurn) {
        let _ = turn;
    }

    /// A failure was recorded in the session's error slot.
    fn on_error(&self, message: &str) {
        let _ = message;
    }

    /// The session was reset to empty.
    fn on_reset(&self) {}
}

/// A no-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::SessionConfig`].
pub type ObserverHandle = Arc<dyn SessionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        phases: AtomicUsize,
        turns: AtomicUsize,
        errors: AtomicUsize,
    }

    impl SessionObserver for Counting {
        fn on_phase_change(&self, _from: Phase, _to: Phase) {
            self.phases.fetch_add(1, Ordering::SeqCst);
        }

        fn on_turn_appended(&self, _turn: &ConversationTurn) {
            self.turns.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs: ObserverHandle = Arc::new(NoopObserver);
        obs.on_phase_change(Phase::Empty, Phase::Uploading);
        obs.on_document_loaded("a.pdf", 10);
        obs.on_turn_appended(&ConversationTurn::user("hi"));
        obs.on_error("boom");
        obs.on_reset();
    }

    #[test]
    fn overridden_methods_receive_events() {
        let obs = Counting::default();
        obs.on_phase_change(Phase::Ready, Phase::Chatting);
        obs.on_turn_appended(&ConversationTurn::user("q"));
        obs.on_turn_appended(&ConversationTurn::assistant("a"));
        obs.on_error("x");
        obs.on_reset();

        assert_eq!(obs.phases.load(Ordering::SeqCst), 1);
        assert_eq!(obs.turns.load(Ordering::SeqCst), 2);
        assert_eq!(obs.errors.load(Ordering::SeqCst), 1);
    }
}
