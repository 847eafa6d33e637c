//! RemapKeysUseCase: turns recognised gestures into synthesized keystrokes.
//!
//! This use case sits at the application layer and delegates to a
//! [`KeySink`] trait implementation for the actual event injection.  The
//! production implementation (the uinput virtual keyboard) lives in the
//! infrastructure layer.

use thiserror::Error;
use tracing::debug;

use tapkey_core::{GestureMatcher, KeyEvent, KeyStroke};

/// Error type for key emission.
///
/// A write failure on the virtual output device means the device vanished
/// out from under us; it is propagated as fatal, never retried.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("virtual output device write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Destination for synthesized keystrokes.
///
/// `emit` plays the batch in order and terminates it with a single
/// synchronization barrier, so listeners observe the batch atomically.
#[cfg_attr(test, mockall::automock)]
pub trait KeySink {
    /// Writes each stroke in order, then flushes the batch.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError`] if the write fails; the caller treats this as
    /// fatal.
    fn emit(&mut self, strokes: &[KeyStroke]) -> Result<(), EmitError>;
}

/// The Remap Keys use case.
///
/// Owns the gesture matcher and the output sink; one instance per process,
/// driven by the event loop.
pub struct RemapKeysUseCase<S: KeySink> {
    matcher: GestureMatcher,
    sink: S,
}

impl<S: KeySink> RemapKeysUseCase<S> {
    /// Creates the use case from a configured matcher and an output sink.
    pub fn new(matcher: GestureMatcher, sink: S) -> Self {
        Self { matcher, sink }
    }

    /// Handles one keyboard event.
    ///
    /// Multiple rules may complete on the same event; every matched rule's
    /// actions are emitted as a separate batch, in rule-declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError`] if writing to the sink fails.
    pub fn handle_key_event(&mut self, event: KeyEvent) -> Result<(), EmitError> {
        let matched = self.matcher.observe(event);
        for rule in matched {
            debug!(actions = rule.actions().len(), "gesture matched");
            self.sink.emit(rule.actions())?;
        }
        Ok(())
    }

    /// Consumes the use case and hands the sink back, so tests can inspect
    /// what was emitted.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
