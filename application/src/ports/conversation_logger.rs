//! Port for structured conversation logging.
//!
//! This is separate from `tracing`-based operation logs: tracing carries the
//! human-readable diagnostics, while this port records each run as a
//! machine-readable event stream (JSONL in the infrastructure adapter).

use serde_json::{Value, json};

/// A structured conversation event.
pub struct ConversationEvent {
    /// One of `session_started`, `speaker_selected`, `turn_committed`, `run_finished`
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn session_started(session_id: &str, task: &str, roster: &[String], persisted: bool) -> Self {
        Self::new(
            "session_started",
            json!({
                "session_id": session_id,
                "task": task,
                "roster": roster,
                "persisted": persisted,
            }),
        )
    }

    pub fn speaker_selected(
        session_id: &str,
        turn: usize,
        speaker: &str,
        eligible: &[String],
        streak: usize,
    ) -> Self {
        Self::new(
            "speaker_selected",
            json!({
                "session_id": session_id,
                "turn": turn,
                "speaker": speaker,
                "eligible": eligible,
                "affirmative_streak": streak,
            }),
        )
    }

    pub fn turn_committed(session_id: &str, turn: usize, source: &str, content: &str) -> Self {
        Self::new(
            "turn_committed",
            json!({
                "session_id": session_id,
                "turn": turn,
                "source": source,
                "content": content,
            }),
        )
    }

    pub fn run_finished(
        session_id: &str,
        status: &str,
        reason: Option<&str>,
        total_messages: usize,
        execution_time: f64,
    ) -> Self {
        Self::new(
            "run_finished",
            json!({
                "session_id": session_id,
                "status": status,
                "reason": reason,
                "total_messages": total_messages,
                "execution_time": execution_time,
            }),
        )
    }
}

/// Port for logging conversation events to a structured log.
///
/// `log` is synchronous and infallible; adapters swallow their own I/O errors.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
