//! Step events: live progress emitted while the loop runs.
//!
//! The presentation side (CLI, gateway SSE) subscribes through an
//! [`EventSink`]. Events are informational only: dropping them never
//! affects the loop.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

const PLAN_DISPLAY_CHARS: usize = 200;
const OBSERVE_DISPLAY_CHARS: usize = 150;

/// Events emitted by the orchestration loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent {
    /// The model is reasoning.
    Plan { content: String },

    /// The model asked for a tool ("unknown" when it named none).
    Action { tool: String },

    /// The model acknowledged a tool result.
    Observe { content: String },

    /// The model's reply was not a usable envelope; the loop is retrying.
    Warning { message: String },

    /// The model call failed; the loop is ending.
    Error { message: String },
}

impl StepEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Plan { .. } => "plan",
            Self::Action { .. } => "action",
            Self::Observe { .. } => "observe",
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
        }
    }

    /// One-line rendering for progress displays. Long content is cut;
    /// the full text stays in the conversation history.
    pub fn display_line(&self) -> String {
        match self {
            Self::Plan { content } => {
                format!("🧠 Planning: {}", truncate(content, PLAN_DISPLAY_CHARS))
            }
            Self::Action { tool } => format!("⚡ Action: using tool `{tool}`"),
            Self::Observe { content } => {
                format!("👀 Observation: {}", truncate(content, OBSERVE_DISPLAY_CHARS))
            }
            Self::Warning { message } => format!("⚠️ {message}"),
            Self::Error { message } => format!("❌ Error: {message}"),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Where the loop sends its [`StepEvent`]s.
///
/// A disabled sink swallows everything, and a closed receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<StepEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<StepEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A sink plus the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StepEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: StepEvent) {
        trace!(event = event.event_type(), "Step event");
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
