//! The Step Envelope: the structured unit of model output.
//!
//! Every round the model must reply with a single JSON object:
//!
//! ```json
//! { "step": "plan" | "action" | "observe" | "finish",
//!   "content": "...",
//!   "function": "tool name (action only)",
//!   "input": "tool input (action only)" }
//! ```
//!
//! Models do not always comply, so decoding is tolerant:
//!
//! - a surrounding Markdown code fence (with or without a language tag) is
//!   removed before parsing;
//! - missing `step` / `content` fields default instead of failing;
//! - an unrecognized `step` value decodes to [`Step::Other`];
//! - only text that is not a JSON object at all is reported, as an
//!   [`EnvelopeError`], which the loop treats as recoverable.

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

use crate::error::EnvelopeError;

/// The loop phase a reply asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Reasoning; surfaced as progress, no side effects.
    Plan,
    /// Invoke the tool named in `function` with `input`.
    Action,
    /// Acknowledge a tool result.
    Observe,
    /// Terminal: `content` is the final answer.
    Finish,
    /// Anything else, including a missing `step` (empty string).
    Other(String),
}

impl Step {
    pub fn parse(value: &str) -> Self {
        match value {
            "plan" => Step::Plan,
            "action" => Step::Action,
            "observe" => Step::Observe,
            "finish" => Step::Finish,
            other => Step::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Step::Plan => "plan",
            Step::Action => "action",
            Step::Observe => "observe",
            Step::Finish => "finish",
            Step::Other(s) => s,
        }
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A decoded model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepEnvelope {
    pub step: Step,

    /// Rationale (plan), observation (observe), or final answer (finish).
    pub content: String,

    /// Tool name; meaningful only for [`Step::Action`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    /// Opaque tool payload, passed to the tool verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

impl StepEnvelope {
    /// An `observe` envelope wrapping a tool result.
    pub fn observation(content: impl Into<String>) -> Self {
        Self {
            step: Step::Observe,
            content: content.into(),
            function: None,
            input: None,
        }
    }

    /// Decode a raw model reply.
    ///
    /// Never panics. Fence stripping happens first, so a fenced reply decodes
    /// exactly like its unfenced equivalent.
    pub fn decode(raw: &str) -> Result<Self, EnvelopeError> {
        let cleaned = strip_code_fence(raw);
        if cleaned.is_empty() {
            return Err(EnvelopeError::Empty);
        }

        let value: Value =
            serde_json::from_str(cleaned).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

        let map = match value {
            Value::Object(map) => map,
            other => return Err(EnvelopeError::NotAnObject(json_kind(&other))),
        };

        let step = match map.get("step") {
            Some(Value::String(s)) => Step::parse(s),
            Some(Value::Null) | None => Step::Other(String::new()),
            Some(other) => Step::Other(other.to_string()),
        };

        let content = map.get("content").map(text_of).unwrap_or_default();
        let function = map.get("function").and_then(optional_text);
        let input = map.get("input").and_then(optional_text);

        trace!(step = step.as_str(), has_function = function.is_some(), "Decoded step envelope");

        Ok(Self {
            step,
            content,
            function,
            input,
        })
    }

    /// Encode as compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Encode a tool result as the observation message fed back to the model:
/// `{"step":"observe","content":"<result>"}`.
pub fn observation_json(result: &str) -> String {
    StepEnvelope::observation(result).to_json()
}

/// Remove one leading and one trailing Markdown code fence, then trim.
///
/// The leading fence may carry a language tag (` ```json `, ` ```JSON `).
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }

    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// String values verbatim; `null` as empty; anything else as compact JSON.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn optional_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(text_of(other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
