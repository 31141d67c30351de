//! Interpreter for the streaming chat protocol.

use agentline_types::{StreamChunk, WireEvent};
use serde_json::Value;

/// Marker that introduces an event line.
pub const DEFAULT_EVENT_PREFIX: &str = "data: ";

/// Maps protocol lines to stream chunks.
#[derive(Debug, Clone)]
pub struct EventInterpreter {
    prefix: String,
}

impl Default for EventInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_PREFIX)
    }
}

impl EventInterpreter {
    /// Create an interpreter that recognizes lines starting with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Interpret one line.
    ///
    /// Framing lines, unknown event types, and malformed payloads all yield
    /// `None`; a bad frame never ends the stream.
    pub fn interpret(&self, line: &str) -> Option<StreamChunk> {
        let payload = line.strip_prefix(self.prefix.as_str())?;

        let event = match serde_json::from_str::<WireEvent>(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    target: "agentline::interpreter",
                    "Skipping malformed event payload: {} - {}",
                    e,
                    truncate(payload, 100)
                );
                return None;
            }
        };

        match event {
            WireEvent::Content { content } => Some(StreamChunk::Content(content)),
            WireEvent::ToolCall { tool } => {
                Some(StreamChunk::Content(format!("[Using tool: {}]", tool)))
            }
            WireEvent::ToolResult { content } => {
                Some(StreamChunk::Content(render_tool_result(content)))
            }
            WireEvent::End => Some(StreamChunk::Done),
            WireEvent::Error { message } => Some(StreamChunk::Error(message)),
            WireEvent::Unknown => {
                tracing::trace!(
                    target: "agentline::interpreter",
                    "Ignoring unknown event type: {}",
                    truncate(payload, 100)
                );
                None
            }
        }
    }
}

fn render_tool_result(content: Value) -> String {
    match content {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
