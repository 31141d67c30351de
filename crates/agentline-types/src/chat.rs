//! Transcript message types.
//!
//! These types represent the ordered conversation a chat session shows to the
//! user: human prompts, streamed ai prose, and tool output split out of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The user's prompt
    Human,
    /// Model prose (streamed)
    Ai,
    /// Structured tool output lifted out of model prose
    Tool,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Human => "human",
            Sender::Ai => "ai",
            Sender::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transcript entry.
///
/// Only the trailing message of an active turn is ever mutated, and only by
/// extending its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    /// Message text (partial while its turn is streaming)
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Sender::Human, content)
    }

    /// Create an ai message. An empty one acts as the streaming placeholder.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Sender::Ai, content)
    }

    /// Create a tool output message.
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Sender::Tool, content)
    }

    /// Append streamed text.
    pub fn append_content(&mut self, delta: &str) {
        self.content.push_str(delta);
    }
}

/// One decoded, typed unit of streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Text to fold into the transcript
    Content(String),
    /// The turn finished normally
    Done,
    /// The stream reported an application-level failure
    Error(String),
}

impl StreamChunk {
    /// Whether this chunk ends the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamChunk::Done | StreamChunk::Error(_))
    }
}

/// Lifecycle of a single turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    /// No turn has been started since the transcript was (re)loaded
    #[default]
    Idle,
    /// Human/ai pair appended, nothing received yet
    AwaitingFirstChunk,
    /// At least one content chunk applied
    Streaming,
    /// `Done` received (explicitly or by end of input)
    Completed,
    /// Application-level error or transport failure
    Failed(String),
}

impl TurnState {
    /// Whether the turn still expects stream output.
    pub fn is_loading(&self) -> bool {
        matches!(self, TurnState::AwaitingFirstChunk | TurnState::Streaming)
    }

    /// Whether the turn has ended and accepts no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Completed | TurnState::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::human("hello");
        assert_eq!(msg.sender, Sender::Human);
        assert_eq!(msg.content, "hello");

        let placeholder = Message::ai("");
        assert_eq!(placeholder.sender, Sender::Ai);
        assert!(placeholder.content.is_empty());
    }

    #[test]
    fn test_append_content() {
        let mut msg = Message::ai("");
        msg.append_content("Hi");
        msg.append_content(" there");
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_sender_serialization() {
        assert_eq!(serde_json::to_string(&Sender::Human).unwrap(), "\"human\"");
        assert_eq!(serde_json::to_string(&Sender::Ai).unwrap(), "\"ai\"");
        let sender: Sender = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(sender, Sender::Tool);
        assert!(serde_json::from_str::<Sender>("\"system\"").is_err());
    }

    #[test]
    fn test_turn_state_flags() {
        assert!(!TurnState::Idle.is_loading());
        assert!(TurnState::AwaitingFirstChunk.is_loading());
        assert!(TurnState::Streaming.is_loading());
        assert!(TurnState::Completed.is_terminal());
        assert!(TurnState::Failed("boom".into()).is_terminal());
        assert!(!TurnState::Streaming.is_terminal());
    }

    #[test]
    fn test_chunk_terminal() {
        assert!(StreamChunk::Done.is_terminal());
        assert!(StreamChunk::Error("x".into()).is_terminal());
        assert!(!StreamChunk::Content("x".into()).is_terminal());
    }
}
