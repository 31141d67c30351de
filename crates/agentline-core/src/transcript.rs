//! Transcript state machine.
//!
//! Folds stream chunks into the ordered message list of the current session.
//!
//! Per-turn lifecycle:
//! - `start_user_turn` appends the human message and an empty ai placeholder
//!   together and moves to `AwaitingFirstChunk`
//! - content chunks extend the trailing ai message (`Streaming`), splitting
//!   embedded tool output into its own message
//! - `Done` / `Error` end the turn (`Completed` / `Failed`); partial output is
//!   kept
//! - `abort_turn` handles transport failure and rolls back an untouched
//!   human/ai pair
//!
//! Every mutating entry point is gated by [`StreamTracker::is_current`].

use crate::tool_output::{PathPayloadMatcher, ToolOutputMatcher};
use crate::tracker::{StreamHandle, StreamTracker};
use crate::{AgentlineError, Result};
use agentline_types::{Message, Sender, StreamChunk, TurnState};
use tracing::{debug, error, trace, warn};

/// What applying one chunk did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The handle is no longer current; nothing changed
    Stale,
    /// Text was appended to the trailing ai message
    Appended,
    /// Text was appended and tool payloads were split out of it
    ToolSplit { payloads: usize },
    /// The turn completed
    Completed,
    /// The stream reported an error; the turn failed
    Failed(String),
    /// The request never produced a frame; the turn failed and an untouched
    /// human/ai pair was removed if `rolled_back`
    TransportFailed { reason: String, rolled_back: bool },
    /// The turn had already ended (or none was running); nothing changed
    Ignored,
}

impl ApplyOutcome {
    /// Whether the transcript messages changed.
    pub fn mutated_messages(&self) -> bool {
        matches!(
            self,
            ApplyOutcome::Appended
                | ApplyOutcome::ToolSplit { .. }
                | ApplyOutcome::TransportFailed {
                    rolled_back: true,
                    ..
                }
        )
    }
}

/// Ordered messages of the current session plus the state of its latest turn.
pub struct Transcript {
    messages: Vec<Message>,
    turn: TurnState,
    matcher: Box<dyn ToolOutputMatcher>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("messages", &self.messages)
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::with_matcher(PathPayloadMatcher)
    }

    /// Create an empty transcript with a custom tool-output matcher.
    pub fn with_matcher(matcher: impl ToolOutputMatcher + 'static) -> Self {
        Self {
            messages: Vec::new(),
            turn: TurnState::Idle,
            matcher: Box::new(matcher),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn turn_state(&self) -> &TurnState {
        &self.turn
    }

    pub fn is_loading(&self) -> bool {
        self.turn.is_loading()
    }

    /// Replace all messages (a loaded history). Never merges.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.turn = TurnState::Idle;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// End a running turn whose stream was abandoned. Messages are kept.
    pub fn cancel_turn(&mut self) {
        if self.turn.is_loading() {
            self.turn = TurnState::Failed("cancelled".to_string());
        }
    }

    /// Begin a turn: append the human message and an empty ai placeholder.
    pub fn start_user_turn(&mut self, text: impl Into<String>) {
        self.messages
            .extend([Message::human(text), Message::ai(String::new())]);
        self.turn = TurnState::AwaitingFirstChunk;
        debug!(
            target: "agentline::transcript",
            "Turn started ({} messages)",
            self.messages.len()
        );
    }

    /// Apply one chunk on behalf of `handle`.
    ///
    /// Returns `Err(InvariantViolation)` if content arrives while the
    /// trailing message is not ai; the chunk is dropped in that case.
    pub fn apply_chunk(
        &mut self,
        tracker: &StreamTracker,
        handle: &StreamHandle,
        chunk: StreamChunk,
    ) -> Result<ApplyOutcome> {
        if !tracker.is_current(handle) {
            trace!(
                target: "agentline::transcript",
                "Discarding chunk from stale stream {}",
                handle.id()
            );
            return Ok(ApplyOutcome::Stale);
        }

        if !self.turn.is_loading() {
            trace!(
                target: "agentline::transcript",
                "Ignoring chunk for finished turn ({:?})",
                self.turn
            );
            return Ok(ApplyOutcome::Ignored);
        }

        match chunk {
            StreamChunk::Content(text) => self.apply_content(&text),
            StreamChunk::Done => {
                self.turn = TurnState::Completed;
                debug!(target: "agentline::transcript", "Turn completed");
                Ok(ApplyOutcome::Completed)
            }
            StreamChunk::Error(message) => {
                warn!(
                    target: "agentline::transcript",
                    "Turn failed with stream error: {}",
                    message
                );
                self.turn = TurnState::Failed(message.clone());
                Ok(ApplyOutcome::Failed(message))
            }
        }
    }

    /// Fail the current turn after a transport failure.
    ///
    /// Removes the trailing human/ai pair if nothing was streamed into it.
    /// Returns whether that rollback happened.
    pub fn abort_turn(
        &mut self,
        tracker: &StreamTracker,
        handle: &StreamHandle,
        reason: impl Into<String>,
    ) -> bool {
        if !tracker.is_current(handle) || !self.turn.is_loading() {
            return false;
        }

        self.turn = TurnState::Failed(reason.into());

        let len = self.messages.len();
        let unfinished_pair = len >= 2
            && self.messages[len - 2].sender == Sender::Human
            && self.messages[len - 1].sender == Sender::Ai
            && self.messages[len - 1].content.is_empty();

        if unfinished_pair {
            self.messages.truncate(len - 2);
            debug!(
                target: "agentline::transcript",
                "Rolled back unfinished turn ({} messages left)",
                self.messages.len()
            );
        }
        unfinished_pair
    }

    fn apply_content(&mut self, text: &str) -> Result<ApplyOutcome> {
        let Some(last) = self.messages.last_mut() else {
            error!(
                target: "agentline::transcript",
                "Content chunk arrived with an empty transcript; dropping it"
            );
            return Err(AgentlineError::InvariantViolation {
                expected: Sender::Ai.to_string(),
                actual: "nothing".to_string(),
            });
        };

        if last.sender != Sender::Ai {
            error!(
                target: "agentline::transcript",
                "Content chunk arrived while trailing message is {}; dropping it",
                last.sender
            );
            return Err(AgentlineError::InvariantViolation {
                expected: Sender::Ai.to_string(),
                actual: last.sender.to_string(),
            });
        }

        last.append_content(text);
        self.turn = TurnState::Streaming;

        let payloads = self.split_tool_output();
        if payloads > 0 {
            Ok(ApplyOutcome::ToolSplit { payloads })
        } else {
            Ok(ApplyOutcome::Appended)
        }
    }

    /// Scan the accumulated trailing ai message and lift tool payloads out
    /// of it: `ai(prefix)` stays, `tool(payload)` and `ai(suffix)` follow.
    fn split_tool_output(&mut self) -> usize {
        let mut payloads = 0;

        loop {
            let Some(last) = self.messages.last_mut() else {
                break;
            };
            let Some(range) = self.matcher.find(&last.content) else {
                break;
            };

            let content = &last.content;
            if range.start >= range.end
                || range.end > content.len()
                || !content.is_char_boundary(range.start)
                || !content.is_char_boundary(range.end)
            {
                warn!(
                    target: "agentline::transcript",
                    "Tool output matcher returned unusable range {:?}",
                    range
                );
                break;
            }

            let suffix = last.content.split_off(range.end);
            let payload = last.content.split_off(range.start);
            debug!(
                target: "agentline::transcript",
                "Split {} bytes of tool output out of ai message",
                payload.len()
            );
            self.messages.push(Message::tool(payload));
            self.messages.push(Message::ai(suffix));
            payloads += 1;
        }

        payloads
    }
}
