//! Session controller: the one owner of conversation state.
//!
//! The controller holds the transcript, the stream tracker and the status
//! banner. Streams run as spawned pump tasks which only send updates back
//! over a channel; every state change happens here, through `&mut self`.

use crate::backend::SessionBackend;
use crate::banner::{Banner, StatusBanner};
use crate::interpreter::{DEFAULT_EVENT_PREFIX, EventInterpreter};
use crate::pump::{self, StreamEvent, StreamUpdate};
use crate::tool_output::ToolOutputMatcher;
use crate::tracker::{StreamHandle, StreamTracker};
use crate::transcript::{ApplyOutcome, Transcript};
use crate::{AgentlineError, Result};
use agentline_types::{ChatRequest, Message, TurnState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Configuration for the session controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How long upload notices stay visible
    pub notice_ttl: Duration,
    /// Prefix every event line carries
    pub event_prefix: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            notice_ttl: Duration::from_secs(3),
            event_prefix: DEFAULT_EVENT_PREFIX.to_string(),
        }
    }
}

/// Everything a renderer needs, copied out of the controller.
#[derive(Debug, Clone)]
pub struct TranscriptSnapshot {
    pub session_id: Option<String>,
    pub messages: Vec<Message>,
    pub turn: TurnState,
    pub banner: Option<Banner>,
}

impl TranscriptSnapshot {
    pub fn is_loading(&self) -> bool {
        self.turn.is_loading()
    }
}

/// Drives one conversation against a [`SessionBackend`].
pub struct SessionController {
    backend: Arc<dyn SessionBackend>,
    interpreter: EventInterpreter,
    tracker: StreamTracker,
    transcript: Transcript,
    session_id: Option<String>,
    banner: StatusBanner,
    updates_tx: mpsc::UnboundedSender<StreamUpdate>,
    updates_rx: mpsc::UnboundedReceiver<StreamUpdate>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn SessionBackend>, config: ControllerConfig) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            interpreter: EventInterpreter::new(config.event_prefix),
            tracker: StreamTracker::new(),
            transcript: Transcript::new(),
            session_id: None,
            banner: StatusBanner::new(config.notice_ttl),
            updates_tx,
            updates_rx,
        }
    }

    /// Use a different tool-output matcher. Clears the transcript.
    pub fn with_matcher(mut self, matcher: impl ToolOutputMatcher + 'static) -> Self {
        self.transcript = Transcript::with_matcher(matcher);
        self
    }

    // ========================================================================
    // Turns
    // ========================================================================

    /// Send a user message and start streaming the reply.
    ///
    /// Creates a session first if none is active. Any stream still running
    /// is superseded: its remaining output is discarded.
    pub async fn send_message(&mut self, text: &str) -> Result<StreamHandle> {
        if text.trim().is_empty() {
            return Err(AgentlineError::EmptyInput);
        }

        let session_id = match &self.session_id {
            Some(id) => id.clone(),
            None => {
                let created = self.backend.create_session().await;
                let id = self.report(created)?;
                info!(target: "agentline::session", "Created session {}", id);
                self.session_id = Some(id.clone());
                id
            }
        };

        self.transcript.start_user_turn(text);
        let handle = self.tracker.begin(session_id.clone());
        debug!(
            target: "agentline::session",
            "Starting stream {} for session {}",
            handle.id(),
            session_id
        );

        let request = ChatRequest {
            session_id,
            user_input: text.to_string(),
        };
        tokio::spawn(pump::run_stream(
            Arc::clone(&self.backend),
            self.interpreter.clone(),
            handle.clone(),
            request,
            self.updates_tx.clone(),
        ));

        Ok(handle)
    }

    /// Wait for the next stream update and apply it.
    ///
    /// Pending forever when no stream is producing; meant for `select!`.
    pub async fn next_update(&mut self) -> Option<Result<ApplyOutcome>> {
        let update = self.updates_rx.recv().await?;
        Some(self.apply_update(update))
    }

    /// Apply updates until the running turn ends.
    pub async fn wait_for_turn(&mut self) -> Result<()> {
        while self.transcript.is_loading() {
            match self.next_update().await {
                Some(outcome) => {
                    outcome?;
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Apply one update produced by a stream pump.
    pub fn apply_update(&mut self, update: StreamUpdate) -> Result<ApplyOutcome> {
        let StreamUpdate { handle, event } = update;

        match event {
            StreamEvent::Chunk(chunk) => {
                let applied = self.transcript.apply_chunk(&self.tracker, &handle, chunk);
                match applied {
                    Ok(ApplyOutcome::Failed(message)) => {
                        self.banner.raise_error(message.clone());
                        Ok(ApplyOutcome::Failed(message))
                    }
                    Ok(outcome) => Ok(outcome),
                    Err(e) => {
                        error!(
                            target: "agentline::session",
                            "Dropped chunk from stream {}: {}",
                            handle.id(),
                            e
                        );
                        self.banner.raise_error(e.to_string());
                        Err(e)
                    }
                }
            }
            StreamEvent::TransportFailed(reason) => {
                if !self.tracker.is_current(&handle) {
                    return Ok(ApplyOutcome::Stale);
                }
                if !self.transcript.is_loading() {
                    return Ok(ApplyOutcome::Ignored);
                }

                let rolled_back = self.transcript.abort_turn(&self.tracker, &handle, reason.clone());
                warn!(
                    target: "agentline::session",
                    "Stream {} failed before any output (rolled back: {}): {}",
                    handle.id(),
                    rolled_back,
                    reason
                );
                self.banner.raise_error(reason.clone());
                Ok(ApplyOutcome::TransportFailed {
                    reason,
                    rolled_back,
                })
            }
        }
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Switch to a stored session, replacing the transcript with its history.
    pub async fn load_session(&mut self, session_id: &str) -> Result<()> {
        if let Some(aborted) = self.tracker.abort_current() {
            debug!(
                target: "agentline::session",
                "Aborted stream {} to load session {}",
                aborted.id(),
                session_id
            );
        }
        self.transcript.cancel_turn();

        let fetched = self.backend.fetch_messages(session_id).await;
        let records = self.report(fetched)?;
        let messages: Vec<Message> = records.into_iter().map(Message::from).collect();

        info!(
            target: "agentline::session",
            "Loaded session {} ({} messages)",
            session_id,
            messages.len()
        );
        self.transcript.replace(messages);
        self.session_id = Some(session_id.to_string());
        Ok(())
    }

    /// Drop the active session. The next message starts a fresh one.
    pub fn clear_session(&mut self) {
        self.tracker.abort_current();
        self.transcript.clear();
        if let Some(id) = self.session_id.take() {
            debug!(target: "agentline::session", "Cleared session {}", id);
        }
    }

    pub async fn list_sessions(&mut self) -> Result<Vec<String>> {
        let listed = self.backend.list_sessions().await;
        self.report(listed)
    }

    /// Delete a stored session. Unknown ids are not an error.
    pub async fn delete_session(&mut self, session_id: &str) -> Result<()> {
        match self.backend.delete_session(session_id).await {
            Ok(()) => {
                info!(target: "agentline::session", "Session {} deleted", session_id);
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    target: "agentline::session",
                    "Session {} was already gone",
                    session_id
                );
            }
            Err(e) => return self.report(Err(e)),
        }

        if self.session_id.as_deref() == Some(session_id) {
            self.clear_session();
        }
        Ok(())
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Upload a file for the agent and return the reference to mention.
    pub async fn upload_file(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        self.banner.raise_notice(format!("Uploading {}...", file_name));
        let uploaded = self.backend.upload_file(file_name, bytes).await;
        let path = self.report(uploaded)?;
        info!(target: "agentline::session", "Uploaded {} as {}", file_name, path);
        self.banner.raise_notice(format!("Uploaded {}", file_name));
        Ok(path)
    }

    pub async fn download_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let downloaded = self.backend.download_file(path).await;
        self.report(downloaded)
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn turn_state(&self) -> &TurnState {
        self.transcript.turn_state()
    }

    pub fn is_loading(&self) -> bool {
        self.transcript.is_loading()
    }

    pub fn current_stream(&self) -> Option<&StreamHandle> {
        self.tracker.current()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.current()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner.dismiss();
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            session_id: self.session_id.clone(),
            messages: self.transcript.messages().to_vec(),
            turn: self.transcript.turn_state().clone(),
            banner: self.banner.current().cloned(),
        }
    }

    /// Surface a failed backend call on the banner.
    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(target: "agentline::session", "Backend call failed: {}", e);
            self.banner.raise_error(e.to_string());
        }
        result
    }
}
