//! Common test utilities for controller integration tests.

#![allow(dead_code)]

use agentline_core::{AgentlineError, ByteStream, Result, SessionBackend};
use agentline_types::{ChatRequest, MessageRecord};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Load a recorded event-stream body from the fixtures directory.
pub fn load_stream_fixture(name: &str) -> Vec<u8> {
    let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("streams")
        .join(format!("{}.txt", name));

    std::fs::read(&fixture_path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", fixture_path.display(), e))
}

/// Format one protocol line.
pub fn event_line(json: &str) -> String {
    format!("data: {}\n", json)
}

/// Generate a fresh session id.
pub fn test_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// What the next `open_stream` call answers with.
pub enum StreamScript {
    Fail(String),
    Body(mpsc::UnboundedReceiver<Result<Vec<u8>>>),
}

/// Writing end of a scripted stream body. Dropping it ends the body.
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<Result<Vec<u8>>>,
}

impl StreamFeed {
    pub fn bytes(&self, bytes: &[u8]) {
        let _ = self.tx.send(Ok(bytes.to_vec()));
    }

    pub fn line(&self, json: &str) {
        self.bytes(event_line(json).as_bytes());
    }

    pub fn content(&self, text: &str) {
        let json = serde_json::json!({ "type": "content", "content": text });
        self.line(&json.to_string());
    }

    pub fn end(&self) {
        self.line(r#"{"type": "end"}"#);
    }

    /// Make the next read fail, as a dropped connection would.
    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(Err(AgentlineError::Transport(message.to_string())));
    }
}

pub fn stream_channel() -> (StreamFeed, StreamScript) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StreamFeed { tx }, StreamScript::Body(rx))
}

/// In-memory backend answering streams from a script queue.
#[derive(Default)]
pub struct ScriptedBackend {
    sessions: Mutex<Vec<String>>,
    histories: Mutex<HashMap<String, Vec<MessageRecord>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    requests: Mutex<Vec<ChatRequest>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().unwrap().push_back(script);
    }

    /// Queue a complete body that arrives in one piece.
    pub fn push_body(&self, body: impl Into<Vec<u8>>) {
        let (feed, script) = stream_channel();
        feed.bytes(&body.into());
        self.push_stream(script);
    }

    pub fn push_failure(&self, message: &str) {
        self.push_stream(StreamScript::Fail(message.to_string()));
    }

    pub fn insert_session(&self, session_id: &str, history: Vec<MessageRecord>) {
        self.sessions.lock().unwrap().push(session_id.to_string());
        self.histories
            .lock()
            .unwrap()
            .insert(session_id.to_string(), history);
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn not_found(what: &str) -> AgentlineError {
        AgentlineError::Backend {
            status: 404,
            message: format!("{} not found", what),
        }
    }
}

#[async_trait]
impl SessionBackend for ScriptedBackend {
    async fn create_session(&self) -> Result<String> {
        let id = test_session_id();
        self.insert_session(&id, Vec::new());
        Ok(id)
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self.session_ids())
    }

    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        self.histories
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Self::not_found("Session"))
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|id| id != session_id);
        if sessions.len() == before {
            return Err(Self::not_found("Session"));
        }
        self.histories.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let path = format!("/uploads/{}", file_name);
        self.files.lock().unwrap().insert(path.clone(), bytes);
        Ok(path)
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found("File"))
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.streams.lock().unwrap().pop_front();
        match script {
            Some(StreamScript::Body(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            Some(StreamScript::Fail(message)) => Err(AgentlineError::Transport(message)),
            None => Err(AgentlineError::Transport("no scripted stream".to_string())),
        }
    }
}
