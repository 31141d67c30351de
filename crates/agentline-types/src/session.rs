//! Session collaborator records.
//!
//! Request and response bodies of the session CRUD and file endpoints the
//! controller talks to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Message, Sender};

/// Response of the create-session endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: String,
}

/// Response of the list-sessions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionIdsResponse {
    #[serde(default)]
    pub session_ids: Vec<String>,
}

/// One stored message as returned by the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender: Sender,
    /// Null for ai rows that only carried tool calls
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<Value>,
}

impl MessageRecord {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Names of the tools this row invoked, in call order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tool_calls
            .iter()
            .filter_map(|call| call.get("name").and_then(Value::as_str))
    }
}

/// Rows without text that only invoked tools are shown the way the live
/// stream announces a tool call.
impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        let content = match record.content.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => record
                .tool_names()
                .map(|name| format!("[Using tool: {}]", name))
                .collect(),
        };
        Message::new(record.sender, content)
    }
}

/// Response of the fetch-messages endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagesResponse {
    #[serde(default)]
    pub message: Vec<MessageRecord>,
}

/// Response of the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub path: String,
}

/// Error body some endpoints return with a success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "detail")]
    pub error: String,
}
