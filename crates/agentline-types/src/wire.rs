//! Streaming wire protocol.
//!
//! The chat endpoint answers with text lines. Event lines carry a JSON payload
//! after a `data: ` prefix; everything else is framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the streaming chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub session_id: String,
    pub user_input: String,
}

/// Payload of one `data: ` line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Model prose
    Content {
        #[serde(default)]
        content: String,
    },
    /// The agent decided to invoke a tool
    ToolCall {
        #[serde(default)]
        tool: String,
    },
    /// Tool output; servers may send a string or a structured value
    ToolResult {
        #[serde(default)]
        content: Value,
    },
    /// End of the turn
    End,
    /// Application-level failure
    Error {
        #[serde(default)]
        message: String,
    },
    /// Any event type this client does not know
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_events() {
        let event: WireEvent = serde_json::from_str(r#"{"type":"content","content":"Hi"}"#).unwrap();
        assert_eq!(event, WireEvent::Content { content: "Hi".into() });

        let event: WireEvent = serde_json::from_str(r#"{"type":"tool_call","tool":"web_search"}"#).unwrap();
        assert_eq!(event, WireEvent::ToolCall { tool: "web_search".into() });

        let event: WireEvent = serde_json::from_str(r#"{"type":"end"}"#).unwrap();
        assert_eq!(event, WireEvent::End);

        let event: WireEvent = serde_json::from_str(r#"{"type":"error","message":"quota"}"#).unwrap();
        assert_eq!(event, WireEvent::Error { message: "quota".into() });
    }

    #[test]
    fn test_tool_result_accepts_structured_content() {
        let event: WireEvent =
            serde_json::from_str(r#"{"type":"tool_result","content":{"path":"/tmp/a.csv"}}"#).unwrap();
        assert_eq!(
            event,
            WireEvent::ToolResult { content: json!({"path": "/tmp/a.csv"}) }
        );
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let event: WireEvent = serde_json::from_str(r#"{"type":"thinking","content":"hmm"}"#).unwrap();
        assert_eq!(event, WireEvent::Unknown);
    }

    #[test]
    fn test_missing_type_is_an_error() {
        assert!(serde_json::from_str::<WireEvent>(r#"{"content":"x"}"#).is_err());
    }

    #[test]
    fn test_chat_request_shape() {
        let req = ChatRequest {
            session_id: "abc".into(),
            user_input: "hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"session_id": "abc", "user_input": "hello"})
        );
    }
}
