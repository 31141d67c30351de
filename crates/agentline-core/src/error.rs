//! Error types for agentline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentlineError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Stream decode error: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Message is empty")]
    EmptyInput,

    #[error("Transcript invariant violated: expected trailing {expected}, got {actual}")]
    InvariantViolation { expected: String, actual: String },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

impl AgentlineError {
    /// Whether a backend answer was a 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            AgentlineError::Backend { status, .. } => *status == 404,
            AgentlineError::Http(e) => e.status().is_some_and(|s| s.as_u16() == 404),
            _ => false,
        }
    }
}
