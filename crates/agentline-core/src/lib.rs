//! Streaming chat session client for agentline.
//!
//! Data flows one way: backend bytes → [`FrameDecoder`] lines →
//! [`EventInterpreter`] chunks → [`Transcript`] messages. The
//! [`SessionController`] owns the state and gates every mutation through the
//! [`StreamTracker`].

mod backend;
mod banner;
mod decoder;
mod error;
mod interpreter;
mod pump;
mod session;
mod tool_output;
mod tracker;
mod transcript;

pub use backend::{ByteStream, HttpBackend, HttpBackendConfig, SessionBackend};
pub use banner::{Banner, BannerKind, StatusBanner};
pub use decoder::{FrameDecoder, decode_lines};
pub use error::AgentlineError;
pub use interpreter::{DEFAULT_EVENT_PREFIX, EventInterpreter};
pub use pump::{StreamEvent, StreamUpdate};
pub use session::{ControllerConfig, SessionController, TranscriptSnapshot};
pub use tool_output::{
    PathPayloadMatcher, ToolOutputMatcher, file_reference, latest_file_reference,
};
pub use tracker::{StreamHandle, StreamTracker};
pub use transcript::{ApplyOutcome, Transcript};

/// Result type for agentline operations.
pub type Result<T> = std::result::Result<T, AgentlineError>;
