//! Shared types for the agentline streaming chat client.

mod chat;
mod session;
mod wire;

pub use chat::*;
pub use session::*;
pub use wire::*;
