//! Terminal client for agentline: configuration, logging, and the
//! interactive loop. Kept apart from main.rs for integration testing.

pub mod config;
pub mod logging;
pub mod render;
pub mod repl;
