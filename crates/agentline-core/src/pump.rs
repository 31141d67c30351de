//! Stream pump: one spawned task per stream attempt.
//!
//! The pump owns the network response, runs it through the frame decoder and
//! the event interpreter, and forwards the resulting chunks to the controller
//! tagged with the stream's handle. It never touches the transcript itself.

use crate::backend::SessionBackend;
use crate::decoder::decode_lines;
use crate::interpreter::EventInterpreter;
use crate::tracker::StreamHandle;
use crate::AgentlineError;
use agentline_types::{ChatRequest, StreamChunk};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What a stream produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An interpreted chunk, in line order
    Chunk(StreamChunk),
    /// The request failed before the first line arrived
    TransportFailed(String),
}

/// A stream event addressed to the stream that produced it.
#[derive(Debug, Clone)]
pub struct StreamUpdate {
    pub handle: StreamHandle,
    pub event: StreamEvent,
}

pub(crate) async fn run_stream(
    backend: Arc<dyn SessionBackend>,
    interpreter: EventInterpreter,
    handle: StreamHandle,
    request: ChatRequest,
    updates: mpsc::UnboundedSender<StreamUpdate>,
) {
    let send = |event: StreamEvent| {
        updates
            .send(StreamUpdate {
                handle: handle.clone(),
                event,
            })
            .is_ok()
    };

    let body = match backend.open_stream(&request).await {
        Ok(body) => body,
        Err(e) => {
            warn!(
                target: "agentline::stream",
                "Stream {} failed to open: {}",
                handle.id(),
                e
            );
            send(StreamEvent::TransportFailed(e.to_string()));
            return;
        }
    };

    let mut lines = std::pin::pin!(decode_lines(body));
    let mut saw_line = false;

    while let Some(line) = lines.next().await {
        if handle.is_aborted() {
            debug!(
                target: "agentline::stream",
                "Stream {} aborted; dropping connection",
                handle.id()
            );
            return;
        }

        match line {
            Ok(line) => {
                saw_line = true;
                let Some(chunk) = interpreter.interpret(&line) else {
                    continue;
                };
                let terminal = chunk.is_terminal();
                if !send(StreamEvent::Chunk(chunk)) || terminal {
                    return;
                }
            }
            Err(e) => {
                warn!(
                    target: "agentline::stream",
                    "Stream {} failed while reading: {}",
                    handle.id(),
                    e
                );
                let event = match e {
                    AgentlineError::Decode(_) => StreamEvent::Chunk(StreamChunk::Error(e.to_string())),
                    _ if saw_line => StreamEvent::Chunk(StreamChunk::Error(e.to_string())),
                    _ => StreamEvent::TransportFailed(e.to_string()),
                };
                send(event);
                return;
            }
        }
    }

    if handle.is_aborted() {
        return;
    }

    debug!(
        target: "agentline::stream",
        "Stream {} closed without an end event; treating as done",
        handle.id()
    );
    send(StreamEvent::Chunk(StreamChunk::Done));
}
