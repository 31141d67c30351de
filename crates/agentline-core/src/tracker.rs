//! Single-active-stream bookkeeping.
//!
//! Every stream attempt gets a [`StreamHandle`]. Starting a new stream
//! pre-empts the previous one by flagging its handle as aborted; nothing is
//! queued and the old transport is left to finish on its own. Whoever mutates
//! the transcript on behalf of a stream asks [`StreamTracker::is_current`]
//! first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Cancellation token for one stream attempt.
///
/// Clones share the aborted flag, so the stream pump can observe an abort
/// issued by the controller.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    id: u64,
    owner_session_id: String,
    aborted: Arc<AtomicBool>,
}

impl StreamHandle {
    fn new(id: u64, owner_session_id: String) -> Self {
        Self {
            id,
            owner_session_id,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Session the stream was started for.
    pub fn owner_session_id(&self) -> &str {
        &self.owner_session_id
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }
}

impl PartialEq for StreamHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StreamHandle {}

/// Owns the one stream that may currently mutate the transcript.
#[derive(Debug, Default)]
pub struct StreamTracker {
    current: Option<StreamHandle>,
    next_id: u64,
}

impl StreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new stream for `session_id`, aborting whatever was current.
    pub fn begin(&mut self, session_id: impl Into<String>) -> StreamHandle {
        if let Some(previous) = self.current.take() {
            previous.abort();
            debug!(
                target: "agentline::stream",
                "Stream {} pre-empted by a new stream",
                previous.id
            );
        }

        self.next_id += 1;
        let handle = StreamHandle::new(self.next_id, session_id.into());
        debug!(
            target: "agentline::stream",
            "Stream {} started for session {}",
            handle.id,
            handle.owner_session_id
        );
        self.current = Some(handle.clone());
        handle
    }

    /// Admission check for every chunk-apply path.
    pub fn is_current(&self, handle: &StreamHandle) -> bool {
        !handle.is_aborted() && self.current.as_ref().is_some_and(|c| c.id == handle.id)
    }

    /// Abort the current stream without starting another one.
    ///
    /// Returns the aborted handle, if there was one.
    pub fn abort_current(&mut self) -> Option<StreamHandle> {
        let handle = self.current.take()?;
        handle.abort();
        debug!(target: "agentline::stream", "Stream {} aborted", handle.id);
        Some(handle)
    }

    /// The current handle, if any.
    pub fn current(&self) -> Option<&StreamHandle> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_installs_current() {
        let mut tracker = StreamTracker::new();
        let handle = tracker.begin("s1");
        assert!(tracker.is_current(&handle));
        assert!(!handle.is_aborted());
        assert_eq!(handle.owner_session_id(), "s1");
    }

    #[test]
    fn test_begin_preempts_previous() {
        let mut tracker = StreamTracker::new();
        let first = tracker.begin("s1");
        let second = tracker.begin("s1");

        assert!(first.is_aborted());
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
        assert_ne!(first, second);
    }

    #[test]
    fn test_at_most_one_live_handle() {
        let mut tracker = StreamTracker::new();
        let handles: Vec<StreamHandle> = (0..5).map(|_| tracker.begin("s")).collect();
        let live = handles.iter().filter(|h| !h.is_aborted()).count();
        assert_eq!(live, 1);
        assert!(tracker.is_current(handles.last().unwrap()));
    }

    #[test]
    fn test_abort_current_clears() {
        let mut tracker = StreamTracker::new();
        let handle = tracker.begin("s1");
        let aborted = tracker.abort_current().unwrap();

        assert_eq!(aborted, handle);
        assert!(handle.is_aborted());
        assert!(!tracker.is_current(&handle));
        assert!(tracker.current().is_none());
        assert!(tracker.abort_current().is_none());
    }

    #[test]
    fn test_clone_shares_abort_flag() {
        let mut tracker = StreamTracker::new();
        let handle = tracker.begin("s1");
        let pump_copy = handle.clone();
        tracker.begin("s2");
        assert!(pump_copy.is_aborted());
    }
}
