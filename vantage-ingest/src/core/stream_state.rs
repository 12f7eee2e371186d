//! Stream state tracker
//!
//! Single authoritative record of "is a stream currently live, and which
//! stream row is it". Every ingestion handler consults this gate before
//! touching storage, so chat traffic between streams costs nothing.
//!
//! The tracker holds no persisted state; after a process restart or a
//! missed offline event it diverges from reality until the drift poller
//! repairs it. The tracker never repairs itself.

use crate::core::reconciler::ViewerSessionReconciler;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};
use vantage_common::{Error, Result};

#[derive(Debug, Default)]
struct StreamState {
    current_stream_id: Option<i64>,
    active: bool,
}

/// In-memory live-stream tracker, constructed once at startup and shared
/// by handle. The watch channel gates the chatter snapshot poller:
/// `Some(stream_id)` while live, `None` otherwise.
pub struct StreamStateTracker {
    state: Mutex<StreamState>,
    reconciler: Arc<ViewerSessionReconciler>,
    chatter_gate: watch::Sender<Option<i64>>,
}

impl StreamStateTracker {
    pub fn new(
        reconciler: Arc<ViewerSessionReconciler>,
        chatter_gate: watch::Sender<Option<i64>>,
    ) -> Self {
        Self {
            state: Mutex::new(StreamState::default()),
            reconciler,
            chatter_gate,
        }
    }

    /// Begin tracking a live stream.
    ///
    /// Re-starting the already-tracked stream is a no-op. Starting a
    /// *different* stream while one is tracked means two conflicting
    /// "online" signals; the call is rejected and prior state kept.
    pub async fn start_stream(&self, stream_id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.active {
            match state.current_stream_id {
                Some(active) if active == stream_id => {
                    debug!(stream_id, "start_stream for already-tracked stream, ignoring");
                    return Ok(());
                }
                active => {
                    let active = active.unwrap_or_default();
                    error!(
                        active,
                        requested = stream_id,
                        "conflicting start_stream while another stream is tracked"
                    );
                    return Err(Error::StreamConflict {
                        active,
                        requested: stream_id,
                    });
                }
            }
        }

        state.current_stream_id = Some(stream_id);
        state.active = true;
        drop(state);

        // Wake the chatter snapshot poller
        let _ = self.chatter_gate.send(Some(stream_id));
        info!(stream_id, "stream tracking started");
        Ok(())
    }

    /// Stop tracking the live stream: close all of its open view sessions,
    /// clear the in-memory state, and stop chatter polling.
    ///
    /// Returns the stream id that was being tracked, or `None` if the
    /// tracker was already inactive (a missed start; logged, not fatal).
    /// A storage failure while closing sessions propagates and leaves the
    /// tracker active so the next offline signal retries.
    pub async fn end_stream(&self) -> Result<Option<i64>> {
        let stream_id = {
            let state = self.state.lock().await;
            match (state.active, state.current_stream_id) {
                (true, Some(id)) => id,
                _ => {
                    warn!("end_stream called but no stream is tracked");
                    return Ok(None);
                }
            }
        };

        let closed = self.reconciler.close_all(stream_id).await?;

        let mut state = self.state.lock().await;
        state.current_stream_id = None;
        state.active = false;
        drop(state);

        let _ = self.chatter_gate.send(None);
        info!(stream_id, sessions_closed = closed, "stream tracking ended");
        Ok(Some(stream_id))
    }

    /// The gate: id of the tracked live stream, `None` between streams
    pub async fn current_stream_id(&self) -> Option<i64> {
        let state = self.state.lock().await;
        if state.active {
            state.current_stream_id
        } else {
            None
        }
    }
}
