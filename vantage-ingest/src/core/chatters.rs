//! Chatter snapshot poller
//!
//! While a stream is live, periodically fetches the full set of users
//! present in chat and hands it to the reconciler. This is what credits
//! watch time to lurkers who never produce a join/part event, and what
//! closes sessions for users who left silently.
//!
//! The poller is gated by the tracker's watch channel: it sleeps between
//! streams and is woken with the live stream's id.

use crate::core::reconciler::ViewerSessionReconciler;
use crate::twitch::Ingress;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use vantage_common::Result;

pub struct ChatterPoller {
    ingress: Arc<dyn Ingress>,
    reconciler: Arc<ViewerSessionReconciler>,
    interval: Duration,
}

impl ChatterPoller {
    pub fn new(
        ingress: Arc<dyn Ingress>,
        reconciler: Arc<ViewerSessionReconciler>,
        interval: Duration,
    ) -> Self {
        Self {
            ingress,
            reconciler,
            interval,
        }
    }

    /// Run until the gate channel is dropped. The first snapshot of each
    /// stream is taken immediately on wake, the rest on the interval.
    pub fn spawn(self, mut gate: watch::Receiver<Option<i64>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                // Sleep until a stream is active
                let stream_id = loop {
                    if let Some(id) = *gate.borrow() {
                        break id;
                    }
                    if gate.changed().await.is_err() {
                        return;
                    }
                };

                info!(stream_id, "chatter polling started");
                let mut ticker = tokio::time::interval(self.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if let Err(e) = self.poll_once(stream_id).await {
                                warn!(stream_id, error = %e, "chatter snapshot failed, will retry");
                            }
                        }
                        changed = gate.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            if gate.borrow().is_none() {
                                info!(stream_id, "chatter polling stopped");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    async fn poll_once(&self, stream_id: i64) -> Result<()> {
        let chatters = self.ingress.get_present_chat_users().await?;
        debug!(stream_id, count = chatters.len(), "chatter snapshot fetched");
        self.reconciler.reconcile(&chatters, stream_id).await
    }
}
