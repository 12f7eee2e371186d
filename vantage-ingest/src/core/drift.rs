//! Drift-correction poller
//!
//! Webhook-style events can be dropped, delayed, or lost to a restart, so
//! the in-memory tracker, the persisted open-stream row, and the platform's
//! actual live status can disagree. Every tick this poller re-derives
//! ground truth from the platform and pushes both layers back into
//! agreement, reusing the exact lifecycle code path a real event would
//! have taken.
//!
//! Ticks run strictly sequentially inside one spawned task; `stop()` lets
//! an in-flight tick finish rather than cancelling it.

use crate::core::stream_state::StreamStateTracker;
use crate::gateway::Gateway;
use crate::lifecycle::StreamLifecycle;
use crate::twitch::Ingress;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use vantage_common::events::{LivePhase, LiveStatus};
use vantage_common::Result;

pub struct DriftCorrectionPoller {
    ingress: Arc<dyn Ingress>,
    gateway: Arc<dyn Gateway>,
    tracker: Arc<StreamStateTracker>,
    lifecycle: Arc<StreamLifecycle>,
    interval: Duration,
    /// Last successfully observed phase; `None` until the first good tick
    baseline: Mutex<Option<LivePhase>>,
    shutdown: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DriftCorrectionPoller {
    pub fn new(
        ingress: Arc<dyn Ingress>,
        gateway: Arc<dyn Gateway>,
        tracker: Arc<StreamStateTracker>,
        lifecycle: Arc<StreamLifecycle>,
        interval: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            ingress,
            gateway,
            tracker,
            lifecycle,
            interval,
            baseline: Mutex::new(None),
            shutdown,
            task: std::sync::Mutex::new(None),
        }
    }

    /// Spawn the polling task. A failed tick keeps the previous baseline
    /// and never takes the task down.
    pub fn start(self: &Arc<Self>) {
        let poller = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = poller.interval.as_secs(),
                "drift-correction polling started"
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = poller.tick().await {
                            warn!(error = %e, "drift check failed, keeping previous baseline");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("drift-correction polling stopped");
                        return;
                    }
                }
            }
        });

        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
    }

    /// Request shutdown; the in-flight tick, if any, completes first
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// One repair pass. Public so tests (and an operator endpoint) can
    /// trigger it without the timer.
    pub async fn tick(&self) -> Result<()> {
        let status = self.ingress.get_current_live_status().await?;
        let observed = status.phase();

        let mut baseline = self.baseline.lock().await;

        // First observation since startup: nothing to compare against, and
        // deliberately no repair either, so a poller racing the real online
        // event at startup cannot open a duplicate stream
        let Some(previous) = *baseline else {
            info!(?observed, "recorded initial live-status baseline");
            *baseline = Some(observed);
            return Ok(());
        };

        // Missed transition: drive the same handling a real event would
        if previous != observed {
            warn!(
                ?previous,
                ?observed,
                "missed stream transition detected, synthesizing event"
            );
            match &status {
                LiveStatus::Online(metadata) => self.lifecycle.handle_online(metadata).await?,
                LiveStatus::Offline => self.lifecycle.handle_offline().await?,
            }
        }

        // Persisted-state repair. Must run before the in-memory repair:
        // re-activating the tracker needs an open row id to attach to.
        let open = self.gateway.find_open_stream().await?;
        match (&open, &status) {
            (Some(stream), LiveStatus::Offline) => {
                warn!(
                    stream_id = stream.id,
                    "open stream row but platform reports offline, closing"
                );
                self.lifecycle.handle_offline().await?;
            }
            (None, LiveStatus::Online(metadata)) => {
                warn!(
                    twitch_stream_id = %metadata.twitch_stream_id,
                    "platform reports online but no open stream row, opening"
                );
                self.lifecycle.handle_online(metadata).await?;
            }
            _ => {
                debug!(?observed, "persisted state agrees with platform");
            }
        }

        // In-memory repair
        let tracked = self.tracker.current_stream_id().await;
        let should_be_active = observed == LivePhase::Online;
        match (tracked, should_be_active) {
            (Some(stream_id), false) => {
                warn!(stream_id, "tracker active but platform reports offline, ending");
                self.tracker.end_stream().await?;
            }
            (None, true) => {
                if let Some(stream) = self.gateway.find_open_stream().await? {
                    warn!(
                        stream_id = stream.id,
                        "tracker inactive but platform reports online, starting"
                    );
                    self.tracker.start_stream(stream.id).await?;
                }
            }
            _ => {}
        }

        *baseline = Some(observed);
        Ok(())
    }
}
