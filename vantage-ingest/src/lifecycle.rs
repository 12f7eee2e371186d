//! Stream lifecycle handling
//!
//! One code path for stream-online, stream-offline, and channel-update,
//! shared by the real event transport and the drift-correction poller's
//! synthesized events. Keeps the stream row, its segments, the in-memory
//! tracker, and the viewer analytics in step.

use crate::analytics::ViewerAnalytics;
use crate::core::stream_state::StreamStateTracker;
use crate::gateway::Gateway;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use vantage_common::events::{ChannelUpdate, StreamMetadata};
use vantage_common::Result;

pub struct StreamLifecycle {
    gateway: Arc<dyn Gateway>,
    tracker: Arc<StreamStateTracker>,
    analytics: ViewerAnalytics,
}

impl StreamLifecycle {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        tracker: Arc<StreamStateTracker>,
        analytics: ViewerAnalytics,
    ) -> Self {
        Self {
            gateway,
            tracker,
            analytics,
        }
    }

    /// Stream went live: create the stream row and its first segment,
    /// then start tracking.
    ///
    /// Gated on the tracker like every other handler: a second online
    /// signal while live would otherwise leave two open stream rows.
    pub async fn handle_online(&self, metadata: &StreamMetadata) -> Result<()> {
        if let Some(active) = self.tracker.current_stream_id().await {
            warn!(
                active,
                twitch_stream_id = %metadata.twitch_stream_id,
                "stream-online while already tracking a live stream, ignoring"
            );
            return Ok(());
        }

        let stream_id = self.gateway.create_stream(metadata).await?;
        self.gateway
            .open_segment(
                stream_id,
                metadata.category_id.as_deref(),
                metadata.category_name.as_deref(),
                Some(&metadata.title),
                metadata.started_at,
            )
            .await?;
        self.tracker.start_stream(stream_id).await?;

        info!(
            stream_id,
            title = %metadata.title,
            category = metadata.category_name.as_deref().unwrap_or("unknown"),
            "stream online"
        );
        Ok(())
    }

    /// Stream went offline: close the row, its open segment, and tracking,
    /// then fold the stream into the cumulative viewer analytics.
    pub async fn handle_offline(&self) -> Result<()> {
        let now = Utc::now();

        let Some(stream) = self.gateway.find_open_stream().await? else {
            warn!("stream-offline but no open stream row to close");
            // The tracker may still believe it is live (row lost or never
            // created); end_stream is a no-op when already inactive
            self.tracker.end_stream().await?;
            return Ok(());
        };

        self.gateway.close_open_segments(stream.id, now).await?;
        self.gateway.close_stream(stream.id, now).await?;

        // Closes all open sessions for the tracked stream
        let tracked = self.tracker.end_stream().await?;
        if tracked.is_none() {
            // Tracker missed the start; sweep sessions left open on the row
            let orphaned = self
                .gateway
                .close_sessions_for_stream(stream.id, now)
                .await?;
            if orphaned > 0 {
                warn!(
                    stream_id = stream.id,
                    orphaned, "closed sessions for untracked stream"
                );
            }
        }

        self.analytics.update_for_stream(stream.id).await?;
        info!(stream_id = stream.id, "stream offline");
        Ok(())
    }

    /// Category/title changed mid-broadcast: rotate the open segment
    pub async fn handle_channel_update(&self, update: &ChannelUpdate) -> Result<()> {
        let Some(stream_id) = self.tracker.current_stream_id().await else {
            warn!("channel-update with no active stream, ignoring");
            return Ok(());
        };

        let now = Utc::now();
        self.gateway.close_open_segments(stream_id, now).await?;
        self.gateway
            .open_segment(
                stream_id,
                update.category_id.as_deref(),
                update.category_name.as_deref(),
                Some(&update.title),
                now,
            )
            .await?;

        info!(
            stream_id,
            category = update.category_name.as_deref().unwrap_or("unknown"),
            title = %update.title,
            "segment rotated on channel update"
        );
        Ok(())
    }
}
