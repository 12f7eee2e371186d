//! Viewer analytics aggregation
//!
//! Recomputes cumulative per-viewer totals when a stream ends. Totals are
//! full recomputes rather than increments, so a re-run after a repaired
//! stream converges instead of double-counting.

use crate::gateway::{Gateway, ProfileTotals};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vantage_common::time::session_minutes;
use vantage_common::Result;

pub struct ViewerAnalytics {
    gateway: Arc<dyn Gateway>,
}

impl ViewerAnalytics {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Update profiles for every user active in the given stream.
    /// A failure for one user is logged and does not abort the rest.
    pub async fn update_for_stream(&self, stream_id: i64) -> Result<()> {
        let user_ids = self.gateway.active_user_ids(stream_id).await?;
        if user_ids.is_empty() {
            debug!(stream_id, "no active users, skipping analytics update");
            return Ok(());
        }

        info!(stream_id, users = user_ids.len(), "updating viewer analytics");
        for user_id in user_ids {
            if let Err(e) = self.update_user(user_id).await {
                warn!(user_id, error = %e, "failed to update viewer analytics");
            }
        }
        Ok(())
    }

    async fn update_user(&self, user_id: i64) -> Result<()> {
        let sessions = self.gateway.closed_sessions_for_user(user_id).await?;

        // Per-session half-up rounding, then sum; matches the dashboard's
        // per-session display
        let minutes: Vec<i64> = sessions
            .iter()
            .filter_map(|s| s.session_end.map(|end| session_minutes(s.session_start, end)))
            .collect();
        let total_watch_time: i64 = minutes.iter().sum();
        let average_session_time = if minutes.is_empty() {
            0
        } else {
            (total_watch_time as f64 / minutes.len() as f64).round() as i64
        };

        let total_messages = self.gateway.message_count(user_id).await?;
        let (total_redemptions, total_points_spent) =
            self.gateway.redemption_totals(user_id).await?;

        self.gateway
            .upsert_viewer_profile(
                &ProfileTotals {
                    user_id,
                    total_watch_time,
                    average_session_time,
                    total_messages,
                    total_redemptions,
                    total_points_spent,
                },
                Utc::now(),
            )
            .await
    }
}
