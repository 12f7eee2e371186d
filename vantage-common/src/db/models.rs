//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Chat participant resolved to a database row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub twitch_id: Option<String>,
    pub login: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One continuous broadcast. `end_time IS NULL` means live; at most one
/// such row should exist at a time (repaired by the drift poller).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stream {
    pub id: i64,
    pub twitch_stream_id: Option<String>,
    pub title: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}

/// Sub-interval of a stream during which one category/title was active.
/// `end_time IS NULL` marks the current segment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StreamSegment {
    pub id: i64,
    pub stream_id: i64,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub title: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Interval during which a viewer was present in chat; the watch-time proxy.
/// `session_end IS NULL` means currently present.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ViewSession {
    pub id: i64,
    pub user_id: i64,
    pub stream_id: i64,
    pub session_start: DateTime<Utc>,
    pub session_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    pub stream_id: i64,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChannelReward {
    pub id: i64,
    pub twitch_id: String,
    pub title: String,
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Redemption {
    pub id: i64,
    pub user_id: i64,
    pub stream_id: i64,
    pub reward_id: i64,
    pub redeemed_at: DateTime<Utc>,
}

/// Cumulative per-viewer analytics, recomputed when a stream ends.
/// Watch time and average session time are whole minutes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ViewerProfile {
    pub user_id: i64,
    pub total_watch_time: i64,
    pub average_session_time: i64,
    pub total_messages: i64,
    pub total_redemptions: i64,
    pub total_points_spent: i64,
    pub last_seen: Option<DateTime<Utc>>,
}
