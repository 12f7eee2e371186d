//! Normalized Twitch event types
//!
//! Every transport (EventSub, IRC chat, Helix polling) is reduced to these
//! types before the ingestion core sees it. The drift-correction poller builds
//! the same types from polled data, so missed webhook events and real events
//! flow through identical code paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a chat participant as delivered by a transport.
///
/// `login` is always present; the numeric Twitch id and display name are only
/// available on transports that carry tags (Helix, EventSub).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatterIdentity {
    pub twitch_id: Option<String>,
    pub login: String,
    pub display_name: Option<String>,
}

impl ChatterIdentity {
    /// Identity known only by login (IRC membership events)
    pub fn from_login(login: impl Into<String>) -> Self {
        Self {
            twitch_id: None,
            login: login.into(),
            display_name: None,
        }
    }
}

/// Metadata describing a live broadcast, from either a stream-online event
/// or a Get Streams poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Twitch's own id for the broadcast
    pub twitch_stream_id: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
}

/// Category/title change delivered by a channel-update event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    pub title: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
}

/// Channel-point reward attached to a redemption event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInfo {
    pub twitch_id: String,
    pub title: String,
    pub cost: i64,
}

/// Normalized ingestion events
///
/// Broadcast transports push these into the dispatcher channel; the dispatcher
/// is the single consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TwitchEvent {
    /// The channel went live
    StreamOnline { metadata: StreamMetadata },

    /// The channel went offline
    StreamOffline,

    /// Game/category or title changed mid-broadcast
    ChannelUpdate { update: ChannelUpdate },

    /// A user joined chat
    ChatJoin { user: ChatterIdentity },

    /// A user left chat
    ChatPart { user: ChatterIdentity },

    /// A chat message was sent
    ChatMessage {
        user: ChatterIdentity,
        text: String,
        sent_at: DateTime<Utc>,
    },

    /// A channel-point reward was redeemed
    RedemptionAdd {
        user: ChatterIdentity,
        reward: RewardInfo,
        redeemed_at: DateTime<Utc>,
    },
}

impl TwitchEvent {
    /// Short event name for log context
    pub fn kind(&self) -> &'static str {
        match self {
            TwitchEvent::StreamOnline { .. } => "stream_online",
            TwitchEvent::StreamOffline => "stream_offline",
            TwitchEvent::ChannelUpdate { .. } => "channel_update",
            TwitchEvent::ChatJoin { .. } => "chat_join",
            TwitchEvent::ChatPart { .. } => "chat_part",
            TwitchEvent::ChatMessage { .. } => "chat_message",
            TwitchEvent::RedemptionAdd { .. } => "redemption_add",
        }
    }
}

/// Result of polling the platform for the channel's live status
#[derive(Debug, Clone)]
pub enum LiveStatus {
    Online(StreamMetadata),
    Offline,
}

/// Online/offline discriminant of a [`LiveStatus`], used as the
/// drift poller's tick-to-tick baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePhase {
    Online,
    Offline,
}

impl LiveStatus {
    pub fn phase(&self) -> LivePhase {
        match self {
            LiveStatus::Online(_) => LivePhase::Online,
            LiveStatus::Offline => LivePhase::Offline,
        }
    }
}
