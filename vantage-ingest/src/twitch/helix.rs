//! Helix API client
//!
//! Implements the [`Ingress`] pull interface with two endpoints:
//! Get Streams (live status + broadcast metadata) and Get Chatters
//! (paginated presence snapshot). Token refresh is out of scope; the
//! configured user token must carry `moderator:read:chatters`.

use crate::twitch::Ingress;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use vantage_common::config::{ChannelConfig, TwitchConfig};
use vantage_common::events::{ChatterIdentity, LiveStatus, StreamMetadata};
use vantage_common::{Error, Result};

const HELIX_BASE: &str = "https://api.twitch.tv/helix";

/// Page size for Get Chatters (Helix maximum)
const CHATTERS_PAGE: usize = 1000;

pub struct HelixClient {
    http: reqwest::Client,
    client_id: String,
    token: String,
    broadcaster_id: String,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    data: Vec<HelixStream>,
}

#[derive(Debug, Deserialize)]
struct HelixStream {
    id: String,
    title: String,
    started_at: DateTime<Utc>,
    game_id: String,
    game_name: String,
    thumbnail_url: String,
}

#[derive(Debug, Deserialize)]
struct ChattersResponse {
    data: Vec<HelixChatter>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct HelixChatter {
    user_id: String,
    user_login: String,
    user_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    cursor: Option<String>,
}

impl HelixClient {
    pub fn new(twitch: &TwitchConfig, channel: &ChannelConfig) -> Result<Self> {
        if twitch.client_id.is_empty() || twitch.token.is_empty() {
            return Err(Error::Config(
                "twitch.client_id and twitch.token are required for Helix polling".to_string(),
            ));
        }
        if channel.broadcaster_id.is_empty() {
            return Err(Error::Config(
                "channel.broadcaster_id is required for Helix polling".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            client_id: twitch.client_id.clone(),
            token: twitch.token.clone(),
            broadcaster_id: channel.broadcaster_id.clone(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Twitch(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Twitch(format!("{url} returned {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Twitch(format!("invalid response from {url}: {e}")))
    }
}

fn none_if_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<HelixStream> for StreamMetadata {
    fn from(stream: HelixStream) -> Self {
        StreamMetadata {
            twitch_stream_id: stream.id,
            title: stream.title,
            started_at: stream.started_at,
            thumbnail_url: none_if_empty(stream.thumbnail_url),
            category_id: none_if_empty(stream.game_id),
            category_name: none_if_empty(stream.game_name),
        }
    }
}

#[async_trait]
impl Ingress for HelixClient {
    async fn get_current_live_status(&self) -> Result<LiveStatus> {
        let url = format!("{HELIX_BASE}/streams");
        let response: StreamsResponse = self
            .get(&url, &[("user_id", self.broadcaster_id.as_str())])
            .await?;

        // Get Streams returns an empty list when the channel is offline
        Ok(match response.data.into_iter().next() {
            Some(stream) => LiveStatus::Online(stream.into()),
            None => LiveStatus::Offline,
        })
    }

    async fn get_present_chat_users(&self) -> Result<Vec<ChatterIdentity>> {
        let url = format!("{HELIX_BASE}/chat/chatters");
        let first = CHATTERS_PAGE.to_string();
        let mut chatters = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("broadcaster_id", self.broadcaster_id.as_str()),
                ("moderator_id", self.broadcaster_id.as_str()),
                ("first", first.as_str()),
            ];
            if let Some(after) = cursor.as_deref() {
                query.push(("after", after));
            }

            let response: ChattersResponse = self.get(&url, &query).await?;
            chatters.extend(response.data.into_iter().map(|c| ChatterIdentity {
                twitch_id: Some(c.user_id),
                login: c.user_login,
                display_name: none_if_empty(c.user_name),
            }));

            match response.pagination.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(chatters)
    }
}
