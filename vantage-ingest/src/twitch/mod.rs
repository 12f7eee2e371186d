//! Twitch ingress
//!
//! The pull side of the platform boundary: the pollers re-derive ground
//! truth through [`Ingress`], implemented for the Helix REST API. The push
//! side (chat membership and messages) lives in [`chat`], which feeds
//! normalized events into the dispatcher channel.

pub mod chat;
pub mod helix;

use async_trait::async_trait;
use vantage_common::events::{ChatterIdentity, LiveStatus};
use vantage_common::Result;

/// Pull interface to the platform, substituted with a fake in tests
#[async_trait]
pub trait Ingress: Send + Sync {
    /// Is the channel live right now, and with what metadata
    async fn get_current_live_status(&self) -> Result<LiveStatus>;

    /// Users currently present in the channel's chat
    async fn get_present_chat_users(&self) -> Result<Vec<ChatterIdentity>>;
}
