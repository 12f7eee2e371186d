//! Event dispatcher
//!
//! Single consumer of the normalized event channel. Chat and redemption
//! events are gated on the stream tracker and dropped between streams;
//! lifecycle events go to the shared lifecycle handlers. An error in one
//! event is logged with its context and never stalls the ones behind it.

use crate::core::reconciler::ViewerSessionReconciler;
use crate::core::stream_state::StreamStateTracker;
use crate::gateway::Gateway;
use crate::lifecycle::StreamLifecycle;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vantage_common::events::TwitchEvent;
use vantage_common::Result;

pub struct EventDispatcher {
    gateway: Arc<dyn Gateway>,
    tracker: Arc<StreamStateTracker>,
    reconciler: Arc<ViewerSessionReconciler>,
    lifecycle: Arc<StreamLifecycle>,
}

impl EventDispatcher {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        tracker: Arc<StreamStateTracker>,
        reconciler: Arc<ViewerSessionReconciler>,
        lifecycle: Arc<StreamLifecycle>,
    ) -> Self {
        Self {
            gateway,
            tracker,
            reconciler,
            lifecycle,
        }
    }

    /// Drain the event channel until every sender is dropped
    pub async fn run(self, mut events: mpsc::Receiver<TwitchEvent>) {
        while let Some(event) = events.recv().await {
            let kind = event.kind();
            if let Err(e) = self.handle(event).await {
                warn!(event = kind, error = %e, "failed to process event");
            }
        }
        info!("event channel closed, dispatcher exiting");
    }

    pub async fn handle(&self, event: TwitchEvent) -> Result<()> {
        match event {
            TwitchEvent::StreamOnline { metadata } => {
                self.lifecycle.handle_online(&metadata).await
            }
            TwitchEvent::StreamOffline => self.lifecycle.handle_offline().await,
            TwitchEvent::ChannelUpdate { update } => {
                self.lifecycle.handle_channel_update(&update).await
            }
            TwitchEvent::ChatJoin { user } => {
                let Some(stream_id) = self.tracker.current_stream_id().await else {
                    debug!(login = %user.login, "join outside a stream, dropped");
                    return Ok(());
                };
                self.reconciler.on_user_join(&user, stream_id).await
            }
            TwitchEvent::ChatPart { user } => {
                let Some(stream_id) = self.tracker.current_stream_id().await else {
                    debug!(login = %user.login, "part outside a stream, dropped");
                    return Ok(());
                };
                self.reconciler.on_user_part(&user, stream_id).await
            }
            TwitchEvent::ChatMessage { user, text, sent_at } => {
                let Some(stream_id) = self.tracker.current_stream_id().await else {
                    debug!(login = %user.login, "message outside a stream, dropped");
                    return Ok(());
                };
                let user_id = self.gateway.upsert_user(&user).await?;
                self.gateway
                    .record_message(user_id, stream_id, &text, sent_at)
                    .await
            }
            TwitchEvent::RedemptionAdd {
                user,
                reward,
                redeemed_at,
            } => {
                let Some(stream_id) = self.tracker.current_stream_id().await else {
                    debug!(login = %user.login, "redemption outside a stream, dropped");
                    return Ok(());
                };
                let user_id = self.gateway.upsert_user(&user).await?;
                let reward_id = self
                    .gateway
                    .upsert_reward(&reward.twitch_id, &reward.title, reward.cost)
                    .await?;
                self.gateway
                    .record_redemption(user_id, stream_id, reward_id, redeemed_at)
                    .await
            }
        }
    }
}
