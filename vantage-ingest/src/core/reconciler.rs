//! Viewer session reconciler
//!
//! Maintains the invariant that an open view session exists for
//! (user, stream) exactly when the user is present in that stream's chat.
//! Two input modes feed it: discrete join/part events from the chat
//! transport, and the five-minute chatter snapshot, which catches users
//! who left without a part event.
//!
//! Every mutation is a read-then-write over the gateway; the partial
//! unique index on open sessions makes the writes idempotent, so a
//! reconcile tick that crashes halfway is healed by the next tick.

use crate::gateway::Gateway;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use vantage_common::events::ChatterIdentity;
use vantage_common::Result;

pub struct ViewerSessionReconciler {
    gateway: Arc<dyn Gateway>,
}

impl ViewerSessionReconciler {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Discrete join: open a session unless one is already open
    /// (a reconnect delivers join twice; the second is a no-op).
    pub async fn on_user_join(&self, user: &ChatterIdentity, stream_id: i64) -> Result<()> {
        let user_id = self.gateway.upsert_user(user).await?;

        if let Some(session_id) = self.gateway.find_open_session(user_id, stream_id).await? {
            debug!(
                login = %user.login,
                stream_id,
                session_id,
                "duplicate join, session already open"
            );
            return Ok(());
        }

        self.gateway
            .create_session(user_id, stream_id, Utc::now())
            .await?;
        debug!(login = %user.login, stream_id, "view session opened");
        Ok(())
    }

    /// Discrete part: close the open session if there is one.
    /// A part without a matching join is expected (missed join, restart)
    /// and is not an error.
    pub async fn on_user_part(&self, user: &ChatterIdentity, stream_id: i64) -> Result<()> {
        let user_id = self.gateway.upsert_user(user).await?;

        match self.gateway.find_open_session(user_id, stream_id).await? {
            Some(session_id) => {
                self.gateway.close_session(session_id, Utc::now()).await?;
                debug!(login = %user.login, stream_id, "view session closed");
            }
            None => {
                debug!(login = %user.login, stream_id, "part without open session, ignoring");
            }
        }
        Ok(())
    }

    /// Snapshot reconciliation: close sessions for users who disappeared
    /// since the last poll, open sessions for newly present users.
    /// Idempotent; running it twice with the same snapshot changes nothing.
    pub async fn reconcile(&self, present: &[ChatterIdentity], stream_id: i64) -> Result<()> {
        let now = Utc::now();

        let mut present_ids = HashSet::new();
        for identity in present {
            present_ids.insert(self.gateway.upsert_user(identity).await?);
        }

        let open = self.gateway.list_open_sessions(stream_id).await?;

        // Users gone since the last snapshot
        let mut closed = 0u64;
        for session in &open {
            if !present_ids.contains(&session.user_id) {
                self.gateway.close_session(session.id, now).await?;
                closed += 1;
            }
        }

        // Users present without an open session
        let already_open: HashSet<i64> = open.iter().map(|s| s.user_id).collect();
        let mut opened = 0u64;
        for user_id in &present_ids {
            if !already_open.contains(user_id) {
                self.gateway.create_session(*user_id, stream_id, now).await?;
                opened += 1;
            }
        }

        debug!(
            stream_id,
            present = present.len(),
            opened,
            closed,
            "chatter snapshot reconciled"
        );
        Ok(())
    }

    /// Close every open session for the stream (stream end).
    ///
    /// Stream-scoped deliberately: sessions another stream left open due
    /// to an earlier fault are the drift poller's problem, not this one's.
    pub async fn close_all(&self, stream_id: i64) -> Result<u64> {
        let closed = self
            .gateway
            .close_sessions_for_stream(stream_id, Utc::now())
            .await?;
        info!(stream_id, closed, "closed all open view sessions");
        Ok(closed)
    }
}
