//! Shared test fixtures for the ingestion integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use vantage_common::db::{Stream, ViewSession};
use vantage_common::events::{ChatterIdentity, LiveStatus, StreamMetadata};
use vantage_common::{Error, Result};
use vantage_ingest::gateway::ProfileTotals;
use vantage_ingest::{
    DriftCorrectionPoller, Gateway, SqliteGateway, StreamLifecycle, StreamStateTracker,
    ViewerAnalytics, ViewerSessionReconciler,
};

/// Run a future while holding a live `spawn_blocking` task, which inhibits
/// tokio's paused-clock auto-advance. Database work goes through a real
/// worker thread; without this, a pending virtual-time sleep would fire the
/// moment that work parks the runtime, letting assertions observe
/// half-finished snapshots (or pool acquires time out spuriously).
/// Under a normal (unpaused) clock this is a no-op apart from the guard task.
pub async fn inhibit_auto_advance<T>(fut: impl Future<Output = T>) -> T {
    let (tx, rx) = std::sync::mpsc::channel::<()>();
    let guard = tokio::task::spawn_blocking(move || {
        let _ = rx.recv();
    });
    let out = fut.await;
    drop(tx);
    let _ = guard.await;
    out
}

/// Gateway decorator that wraps every call in [`inhibit_auto_advance`], so
/// paused-time tests only advance the clock between complete operations.
pub struct PausedTimeGateway(Arc<dyn Gateway>);

#[async_trait]
impl Gateway for PausedTimeGateway {
    async fn upsert_user(&self, identity: &ChatterIdentity) -> Result<i64> {
        inhibit_auto_advance(self.0.upsert_user(identity)).await
    }

    async fn find_open_session(&self, user_id: i64, stream_id: i64) -> Result<Option<i64>> {
        inhibit_auto_advance(self.0.find_open_session(user_id, stream_id)).await
    }

    async fn create_session(
        &self,
        user_id: i64,
        stream_id: i64,
        start: DateTime<Utc>,
    ) -> Result<()> {
        inhibit_auto_advance(self.0.create_session(user_id, stream_id, start)).await
    }

    async fn close_session(&self, session_id: i64, end: DateTime<Utc>) -> Result<()> {
        inhibit_auto_advance(self.0.close_session(session_id, end)).await
    }

    async fn list_open_sessions(&self, stream_id: i64) -> Result<Vec<ViewSession>> {
        inhibit_auto_advance(self.0.list_open_sessions(stream_id)).await
    }

    async fn close_sessions_for_stream(&self, stream_id: i64, end: DateTime<Utc>) -> Result<u64> {
        inhibit_auto_advance(self.0.close_sessions_for_stream(stream_id, end)).await
    }

    async fn find_open_stream(&self) -> Result<Option<Stream>> {
        inhibit_auto_advance(self.0.find_open_stream()).await
    }

    async fn create_stream(&self, metadata: &StreamMetadata) -> Result<i64> {
        inhibit_auto_advance(self.0.create_stream(metadata)).await
    }

    async fn close_stream(&self, stream_id: i64, end: DateTime<Utc>) -> Result<()> {
        inhibit_auto_advance(self.0.close_stream(stream_id, end)).await
    }

    async fn open_segment(
        &self,
        stream_id: i64,
        category_id: Option<&str>,
        category_name: Option<&str>,
        title: Option<&str>,
        start: DateTime<Utc>,
    ) -> Result<i64> {
        inhibit_auto_advance(self.0.open_segment(stream_id, category_id, category_name, title, start))
            .await
    }

    async fn close_open_segments(&self, stream_id: i64, end: DateTime<Utc>) -> Result<()> {
        inhibit_auto_advance(self.0.close_open_segments(stream_id, end)).await
    }

    async fn record_message(
        &self,
        user_id: i64,
        stream_id: i64,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        inhibit_auto_advance(self.0.record_message(user_id, stream_id, content, sent_at)).await
    }

    async fn upsert_reward(&self, twitch_id: &str, title: &str, cost: i64) -> Result<i64> {
        inhibit_auto_advance(self.0.upsert_reward(twitch_id, title, cost)).await
    }

    async fn record_redemption(
        &self,
        user_id: i64,
        stream_id: i64,
        reward_id: i64,
        redeemed_at: DateTime<Utc>,
    ) -> Result<()> {
        inhibit_auto_advance(self.0.record_redemption(user_id, stream_id, reward_id, redeemed_at))
            .await
    }

    async fn active_user_ids(&self, stream_id: i64) -> Result<Vec<i64>> {
        inhibit_auto_advance(self.0.active_user_ids(stream_id)).await
    }

    async fn closed_sessions_for_user(&self, user_id: i64) -> Result<Vec<ViewSession>> {
        inhibit_auto_advance(self.0.closed_sessions_for_user(user_id)).await
    }

    async fn message_count(&self, user_id: i64) -> Result<i64> {
        inhibit_auto_advance(self.0.message_count(user_id)).await
    }

    async fn redemption_totals(&self, user_id: i64) -> Result<(i64, i64)> {
        inhibit_auto_advance(self.0.redemption_totals(user_id)).await
    }

    async fn upsert_viewer_profile(
        &self,
        totals: &ProfileTotals,
        last_seen: DateTime<Utc>,
    ) -> Result<()> {
        inhibit_auto_advance(self.0.upsert_viewer_profile(totals, last_seen)).await
    }
}

/// Scripted platform ingress. Tests set the live status and chatter list;
/// `set_failing(true)` makes every call error.
pub struct FakeIngress {
    status: Mutex<LiveStatus>,
    chatters: Mutex<Vec<ChatterIdentity>>,
    failing: Mutex<bool>,
}

impl FakeIngress {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(LiveStatus::Offline),
            chatters: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    pub async fn set_status(&self, status: LiveStatus) {
        *self.status.lock().await = status;
    }

    pub async fn set_chatters(&self, chatters: Vec<ChatterIdentity>) {
        *self.chatters.lock().await = chatters;
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }
}

#[async_trait]
impl vantage_ingest::twitch::Ingress for FakeIngress {
    async fn get_current_live_status(&self) -> Result<LiveStatus> {
        if *self.failing.lock().await {
            return Err(Error::Twitch("injected poll failure".to_string()));
        }
        Ok(self.status.lock().await.clone())
    }

    async fn get_present_chat_users(&self) -> Result<Vec<ChatterIdentity>> {
        if *self.failing.lock().await {
            return Err(Error::Twitch("injected poll failure".to_string()));
        }
        Ok(self.chatters.lock().await.clone())
    }
}

/// Fully wired ingestion core over an in-memory database
pub struct Harness {
    pub pool: SqlitePool,
    pub gateway: Arc<dyn Gateway>,
    pub reconciler: Arc<ViewerSessionReconciler>,
    pub tracker: Arc<StreamStateTracker>,
    pub lifecycle: Arc<StreamLifecycle>,
    pub ingress: Arc<FakeIngress>,
    pub poller: Arc<DriftCorrectionPoller>,
    pub gate: watch::Receiver<Option<i64>>,
}

pub async fn setup() -> Harness {
    let pool = inhibit_auto_advance(vantage_common::db::init_memory_database())
        .await
        .expect("Failed to create test database");

    let gateway: Arc<dyn Gateway> =
        Arc::new(PausedTimeGateway(Arc::new(SqliteGateway::new(pool.clone()))));
    let reconciler = Arc::new(ViewerSessionReconciler::new(Arc::clone(&gateway)));
    let (gate_tx, gate_rx) = watch::channel(None);
    let tracker = Arc::new(StreamStateTracker::new(Arc::clone(&reconciler), gate_tx));
    let analytics = ViewerAnalytics::new(Arc::clone(&gateway));
    let lifecycle = Arc::new(StreamLifecycle::new(
        Arc::clone(&gateway),
        Arc::clone(&tracker),
        analytics,
    ));
    let ingress = Arc::new(FakeIngress::new());
    let poller = Arc::new(DriftCorrectionPoller::new(
        Arc::clone(&ingress) as Arc<dyn vantage_ingest::twitch::Ingress>,
        Arc::clone(&gateway),
        Arc::clone(&tracker),
        Arc::clone(&lifecycle),
        Duration::from_secs(300),
    ));

    Harness {
        pool,
        gateway,
        reconciler,
        tracker,
        lifecycle,
        ingress,
        poller,
        gate: gate_rx,
    }
}

pub fn chatter(login: &str) -> ChatterIdentity {
    ChatterIdentity::from_login(login)
}

pub fn metadata(twitch_stream_id: &str) -> StreamMetadata {
    StreamMetadata {
        twitch_stream_id: twitch_stream_id.to_string(),
        title: "Test Broadcast".to_string(),
        started_at: Utc::now(),
        thumbnail_url: None,
        category_id: Some("509658".to_string()),
        category_name: Some("Just Chatting".to_string()),
    }
}

/// Insert a stream row directly, returning its id
pub async fn insert_stream(pool: &SqlitePool, twitch_stream_id: &str) -> i64 {
    inhibit_auto_advance(
        sqlx::query_scalar(
            "INSERT INTO streams (twitch_stream_id, title, start_time) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(twitch_stream_id)
        .bind("Test Broadcast")
        .bind(Utc::now())
        .fetch_one(pool),
    )
    .await
    .expect("Failed to insert stream")
}

/// Insert a closed view session with explicit start/end timestamps
pub async fn insert_closed_session(
    pool: &SqlitePool,
    user_id: i64,
    stream_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) {
    inhibit_auto_advance(
        sqlx::query(
            "INSERT INTO view_sessions (user_id, stream_id, session_start, session_end)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(stream_id)
        .bind(start)
        .bind(end)
        .execute(pool),
    )
    .await
    .expect("Failed to insert session");
}

pub async fn open_session_count(pool: &SqlitePool, stream_id: i64) -> i64 {
    inhibit_auto_advance(
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM view_sessions WHERE stream_id = ? AND session_end IS NULL",
        )
        .bind(stream_id)
        .fetch_one(pool),
    )
    .await
    .expect("Failed to count sessions")
}

pub async fn session_count(pool: &SqlitePool, stream_id: i64) -> i64 {
    inhibit_auto_advance(
        sqlx::query_scalar("SELECT COUNT(*) FROM view_sessions WHERE stream_id = ?")
            .bind(stream_id)
            .fetch_one(pool),
    )
    .await
    .expect("Failed to count sessions")
}

pub async fn open_stream_count(pool: &SqlitePool) -> i64 {
    inhibit_auto_advance(
        sqlx::query_scalar("SELECT COUNT(*) FROM streams WHERE end_time IS NULL").fetch_one(pool),
    )
    .await
    .expect("Failed to count streams")
}
