//! Persistence gateway
//!
//! Narrow trait over every database operation the ingestion core performs,
//! so the core components can be exercised against an in-memory database
//! and the SQL stays in one place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use vantage_common::db::{Stream, ViewSession};
use vantage_common::events::{ChatterIdentity, StreamMetadata};
use vantage_common::Result;

/// Cumulative analytics write for one viewer
#[derive(Debug, Clone)]
pub struct ProfileTotals {
    pub user_id: i64,
    pub total_watch_time: i64,
    pub average_session_time: i64,
    pub total_messages: i64,
    pub total_redemptions: i64,
    pub total_points_spent: i64,
}

/// Persistence operations consumed by the ingestion core.
///
/// Each call is one transaction; the core composes them with
/// read-then-write sequences and relies on the open-session unique index
/// for idempotency where composition alone is not enough.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Insert or refresh a user row, returning its id
    async fn upsert_user(&self, identity: &ChatterIdentity) -> Result<i64>;

    async fn find_open_session(&self, user_id: i64, stream_id: i64) -> Result<Option<i64>>;

    /// Open a session; a concurrent duplicate is silently ignored
    /// (unique index on open (user, stream) pairs)
    async fn create_session(
        &self,
        user_id: i64,
        stream_id: i64,
        start: DateTime<Utc>,
    ) -> Result<()>;

    async fn close_session(&self, session_id: i64, end: DateTime<Utc>) -> Result<()>;

    async fn list_open_sessions(&self, stream_id: i64) -> Result<Vec<ViewSession>>;

    /// Close every open session for the stream, returning how many closed
    async fn close_sessions_for_stream(&self, stream_id: i64, end: DateTime<Utc>) -> Result<u64>;

    /// Most recently started stream row with no end time
    async fn find_open_stream(&self) -> Result<Option<Stream>>;

    async fn create_stream(&self, metadata: &StreamMetadata) -> Result<i64>;

    async fn close_stream(&self, stream_id: i64, end: DateTime<Utc>) -> Result<()>;

    async fn open_segment(
        &self,
        stream_id: i64,
        category_id: Option<&str>,
        category_name: Option<&str>,
        title: Option<&str>,
        start: DateTime<Utc>,
    ) -> Result<i64>;

    async fn close_open_segments(&self, stream_id: i64, end: DateTime<Utc>) -> Result<()>;

    async fn record_message(
        &self,
        user_id: i64,
        stream_id: i64,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn upsert_reward(&self, twitch_id: &str, title: &str, cost: i64) -> Result<i64>;

    async fn record_redemption(
        &self,
        user_id: i64,
        stream_id: i64,
        reward_id: i64,
        redeemed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Users with any session, message, or redemption in the stream
    async fn active_user_ids(&self, stream_id: i64) -> Result<Vec<i64>>;

    /// All closed sessions for a user, across streams
    async fn closed_sessions_for_user(&self, user_id: i64) -> Result<Vec<ViewSession>>;

    async fn message_count(&self, user_id: i64) -> Result<i64>;

    /// (redemption count, total points spent)
    async fn redemption_totals(&self, user_id: i64) -> Result<(i64, i64)>;

    async fn upsert_viewer_profile(
        &self,
        totals: &ProfileTotals,
        last_seen: DateTime<Utc>,
    ) -> Result<()>;
}

/// SQLite-backed gateway
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Gateway for SqliteGateway {
    async fn upsert_user(&self, identity: &ChatterIdentity) -> Result<i64> {
        // COALESCE keeps known ids/names when a tag-less transport
        // (IRC membership) delivers the bare login later
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (twitch_id, login, display_name, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (login) DO UPDATE SET
                twitch_id = COALESCE(excluded.twitch_id, users.twitch_id),
                display_name = COALESCE(excluded.display_name, users.display_name)
            RETURNING id
            "#,
        )
        .bind(&identity.twitch_id)
        .bind(&identity.login)
        .bind(&identity.display_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_open_session(&self, user_id: i64, stream_id: i64) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM view_sessions
             WHERE user_id = ? AND stream_id = ? AND session_end IS NULL",
        )
        .bind(user_id)
        .bind(stream_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_session(
        &self,
        user_id: i64,
        stream_id: i64,
        start: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO view_sessions (user_id, stream_id, session_start)
             VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(stream_id)
        .bind(start)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close_session(&self, session_id: i64, end: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE view_sessions SET session_end = ? WHERE id = ? AND session_end IS NULL",
        )
        .bind(end)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_open_sessions(&self, stream_id: i64) -> Result<Vec<ViewSession>> {
        let sessions = sqlx::query_as::<_, ViewSession>(
            "SELECT id, user_id, stream_id, session_start, session_end
             FROM view_sessions
             WHERE stream_id = ? AND session_end IS NULL",
        )
        .bind(stream_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn close_sessions_for_stream(&self, stream_id: i64, end: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE view_sessions SET session_end = ?
             WHERE stream_id = ? AND session_end IS NULL",
        )
        .bind(end)
        .bind(stream_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find_open_stream(&self) -> Result<Option<Stream>> {
        let stream = sqlx::query_as::<_, Stream>(
            "SELECT id, twitch_stream_id, title, start_time, end_time, thumbnail_url
             FROM streams
             WHERE end_time IS NULL
             ORDER BY start_time DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(stream)
    }

    async fn create_stream(&self, metadata: &StreamMetadata) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO streams (twitch_stream_id, title, start_time, thumbnail_url)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&metadata.twitch_stream_id)
        .bind(&metadata.title)
        .bind(metadata.started_at)
        .bind(&metadata.thumbnail_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn close_stream(&self, stream_id: i64, end: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE streams SET end_time = ? WHERE id = ? AND end_time IS NULL")
            .bind(end)
            .bind(stream_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn open_segment(
        &self,
        stream_id: i64,
        category_id: Option<&str>,
        category_name: Option<&str>,
        title: Option<&str>,
        start: DateTime<Utc>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO stream_segments (stream_id, category_id, category_name, title, start_time)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(stream_id)
        .bind(category_id)
        .bind(category_name)
        .bind(title)
        .bind(start)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn close_open_segments(&self, stream_id: i64, end: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE stream_segments SET end_time = ?
             WHERE stream_id = ? AND end_time IS NULL",
        )
        .bind(end)
        .bind(stream_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_message(
        &self,
        user_id: i64,
        stream_id: i64,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_messages (user_id, stream_id, content, sent_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(stream_id)
        .bind(content)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_reward(&self, twitch_id: &str, title: &str, cost: i64) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO channel_rewards (twitch_id, title, cost)
            VALUES (?, ?, ?)
            ON CONFLICT (twitch_id) DO UPDATE SET
                title = excluded.title,
                cost = excluded.cost
            RETURNING id
            "#,
        )
        .bind(twitch_id)
        .bind(title)
        .bind(cost)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn record_redemption(
        &self,
        user_id: i64,
        stream_id: i64,
        reward_id: i64,
        redeemed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO redemptions (user_id, stream_id, reward_id, redeemed_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(stream_id)
        .bind(reward_id)
        .bind(redeemed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn active_user_ids(&self, stream_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM view_sessions WHERE stream_id = ?
             UNION
             SELECT user_id FROM chat_messages WHERE stream_id = ?
             UNION
             SELECT user_id FROM redemptions WHERE stream_id = ?",
        )
        .bind(stream_id)
        .bind(stream_id)
        .bind(stream_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn closed_sessions_for_user(&self, user_id: i64) -> Result<Vec<ViewSession>> {
        let sessions = sqlx::query_as::<_, ViewSession>(
            "SELECT id, user_id, stream_id, session_start, session_end
             FROM view_sessions
             WHERE user_id = ? AND session_end IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn message_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn redemption_totals(&self, user_id: i64) -> Result<(i64, i64)> {
        let totals: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(r.cost), 0)
             FROM redemptions d
             JOIN channel_rewards r ON r.id = d.reward_id
             WHERE d.user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    async fn upsert_viewer_profile(
        &self,
        totals: &ProfileTotals,
        last_seen: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO viewer_profiles (
                user_id, total_watch_time, average_session_time,
                total_messages, total_redemptions, total_points_spent, last_seen
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                total_watch_time = excluded.total_watch_time,
                average_session_time = excluded.average_session_time,
                total_messages = excluded.total_messages,
                total_redemptions = excluded.total_redemptions,
                total_points_spent = excluded.total_points_spent,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(totals.user_id)
        .bind(totals.total_watch_time)
        .bind(totals.average_session_time)
        .bind(totals.total_messages)
        .bind(totals.total_redemptions)
        .bind(totals.total_points_spent)
        .bind(last_seen)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
