//! Database initialization
//!
//! Creates the database file on first run and brings the schema up to date.
//! All DDL is `IF NOT EXISTS`, so initialization is idempotent and safe to
//! run from every service at startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc creates the database file if it does not exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with full schema, for tests
pub async fn init_memory_database() -> Result<SqlitePool> {
    // A single connection: every pooled connection to "sqlite::memory:"
    // would otherwise get its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    configure_connection(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows the read-only dashboard service to query while the
    // ingestion service writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_streams_table(pool).await?;
    create_stream_segments_table(pool).await?;
    create_view_sessions_table(pool).await?;
    create_chat_messages_table(pool).await?;
    create_channel_rewards_table(pool).await?;
    create_redemptions_table(pool).await?;
    create_viewer_profiles_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            twitch_id TEXT UNIQUE,
            login TEXT NOT NULL UNIQUE,
            display_name TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_streams_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS streams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            twitch_stream_id TEXT,
            title TEXT,
            start_time TEXT NOT NULL,
            end_time TEXT,
            thumbnail_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_streams_open ON streams (start_time) WHERE end_time IS NULL",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_stream_segments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stream_segments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stream_id INTEGER NOT NULL REFERENCES streams (id),
            category_id TEXT,
            category_name TEXT,
            title TEXT,
            start_time TEXT NOT NULL,
            end_time TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_segments_stream ON stream_segments (stream_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_view_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS view_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users (id),
            stream_id INTEGER NOT NULL REFERENCES streams (id),
            session_start TEXT NOT NULL,
            session_end TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one open session per (user, stream); session creation uses
    // INSERT OR IGNORE against this index so concurrent join/reconcile
    // races cannot produce duplicates
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_open_session
        ON view_sessions (user_id, stream_id)
        WHERE session_end IS NULL
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_user ON view_sessions (user_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_chat_messages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users (id),
            stream_id INTEGER NOT NULL REFERENCES streams (id),
            content TEXT NOT NULL,
            sent_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_user ON chat_messages (user_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_channel_rewards_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS channel_rewards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            twitch_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            cost INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_redemptions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS redemptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users (id),
            stream_id INTEGER NOT NULL REFERENCES streams (id),
            reward_id INTEGER NOT NULL REFERENCES channel_rewards (id),
            redeemed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_redemptions_user ON redemptions (user_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_viewer_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS viewer_profiles (
            user_id INTEGER PRIMARY KEY REFERENCES users (id),
            total_watch_time INTEGER NOT NULL DEFAULT 0,
            average_session_time INTEGER NOT NULL DEFAULT 0,
            total_messages INTEGER NOT NULL DEFAULT 0,
            total_redemptions INTEGER NOT NULL DEFAULT 0,
            total_points_spent INTEGER NOT NULL DEFAULT 0,
            last_seen TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_schema() {
        let pool = init_memory_database().await.unwrap();
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(count >= 8, "expected all tables, found {count}");
    }

    #[tokio::test]
    async fn test_open_session_index_rejects_duplicates() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO users (login) VALUES ('alice')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO streams (start_time) VALUES ('2025-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();

        let insert = "INSERT INTO view_sessions (user_id, stream_id, session_start)
                      VALUES (1, 1, '2025-01-01T00:00:00Z')";
        sqlx::query(insert).execute(&pool).await.unwrap();
        assert!(sqlx::query(insert).execute(&pool).await.is_err());

        // Closing the first session makes room for a new open one
        sqlx::query("UPDATE view_sessions SET session_end = '2025-01-01T01:00:00Z'")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(insert).execute(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vantage.db");
        let pool = init_database(&path).await.unwrap();
        drop(pool);
        assert!(path.exists());
    }
}
