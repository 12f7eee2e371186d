//! vantage-web library - dashboard REST API
//!
//! Read-only HTTP surface over the analytics database: leaderboards,
//! stream history with segments, and per-viewer profiles. The ingestion
//! service owns all writes; this service opens the database read-only.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only)
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/health", get(api::health_check))
        .route("/api/leaderboard/users", get(api::user_leaderboard))
        .route("/api/streams", get(api::list_streams))
        .route("/api/streams/:id", get(api::stream_detail))
        .route("/api/profiles/:login", get(api::viewer_profile))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
