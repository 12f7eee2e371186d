//! Stream history endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use vantage_common::db::{Stream, StreamSegment};

use crate::api::ApiError;
use crate::pagination::{page_window, PAGE_SIZE};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamsQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct StreamsResponse {
    pub streams: Vec<Stream>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// GET /api/streams?page=N (newest first)
pub async fn list_streams(
    State(state): State<AppState>,
    Query(query): Query<StreamsQuery>,
) -> Result<Json<StreamsResponse>, ApiError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM streams")
        .fetch_one(&state.db)
        .await?;

    let w = page_window(total, query.page);

    let streams = sqlx::query_as::<_, Stream>(
        "SELECT id, twitch_stream_id, title, start_time, end_time, thumbnail_url
         FROM streams
         ORDER BY start_time DESC
         LIMIT ? OFFSET ?",
    )
    .bind(PAGE_SIZE)
    .bind(w.offset)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(StreamsResponse {
        streams,
        total,
        page: w.page,
        page_size: PAGE_SIZE,
        total_pages: w.total_pages,
    }))
}

#[derive(Debug, Serialize)]
pub struct StreamDetailResponse {
    pub stream: Stream,
    pub segments: Vec<StreamSegment>,
    pub session_count: i64,
    pub unique_viewers: i64,
}

/// GET /api/streams/:id with its segment timeline and viewer counts
pub async fn stream_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StreamDetailResponse>, ApiError> {
    let stream = sqlx::query_as::<_, Stream>(
        "SELECT id, twitch_stream_id, title, start_time, end_time, thumbnail_url
         FROM streams WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("stream {id} not found")))?;

    let segments = sqlx::query_as::<_, StreamSegment>(
        "SELECT id, stream_id, category_id, category_name, title, start_time, end_time
         FROM stream_segments
         WHERE stream_id = ?
         ORDER BY start_time ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let (session_count, unique_viewers): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM view_sessions WHERE stream_id = ?",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(StreamDetailResponse {
        stream,
        segments,
        session_count,
        unique_viewers,
    }))
}
