//! Per-viewer profile endpoint

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct ProfileResponse {
    pub login: String,
    pub display_name: Option<String>,
    pub twitch_id: Option<String>,
    pub total_watch_time: i64,
    pub average_session_time: i64,
    pub total_messages: i64,
    pub total_redemptions: i64,
    pub total_points_spent: i64,
    pub last_seen: Option<DateTime<Utc>>,
}

/// GET /api/profiles/:login
pub async fn viewer_profile(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let login = login.to_lowercase();

    let profile = sqlx::query_as::<_, ProfileResponse>(
        "SELECT u.login, u.display_name, u.twitch_id,
                p.total_watch_time, p.average_session_time, p.total_messages,
                p.total_redemptions, p.total_points_spent, p.last_seen
         FROM viewer_profiles p
         JOIN users u ON u.id = p.user_id
         WHERE u.login = ?",
    )
    .bind(&login)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("no profile for {login}")))?;

    Ok(Json(profile))
}
