//! Viewer leaderboard endpoint

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::ApiError;
use crate::pagination::{page_window, PAGE_SIZE};
use crate::AppState;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardSort {
    #[default]
    Messages,
    Watchtime,
    Points,
    Redemptions,
}

impl LeaderboardSort {
    /// Profile column backing this sort order
    fn column(self) -> &'static str {
        match self {
            LeaderboardSort::Messages => "total_messages",
            LeaderboardSort::Watchtime => "total_watch_time",
            LeaderboardSort::Points => "total_points_spent",
            LeaderboardSort::Redemptions => "total_redemptions",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub sort: LeaderboardSort,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardUser {
    pub login: String,
    pub display_name: Option<String>,
    pub total_watch_time: i64,
    pub average_session_time: i64,
    pub total_messages: i64,
    pub total_redemptions: i64,
    pub total_points_spent: i64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub users: Vec<LeaderboardUser>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// GET /api/leaderboard/users?sort=watchtime|messages|points|redemptions&page=N
pub async fn user_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM viewer_profiles")
        .fetch_one(&state.db)
        .await?;

    let w = page_window(total, query.page);

    // Column name comes from the enum, never from the request string
    let sql = format!(
        "SELECT u.login, u.display_name,
                p.total_watch_time, p.average_session_time, p.total_messages,
                p.total_redemptions, p.total_points_spent
         FROM viewer_profiles p
         JOIN users u ON u.id = p.user_id
         ORDER BY p.{} DESC, u.login ASC
         LIMIT ? OFFSET ?",
        query.sort.column()
    );

    let users = sqlx::query_as::<_, LeaderboardUser>(&sql)
        .bind(PAGE_SIZE)
        .bind(w.offset)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(LeaderboardResponse {
        users,
        total,
        page: w.page,
        page_size: PAGE_SIZE,
        total_pages: w.total_pages,
    }))
}
