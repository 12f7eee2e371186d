//! Integration tests for vantage-web API endpoints
//!
//! Each test builds the full router over an in-memory database seeded with
//! a small known dataset, then drives it with oneshot requests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method
use vantage_web::{build_router, AppState};

async fn setup_test_db() -> SqlitePool {
    vantage_common::db::init_memory_database()
        .await
        .expect("Should create test database")
}

fn setup_app(db: SqlitePool) -> axum::Router {
    build_router(AppState::new(db))
}

fn test_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Seed two users with profiles and one finished stream with segments
async fn seed(db: &SqlitePool) {
    let now = Utc::now();

    for (login, display, messages, watch) in
        [("alice", "Alice", 40, 120), ("bob", "Bob", 75, 90)]
    {
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (login, display_name, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(login)
        .bind(display)
        .bind(now)
        .fetch_one(db)
        .await
        .expect("Should insert user");

        sqlx::query(
            "INSERT INTO viewer_profiles (
                user_id, total_watch_time, average_session_time,
                total_messages, total_redemptions, total_points_spent, last_seen
             ) VALUES (?, ?, ?, ?, 2, 500, ?)",
        )
        .bind(user_id)
        .bind(watch)
        .bind(watch / 2)
        .bind(messages)
        .bind(now)
        .execute(db)
        .await
        .expect("Should insert profile");
    }

    let start = now - Duration::hours(3);
    let stream_id: i64 = sqlx::query_scalar(
        "INSERT INTO streams (twitch_stream_id, title, start_time, end_time)
         VALUES ('9001', 'Finished Broadcast', ?, ?) RETURNING id",
    )
    .bind(start)
    .bind(now)
    .fetch_one(db)
    .await
    .expect("Should insert stream");

    sqlx::query(
        "INSERT INTO stream_segments (stream_id, category_name, title, start_time, end_time)
         VALUES (?, 'Just Chatting', 'Finished Broadcast', ?, ?)",
    )
    .bind(stream_id)
    .bind(start)
    .bind(now)
    .execute(db)
    .await
    .expect("Should insert segment");

    sqlx::query(
        "INSERT INTO view_sessions (user_id, stream_id, session_start, session_end)
         VALUES (1, ?, ?, ?), (2, ?, ?, ?)",
    )
    .bind(stream_id)
    .bind(start)
    .bind(now)
    .bind(stream_id)
    .bind(start)
    .bind(now)
    .execute(db)
    .await
    .expect("Should insert sessions");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(test_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "vantage-web");
}

#[tokio::test]
async fn test_leaderboard_default_sorts_by_messages() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app
        .oneshot(test_request("/api/leaderboard/users"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["total"], 2);
    // bob has more messages than alice
    assert_eq!(json["users"][0]["login"], "bob");
    assert_eq!(json["users"][1]["login"], "alice");
}

#[tokio::test]
async fn test_leaderboard_watchtime_sort() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app
        .oneshot(test_request("/api/leaderboard/users?sort=watchtime"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["users"][0]["login"], "alice");
}

#[tokio::test]
async fn test_leaderboard_rejects_unknown_sort() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    // Unknown sort value fails query deserialization; no string ever
    // reaches the SQL layer
    let response = app
        .oneshot(test_request("/api/leaderboard/users?sort=drop_table"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leaderboard_page_clamped() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app
        .oneshot(test_request("/api/leaderboard/users?page=999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["page"], 1);
    assert_eq!(json["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_streams() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app.oneshot(test_request("/api/streams")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["streams"][0]["title"], "Finished Broadcast");
}

#[tokio::test]
async fn test_stream_detail() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app.oneshot(test_request("/api/streams/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["stream"]["twitch_stream_id"], "9001");
    assert_eq!(json["segments"].as_array().unwrap().len(), 1);
    assert_eq!(json["session_count"], 2);
    assert_eq!(json["unique_viewers"], 2);
}

#[tokio::test]
async fn test_stream_detail_not_found() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app.oneshot(test_request("/api/streams/404")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = extract_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_viewer_profile() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app
        .oneshot(test_request("/api/profiles/alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["login"], "alice");
    assert_eq!(json["total_watch_time"], 120);
}

#[tokio::test]
async fn test_viewer_profile_case_insensitive() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app
        .oneshot(test_request("/api/profiles/ALICE"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_viewer_profile_not_found() {
    let db = setup_test_db().await;
    seed(&db).await;
    let app = setup_app(db);

    let response = app
        .oneshot(test_request("/api/profiles/nobody"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
