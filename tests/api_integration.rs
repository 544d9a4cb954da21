use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use sqlbind::api::{self, AppState, DbSession};
use sqlbind::db::Column;
use sqlbind::{AppError, ConnectionConfig, Database, Model};
use sqlx::FromRow;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

#[derive(Debug, Serialize, FromRow)]
struct Note {
    id: Option<i64>,
    body: String,
}

impl Model for Note {}

async fn create_note(DbSession(mut session): DbSession) -> Result<StatusCode, AppError> {
    session.add(&Note {
        id: None,
        body: "hello".to_string(),
    })?;
    session.commit().await?;
    Ok(StatusCode::CREATED)
}

async fn draft_note(DbSession(mut session): DbSession) -> Result<StatusCode, AppError> {
    session.add(&Note {
        id: None,
        body: "draft".to_string(),
    })?;
    session.flush().await?;
    Ok(StatusCode::ACCEPTED)
}

async fn count_notes(
    DbSession(mut session): DbSession,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = session.query::<Note>().count().await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

async fn setup_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let uri = format!("sqlite:{}?mode=rwc", temp_dir.path().join("test.db").display());

    let db = Arc::new(Database::new(ConnectionConfig::new(uri)));
    db.metadata()
        .table(
            db.table_name::<Note>().to_string(),
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("body", "TEXT").not_null(),
            ],
        )
        .unwrap();
    db.create_all().await.expect("create_all failed");

    let state = AppState::new(db);
    let notes = Router::new()
        .route("/notes", post(create_note).get(count_notes))
        .route("/notes/draft", post(draft_note))
        .with_state(state.clone());

    (api::create_router(state).merge(notes), temp_dir)
}

fn request(method: &str, uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _temp) = setup_test_app().await;

    let response = app.oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let (app, _temp) = setup_test_app().await;

    let response = app.oneshot(request("GET", "/ready")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ready");
}

#[tokio::test]
async fn test_ready_reports_unreachable_database() {
    let temp_dir = TempDir::new().unwrap();
    let uri = format!(
        "sqlite:{}",
        temp_dir.path().join("missing").join("x.db").display()
    );
    let db = Arc::new(Database::new(ConnectionConfig::new(uri)));
    let app = api::create_router(AppState::new(db));

    let response = app.oneshot(request("GET", "/ready")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_committed_request_work_is_visible_to_later_requests() {
    let (app, _temp) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/notes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(request("GET", "/notes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 1);
}

#[tokio::test]
async fn test_uncommitted_request_work_is_rolled_back() {
    let (app, _temp) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/notes/draft"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app.oneshot(request("GET", "/notes")).await.unwrap();
    assert_eq!(body_json(response).await["count"], 0);
}
