//! Route tests for the log query endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use common::{Fixture, get_json, post_json};

const TWO_LINES: &str = "[2025-01-01T00:00:00.000Z] [SERVER] Starting server...\n\
[2025-01-01T00:00:01.000Z] [SERVER] Server started successfully\n";

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let fixture = Fixture::with_contents("").await;
    let response = fixture
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn version_reports_crate_version() {
    let fixture = Fixture::with_contents("").await;
    let (status, body) = get_json(fixture.router(), "/api/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "d3k");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn head_and_tail_return_one_line_with_total() {
    let fixture = Fixture::with_contents(TWO_LINES).await;

    let (status, body) = get_json(fixture.router(), "/api/logs/head?lines=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(
        body["lines"],
        json!(["[2025-01-01T00:00:00.000Z] [SERVER] Starting server..."])
    );

    let (status, body) = get_json(fixture.router(), "/api/logs/tail?lines=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(
        body["lines"],
        json!(["[2025-01-01T00:00:01.000Z] [SERVER] Server started successfully"])
    );
}

#[tokio::test]
async fn missing_log_is_404() {
    let fixture = Fixture::with_contents(TWO_LINES).await;
    tokio::fs::remove_file(&fixture.log_path).await.unwrap();

    let (status, body) = get_json(fixture.router(), "/api/logs/tail").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "log file not found");
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn log_path_outside_logs_dir_is_rejected() {
    let fixture = Fixture::with_contents(TWO_LINES).await;
    let (status, _) = get_json(fixture.router(), "/api/logs/head?logPath=../../etc/passwd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rotate_then_list_shows_archive_and_current() {
    let fixture = Fixture::with_contents(TWO_LINES).await;

    let (status, body) = post_json(fixture.router(), "/api/logs/rotate", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let archived = body["archivedFile"].as_str().unwrap().to_string();
    assert_eq!(tokio::fs::read_to_string(&archived).await.unwrap(), TWO_LINES);
    assert_eq!(tokio::fs::read_to_string(&fixture.log_path).await.unwrap(), "");

    let (status, body) = get_json(fixture.router(), "/api/logs/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projectName"], "my-app");
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(
        files.iter().filter(|f| f["isCurrent"] == true).count(),
        1,
        "exactly one current file: {files:?}"
    );

    // The archive is still readable by name.
    let name = std::path::Path::new(&archived).file_name().unwrap().to_string_lossy().into_owned();
    let (status, body) = get_json(fixture.router(), &format!("/api/logs/head?logPath={name}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn rotate_without_active_file_is_404() {
    let fixture = Fixture::with_contents("").await;
    tokio::fs::remove_file(&fixture.log_path).await.unwrap();
    let (status, body) = post_json(fixture.router(), "/api/logs/rotate", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "current log not found");
}

#[tokio::test]
async fn errors_endpoint_returns_critical_lines_with_context() {
    let contents = "[2025-01-01T00:00:00.000Z] [INTERACTION] click #submit\n\
[2025-01-01T00:00:01.000Z] [SERVER] Ready in 1.2s\n\
[2025-01-01T00:00:02.000Z] [SERVER] ERROR: Error: listen EADDRINUSE: address already in use :::3000\n\
[2025-01-01T00:00:03.000Z] [SERVER] ERROR: warning: Cannot find module 'optional-dep' but continuing\n";
    let fixture = Fixture::with_contents(contents).await;

    let (status, body) = get_json(fixture.router(), "/api/logs/errors?context=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let hit = &body["errors"][0];
    assert!(hit["line"].as_str().unwrap().contains("EADDRINUSE"));
    assert_eq!(hit["interactions"], json!(["[2025-01-01T00:00:00.000Z] [INTERACTION] click #submit"]));
}

#[tokio::test]
async fn recent_filters_by_source() {
    let contents = "[2025-01-01T00:00:00.000Z] [SERVER] one\n\
[2025-01-01T00:00:01.000Z] [BROWSER] two\n\
[2025-01-01T00:00:02.000Z] [SERVER] three\n";
    let fixture = Fixture::with_contents(contents).await;

    let (status, body) = get_json(fixture.router(), "/api/logs/recent?source=server&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"], json!(["[2025-01-01T00:00:02.000Z] [SERVER] three"]));
}
