//! Shared fixtures for d3k-axum route tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use d3k_axum::bootstrap::{AxumContext, CorsConfig};
use d3k_axum::routes::create_router;
use d3k_core::BaseErrorDetector;
use d3k_runtime::LogStore;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PROJECT: &str = "my-app";

/// A logs directory with an initialized store for [`PROJECT`].
pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<LogStore>,
    pub log_path: PathBuf,
}

impl Fixture {
    pub async fn with_contents(contents: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LogStore::new(dir.path().join("logs"), dir.path().join("d3k.log")));
        let log_path = store.initialize(PROJECT).await.unwrap();
        tokio::fs::write(&log_path, contents).await.unwrap();
        Self {
            dir,
            store,
            log_path,
        }
    }

    pub fn context(&self) -> AxumContext {
        AxumContext::new(
            PROJECT,
            &self.log_path,
            Arc::clone(&self.store),
            Arc::new(BaseErrorDetector::new()),
        )
        .with_tail_poll(Duration::from_millis(50))
    }

    pub fn router(&self) -> Router {
        create_router(self.context(), &CorsConfig::AllowAll)
    }
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}
