//! Tool metadata.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
}

pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        name: "d3k",
        version: env!("CARGO_PKG_VERSION"),
    })
}
