//! Log query handlers: head, tail, list, rotate, recent errors and recent
//! lines.

use std::path::PathBuf;

use axum::Json;
use axum::extract::{Query, State};
use d3k_core::naming::project_from_filename;
use d3k_core::{LogFileInfo, LogSlice, LogSource};
use d3k_runtime::query::{self, ErrorMatch, ErrorQuery, LogQuery};
use d3k_runtime::RotationOutcome;
use serde::{Deserialize, Serialize};

use super::target_log;
use crate::error::HttpError;
use crate::state::AppState;

/// Lines returned by head and tail when `lines` is absent.
pub const DEFAULT_LINES: usize = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesQuery {
    pub lines: Option<usize>,
    pub log_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathQuery {
    pub log_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorsQuery {
    pub limit: Option<usize>,
    pub context: Option<usize>,
    pub log_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    pub limit: Option<usize>,
    pub source: Option<String>,
    pub log_path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub files: Vec<LogFileInfo>,
    pub current_file: PathBuf,
    pub project_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: RotationOutcome,
}

#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    pub errors: Vec<ErrorMatch>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub lines: Vec<String>,
}

pub async fn head(
    State(state): State<AppState>,
    Query(params): Query<LinesQuery>,
) -> Result<Json<LogSlice>, HttpError> {
    let path = target_log(&state, params.log_path.as_deref())?;
    let slice = query::head(&path, params.lines.unwrap_or(DEFAULT_LINES)).await?;
    Ok(Json(slice))
}

pub async fn tail(
    State(state): State<AppState>,
    Query(params): Query<LinesQuery>,
) -> Result<Json<LogSlice>, HttpError> {
    let path = target_log(&state, params.log_path.as_deref())?;
    let slice = query::tail(&path, params.lines.unwrap_or(DEFAULT_LINES)).await?;
    Ok(Json(slice))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PathQuery>,
) -> Result<Json<ListResponse>, HttpError> {
    let path = target_log(&state, params.log_path.as_deref())?;
    let files = query::list(&path).await?;
    let project_name = path
        .file_name()
        .and_then(|name| project_from_filename(&name.to_string_lossy()))
        .unwrap_or_else(|| state.project.clone());

    Ok(Json(ListResponse {
        files,
        current_file: path,
        project_name,
    }))
}

pub async fn rotate(State(state): State<AppState>) -> Result<Json<RotateResponse>, HttpError> {
    let outcome = state.store.rotate(&state.log_path).await?;
    Ok(Json(RotateResponse {
        success: true,
        outcome,
    }))
}

pub async fn errors(
    State(state): State<AppState>,
    Query(params): Query<ErrorsQuery>,
) -> Result<Json<ErrorsResponse>, HttpError> {
    let path = target_log(&state, params.log_path.as_deref())?;
    let defaults = ErrorQuery::default();
    let query = ErrorQuery {
        limit: params.limit.unwrap_or(defaults.limit),
        context: params.context.unwrap_or(defaults.context),
    };
    let errors = query::recent_errors(&path, query, state.detector.as_ref()).await?;
    Ok(Json(ErrorsResponse {
        count: errors.len(),
        errors,
    }))
}

pub async fn recent(
    State(state): State<AppState>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<RecentResponse>, HttpError> {
    let path = target_log(&state, params.log_path.as_deref())?;
    let query = LogQuery {
        limit: params.limit.unwrap_or_else(|| LogQuery::default().limit),
        source: params
            .source
            .as_deref()
            .filter(|tag| !tag.trim().is_empty())
            .map(LogSource::from_tag),
    };
    let lines = query::recent_logs(&path, &query).await?;
    Ok(Json(RecentResponse { lines }))
}
