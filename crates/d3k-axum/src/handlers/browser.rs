//! Browser telemetry ingestion.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use d3k_core::BrowserEvent;
use serde::{Deserialize, Serialize};

use crate::error::HttpError;
use crate::state::AppState;

/// One event or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BrowserEventBody {
    Batch(Vec<BrowserEvent>),
    Single(BrowserEvent),
}

impl BrowserEventBody {
    fn into_events(self) -> Vec<BrowserEvent> {
        match self {
            Self::Batch(events) => events,
            Self::Single(event) => vec![event],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub accepted: usize,
}

/// Append browser events to the unified log. Returns 202 once they are
/// queued; the writer puts them on disk in arrival order.
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<BrowserEventBody>,
) -> Result<(StatusCode, Json<Accepted>), HttpError> {
    let writer = state
        .writer
        .as_ref()
        .ok_or_else(|| HttpError::ServiceUnavailable("log writer is not running".to_string()))?;

    let events = body.into_events();
    let accepted = events.len();
    for event in events {
        writer.browser_event(event);
    }
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted })))
}
