//! Live tail over server-sent events.
//!
//! Each [`TailFrame`] becomes one `data:` event. Idle connections get a
//! keep-alive comment every heartbeat interval. When the client goes away
//! axum drops the stream, which drops the [`TailStream`] and its timer.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use d3k_runtime::{TailConfig, TailFrame, TailStream};
use futures_util::stream::Stream;
use tokio_stream::StreamExt;
use tracing::debug;

use super::logs::PathQuery;
use super::target_log;
use crate::error::HttpError;
use crate::state::AppState;

pub async fn stream(
    State(state): State<AppState>,
    Query(params): Query<PathQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>> + Send + 'static>, HttpError> {
    let path = target_log(&state, params.log_path.as_deref())?;

    let mut config = TailConfig::polling(state.tail_poll);
    // Writer notifications only describe the active file.
    if path == state.log_path
        && let Some(writer) = &state.writer
    {
        config = config.with_notify(writer.subscribe());
    }

    debug!(path = %path.display(), "Opening live tail");
    let frames = TailStream::open(path, config).map(|frame: TailFrame| Event::default().json_data(&frame));

    Ok(Sse::new(frames).keep_alive(KeepAlive::new().interval(state.heartbeat).text("heartbeat")))
}
