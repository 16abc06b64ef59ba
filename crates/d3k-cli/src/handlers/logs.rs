//! `d3k logs`: recent lines, optionally filtered by source tag.

use d3k_core::LogSource;
use d3k_runtime::query::{self, LogQuery};
use serde_json::json;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{OutputMode, print_json, print_lines};

pub async fn execute(
    ctx: &CliContext,
    limit: usize,
    source: Option<&str>,
    mode: OutputMode,
) -> Result<(), CliError> {
    let resolved = ctx.resolve_log()?;
    let query = LogQuery {
        limit,
        source: source.map(LogSource::from_tag),
    };
    let lines = query::recent_logs(&resolved.path, &query).await?;

    if mode.is_json() {
        return print_json(&json!({
            "logFile": resolved.path,
            "lines": lines,
        }));
    }
    print_lines(&lines);
    Ok(())
}
