//! `d3k tail`: last lines of the active log, optionally followed live.

use d3k_runtime::query;
use d3k_runtime::{TailConfig, TailFrame, TailStream};
use futures_util::StreamExt;
use serde_json::json;
use tracing::warn;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{OutputMode, print_json, print_lines};

pub async fn execute(
    ctx: &CliContext,
    lines: usize,
    follow: bool,
    mode: OutputMode,
) -> Result<(), CliError> {
    let resolved = ctx.resolve_log()?;

    if !follow {
        let slice = query::tail(&resolved.path, lines).await?;
        if mode.is_json() {
            return print_json(&json!({
                "logFile": resolved.path,
                "lines": slice.lines,
                "total": slice.total,
            }));
        }
        print_lines(&slice.lines);
        return Ok(());
    }

    let mut stream = TailStream::open(&resolved.path, TailConfig::polling(ctx.tail_poll()));
    // The first frame carries the whole file; show only its last lines.
    match stream.next().await {
        Some(TailFrame::Initial { lines: all }) => {
            let skip = all.len().saturating_sub(lines);
            let last = all.into_iter().skip(skip).collect();
            print_frame(&TailFrame::Initial { lines: last }, mode)?;
        }
        Some(other) => print_frame(&other, mode)?,
        None => return Ok(()),
    }

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(frame) => print_frame(&frame, mode)?,
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

fn print_frame(frame: &TailFrame, mode: OutputMode) -> Result<(), CliError> {
    if mode.is_json() {
        let rendered = serde_json::to_string(frame).map_err(|e| CliError::Io(e.to_string()))?;
        println!("{rendered}");
        return Ok(());
    }
    match frame {
        TailFrame::Initial { lines } | TailFrame::Append { new_lines: lines } => print_lines(lines),
        TailFrame::Rotated { lines } => {
            println!("--- log rotated ---");
            print_lines(lines);
        }
        TailFrame::Truncated { lines } => {
            println!("--- log truncated ---");
            print_lines(lines);
        }
        TailFrame::Error { message } => warn!(error = %message, "Tail read failed"),
    }
    Ok(())
}
