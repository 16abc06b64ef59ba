//! Terminal output helpers shared by the command handlers.
//!
//! Format-only: handlers decide what to print, this module decides how.

use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::CliError;

/// Output mode chosen by the global `--json` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub const fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| CliError::Io(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

/// Print lines verbatim, one per row.
pub fn print_lines<S: AsRef<str>>(lines: &[S]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        // A closed pipe (`d3k logs | head`) is not an error worth reporting.
        if writeln!(out, "{}", line.as_ref()).is_err() {
            return;
        }
    }
}

/// Report a failed command: a clear message on stderr, or a structured
/// error object on stdout under `--json`.
pub fn report_error(err: &CliError, mode: OutputMode) {
    if mode.is_json() {
        let body = json!({
            "error": err.to_string(),
            "kind": err.kind(),
            "exitCode": err.exit_code(),
        });
        println!("{body}");
    } else {
        eprintln!("d3k: {err}");
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Local wall-clock rendering of a UTC timestamp.
pub fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Truncate a string to `max_len` characters with an ellipsis.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn truncation_keeps_short_strings() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a-very-long-project-name", 10), "a-very-...");
    }
}
