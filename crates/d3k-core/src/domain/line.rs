//! The on-disk unified log line: `[<timestamp>] [<SOURCE>] <message>`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::log_entry::LogEntry;
use super::source::LogSource;

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\] \[([A-Za-z0-9_.-][A-Za-z0-9_. -]*)\] ?(.*)$").expect("valid line regex")
});

/// How timestamps are rendered in the unified log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampStyle {
    /// `2025-01-01T00:00:00.000Z`
    #[default]
    Iso,
    /// Local wall clock, `HH:MM:SS.mmm`
    Clock,
}

impl TimestampStyle {
    /// Render a timestamp in this style.
    pub fn format(self, ts: DateTime<Utc>) -> String {
        match self {
            Self::Iso => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::Clock => ts.with_timezone(&Local).format("%H:%M:%S%.3f").to_string(),
        }
    }
}

impl FromStr for TimestampStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iso" | "utc" => Ok(Self::Iso),
            "clock" | "local" | "time" => Ok(Self::Clock),
            other => Err(format!("unknown timestamp style '{other}' (expected iso or clock)")),
        }
    }
}

impl fmt::Display for TimestampStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iso => f.write_str("iso"),
            Self::Clock => f.write_str("clock"),
        }
    }
}

/// A record handed to the unified log writer by a producer.
///
/// The timestamp is taken when the producer observed the event, not when
/// the writer gets to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub message: String,
    /// Set for server output the detector judged critical.
    pub critical: bool,
}

impl LogRecord {
    /// Create a record stamped with the current time.
    pub fn now(source: LogSource, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            message: message.into(),
            critical: false,
        }
    }

    /// Build a `[SERVER]` record from processed dev-server output.
    pub fn from_entry(entry: &LogEntry) -> Self {
        Self {
            critical: entry.critical(),
            ..Self::now(LogSource::Server, entry.formatted.clone())
        }
    }

    /// Render into the on-disk line shape.
    pub fn to_line(&self, style: TimestampStyle) -> UnifiedLogLine {
        UnifiedLogLine {
            timestamp: style.format(self.timestamp),
            source: self.source.clone(),
            message: self.message.clone(),
        }
    }
}

/// A single line of the unified log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedLogLine {
    pub timestamp: String,
    pub source: LogSource,
    pub message: String,
}

impl UnifiedLogLine {
    /// Render without the trailing newline.
    pub fn render(&self) -> String {
        format!("[{}] [{}] {}", self.timestamp, self.source, self.message)
    }

    /// Parse a rendered line. Returns `None` for lines that don't carry the
    /// timestamp and source columns (e.g. continuation lines of a stack trace).
    pub fn parse(line: &str) -> Option<Self> {
        let caps = LINE_RE.captures(line.trim_end_matches(['\r', '\n']))?;
        Some(Self {
            timestamp: caps[1].to_string(),
            source: LogSource::from_tag(&caps[2]),
            message: caps[3].to_string(),
        })
    }
}

impl fmt::Display for UnifiedLogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
