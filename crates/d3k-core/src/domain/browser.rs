//! Browser telemetry records accepted by the unified log writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::line::LogRecord;
use super::source::LogSource;

fn default_source() -> LogSource {
    LogSource::Browser
}

/// One structured browser event (console message, network response,
/// navigation, interaction, screenshot reference, raw CDP event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserEvent {
    #[serde(default = "default_source")]
    pub source: LogSource,
    pub message: String,
    /// When the browser observed the event; defaults to arrival time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl BrowserEvent {
    pub fn new(source: LogSource, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
            timestamp: None,
        }
    }

    /// Convert into a writer record, stamping now if the event carried no time.
    pub fn into_record(self) -> LogRecord {
        LogRecord {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            source: self.source,
            message: self.message,
            critical: false,
        }
    }
}
