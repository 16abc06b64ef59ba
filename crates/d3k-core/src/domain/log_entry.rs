//! Log entries produced by the output processor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One annotated line of dev-server output.
///
/// `is_critical` and `raw_message` are only populated when the error
/// detector judged the line critical. `None` means "not evaluated or not
/// critical", which lets consumers tell stdout lines apart from evaluated
/// stderr lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Human/agent readable rendering, possibly prefixed with `ERROR: `.
    pub formatted: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_critical: Option<bool>,
    /// The unembellished message the detector matched against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_message: Option<String>,
}

impl LogEntry {
    /// An entry that was not flagged.
    pub fn plain(formatted: impl Into<String>) -> Self {
        Self {
            formatted: formatted.into(),
            is_critical: None,
            raw_message: None,
        }
    }

    /// An entry the detector flagged as critical.
    pub fn critical_with(formatted: impl Into<String>, raw_message: impl Into<String>) -> Self {
        Self {
            formatted: formatted.into(),
            is_critical: Some(true),
            raw_message: Some(raw_message.into()),
        }
    }

    /// Whether this entry was flagged critical.
    pub fn critical(&self) -> bool {
        self.is_critical == Some(true)
    }
}

/// Intermediate output of a [`LogFormatParser`](crate::parser::LogFormatParser).
///
/// `message` never contains a process-manager prefix such as `web.1 |`
/// or `[js]`; detectors match against it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLogLine {
    pub formatted: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl ParsedLogLine {
    /// A line with no process-manager decoration.
    pub fn plain(line: impl Into<String>) -> Self {
        let line = line.into();
        Self {
            formatted: line.clone(),
            message: line,
            process_name: None,
            metadata: None,
        }
    }
}
