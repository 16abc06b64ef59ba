//! Session descriptor persisted per monitored project.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The runtime association between a project, its log file, its OS
/// process and (optionally) its browser-control endpoint.
///
/// Serialized as `{projectName, startTime, logFilePath, pid, cdpUrl?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub project_name: String,
    pub start_time: DateTime<Utc>,
    pub log_file_path: PathBuf,
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdp_url: Option<String>,
}

impl Session {
    /// Create a descriptor stamped with the current time.
    pub fn new(
        project_name: impl Into<String>,
        log_file_path: impl Into<PathBuf>,
        pid: u32,
        cdp_url: Option<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            start_time: Utc::now(),
            log_file_path: log_file_path.into(),
            pid,
            cdp_url,
        }
    }
}
