//! Settings domain types and validation.
//!
//! Settings are read from `<home>/settings.json`, then environment
//! overrides are applied, then CLI flags. Every field is optional so a
//! partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detector::Framework;
use crate::domain::TimestampStyle;
use crate::parser::ParserKind;

/// Default port for the d3k HTTP interface.
pub const DEFAULT_SERVER_PORT: u16 = 3684;

/// Default port the monitored dev server listens on.
pub const DEFAULT_APP_PORT: u16 = 3000;

/// Default poll interval for live tails.
pub const DEFAULT_TAIL_POLL_MS: u64 = 500;

/// Default SSE keep-alive interval.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Overrides `tail_poll_ms`.
pub const TAIL_POLL_ENV: &str = "D3K_TAIL_POLL_MS";

/// Application settings structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Port for the d3k HTTP interface.
    pub server_port: Option<u16>,

    /// Port the dev server is expected to listen on.
    pub app_port: Option<u16>,

    /// Timestamp rendering for unified log lines.
    pub timestamp_style: Option<TimestampStyle>,

    /// Live-tail poll interval in milliseconds (50-60000).
    pub tail_poll_ms: Option<u64>,

    /// SSE keep-alive interval in seconds.
    pub heartbeat_secs: Option<u64>,

    /// Rotate the active file once it grows past this many bytes.
    pub rotate_max_bytes: Option<u64>,

    /// Forces a detector instead of detecting from the project.
    pub framework: Option<Framework>,

    /// Forces a parser instead of detecting from the project.
    pub parser: Option<ParserKind>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            server_port: Some(DEFAULT_SERVER_PORT),
            app_port: Some(DEFAULT_APP_PORT),
            timestamp_style: Some(TimestampStyle::Iso),
            tail_poll_ms: Some(DEFAULT_TAIL_POLL_MS),
            heartbeat_secs: Some(DEFAULT_HEARTBEAT_SECS),
            rotate_max_bytes: None,
            framework: None,
            parser: None,
        }
    }

    /// Read settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::with_defaults());
            }
            Err(e) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };
        let settings: Self = serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), SettingsError> {
        if let Some(raw) = lookup(TAIL_POLL_ENV) {
            let ms = raw.trim().parse().map_err(|_| SettingsError::InvalidEnv {
                key: TAIL_POLL_ENV,
                value: raw.clone(),
            })?;
            self.tail_poll_ms = Some(ms);
        }
        validate_settings(self)
    }

    #[must_use]
    pub const fn effective_server_port(&self) -> u16 {
        match self.server_port {
            Some(port) => port,
            None => DEFAULT_SERVER_PORT,
        }
    }

    #[must_use]
    pub const fn effective_app_port(&self) -> u16 {
        match self.app_port {
            Some(port) => port,
            None => DEFAULT_APP_PORT,
        }
    }

    #[must_use]
    pub const fn effective_tail_poll_ms(&self) -> u64 {
        match self.tail_poll_ms {
            Some(ms) => ms,
            None => DEFAULT_TAIL_POLL_MS,
        }
    }

    #[must_use]
    pub const fn effective_heartbeat_secs(&self) -> u64 {
        match self.heartbeat_secs {
            Some(secs) => secs,
            None => DEFAULT_HEARTBEAT_SECS,
        }
    }

    #[must_use]
    pub fn effective_timestamp_style(&self) -> TimestampStyle {
        self.timestamp_style.unwrap_or_default()
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Tail poll interval must be between 50 and 60000 ms, got {0}")]
    InvalidPollInterval(u64),

    #[error("Heartbeat interval must be between 1 and 3600 seconds, got {0}")]
    InvalidHeartbeat(u64),

    #[error("Rotation threshold must be at least 1024 bytes, got {0}")]
    InvalidRotateThreshold(u64),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Failed to read settings {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse settings {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    for port in [settings.server_port, settings.app_port].into_iter().flatten() {
        if port < 1024 {
            return Err(SettingsError::InvalidPort(port));
        }
    }

    if let Some(ms) = settings.tail_poll_ms {
        if !(50..=60_000).contains(&ms) {
            return Err(SettingsError::InvalidPollInterval(ms));
        }
    }

    if let Some(secs) = settings.heartbeat_secs {
        if !(1..=3600).contains(&secs) {
            return Err(SettingsError::InvalidHeartbeat(secs));
        }
    }

    if let Some(bytes) = settings.rotate_max_bytes {
        if bytes < 1024 {
            return Err(SettingsError::InvalidRotateThreshold(bytes));
        }
    }

    Ok(())
}
