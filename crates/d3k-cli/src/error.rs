//! CLI error type and its mapping to exit codes.

use d3k_core::{PathError, SettingsError};
use d3k_runtime::{
    LogStoreError, ProcessError, QueryError, RotationError, SessionLookupError, WriterError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// No session, override or log file to read.
    #[error("{0}")]
    NoLog(String),

    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dev server could not be started or stopped.
    #[error("Process error: {0}")]
    Process(String),

    /// Rotation aborted.
    #[error("{0}")]
    Rotation(String),

    /// The HTTP log server failed.
    #[error("Server error: {0}")]
    Server(String),
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// - 1: General error
    /// - 2: Invalid arguments
    /// - 64-78: see sysexits.h
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NoLog(_) => 66,     // EX_NOINPUT
            Self::Arguments(_) => 2,  // EX_USAGE
            Self::Io(_) => 74,        // EX_IOERR
            Self::Config(_) => 78,    // EX_CONFIG
            Self::Process(_) => 71,   // EX_OSERR
            Self::Rotation(_) => 73,  // EX_CANTCREAT
            Self::Server(_) => 69,    // EX_UNAVAILABLE
        }
    }

    /// Stable discriminant for `--json` error output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoLog(_) => "no_log",
            Self::Arguments(_) => "arguments",
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Process(_) => "process",
            Self::Rotation(_) => "rotation",
            Self::Server(_) => "server",
        }
    }
}

impl From<SessionLookupError> for CliError {
    fn from(err: SessionLookupError) -> Self {
        Self::NoLog(err.to_string())
    }
}

impl From<QueryError> for CliError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(_) => Self::NoLog(err.to_string()),
            QueryError::Io { .. } => Self::Io(err.to_string()),
        }
    }
}

impl From<RotationError> for CliError {
    fn from(err: RotationError) -> Self {
        if err.is_not_found() {
            Self::NoLog("current log not found".to_string())
        } else {
            Self::Rotation(err.to_string())
        }
    }
}

impl From<LogStoreError> for CliError {
    fn from(err: LogStoreError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<WriterError> for CliError {
    fn from(err: WriterError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::EmptyCommand => Self::Arguments(err.to_string()),
            _ => Self::Process(err.to_string()),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
