//! Core domain for d3k: the unified log model, log format parsing,
//! critical-error detection and the filename conventions shared by every
//! adapter.
//!
//! This crate holds no process, network or async concerns. The runtime
//! crate owns files and child processes; the axum and CLI crates are thin
//! adapters over both.

pub mod detector;
pub mod domain;
pub mod naming;
pub mod parser;
pub mod paths;
pub mod ports;
pub mod processor;
pub mod settings;

// Re-export commonly used types for convenience
pub use detector::{BaseErrorDetector, ErrorDetector, Framework, NextJsErrorDetector};
pub use domain::{
    BrowserEvent, LogEntry, LogFileInfo, LogRecord, LogSlice, LogSource, ParsedLogLine, Session,
    TimestampStyle, UnifiedLogLine,
};
pub use naming::{
    LogFileKind, LogFileName, active_file_name, archive_file_name, log_filename_matches_project,
    parse_log_filename, project_from_filename, sanitize_project_name,
};
pub use parser::{LogFormatParser, ParserKind, ProcessManagerParser, StandardParser};
pub use paths::{PathError, ResolvedPaths};
pub use ports::{LogSinkPort, NoopLogSink};
pub use processor::{ERROR_PREFIX, OutputProcessor};
pub use settings::{Settings, SettingsError, validate_settings};
