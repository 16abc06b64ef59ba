//! Domain types for the unified log.
//!
//! These are pure data types with no infrastructure dependencies.

mod browser;
mod files;
mod line;
mod log_entry;
mod session;
mod source;

pub use browser::BrowserEvent;
pub use files::{LogFileInfo, LogSlice};
pub use line::{LogRecord, TimestampStyle, UnifiedLogLine};
pub use log_entry::{LogEntry, ParsedLogLine};
pub use session::Session;
pub use source::LogSource;
