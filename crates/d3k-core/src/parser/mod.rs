//! Log format parsers.
//!
//! A parser turns one raw stdout/stderr chunk into discrete
//! [`ParsedLogLine`]s. Chunks may hold zero, one or many records; parsers
//! never fail and never reorder lines. Which parser runs is picked per
//! project so callers never depend on a concrete implementation.

mod process_manager;
mod standard;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::ParsedLogLine;

pub use process_manager::ProcessManagerParser;
pub use standard::StandardParser;

/// Port for splitting raw process output into log lines.
pub trait LogFormatParser: Send + Sync {
    /// Parse a chunk of raw output. Blank lines are dropped; malformed
    /// input comes back as-is.
    fn parse(&self, raw: &str) -> Vec<ParsedLogLine>;
}

/// Which parser a project uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserKind {
    #[default]
    Standard,
    /// Output multiplexed by foreman, overmind, honcho or concurrently.
    ProcessManager,
}

impl ParserKind {
    /// Pick a parser for a project directory. A Procfile means the dev
    /// command is almost certainly a process manager.
    pub fn detect(project_dir: &Path) -> Self {
        let has_procfile = ["Procfile", "Procfile.dev"]
            .iter()
            .any(|name| project_dir.join(name).is_file());
        if has_procfile {
            Self::ProcessManager
        } else {
            Self::Standard
        }
    }

    pub fn build(self) -> Arc<dyn LogFormatParser> {
        match self {
            Self::Standard => Arc::new(StandardParser),
            Self::ProcessManager => Arc::new(ProcessManagerParser::new()),
        }
    }
}

impl FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "plain" => Ok(Self::Standard),
            "process-manager" | "procfile" | "foreman" | "overmind" => Ok(Self::ProcessManager),
            other => Err(format!("unknown parser '{other}'")),
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::ProcessManager => f.write_str("process-manager"),
        }
    }
}

/// Split a chunk into its non-blank lines, trimming the chunk as a whole
/// and dropping carriage returns.
pub(crate) fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.trim()
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
}
