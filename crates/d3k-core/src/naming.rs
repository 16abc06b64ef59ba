//! Log filename conventions shared by the writer, the rotation manager,
//! the query service and the session registry.
//!
//! ```text
//! <project>-d3k.log                        active file
//! <project>-YYYY-MM-DDTHH-MM-SS-mmmZ.log   archived file
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Suffix of the currently active log file.
pub const ACTIVE_SUFFIX: &str = "-d3k.log";

static ARCHIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<project>.+)-(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z)\.log$")
        .expect("valid archive regex")
});

static ACTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<project>.+)-d3k\.log$").expect("valid active regex"));

/// Which convention a log filename follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFileKind {
    Active,
    /// Archived, with the filename-safe timestamp component.
    Archive(String),
}

/// A filename decomposed by the naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileName {
    pub project: String,
    pub kind: LogFileKind,
}

/// Render a timestamp in the filename-safe ISO form
/// (`2025-01-01T00-00-00-000Z`).
pub fn filename_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// `<project>-<timestamp>.log`
pub fn archive_file_name(project: &str, ts: DateTime<Utc>) -> String {
    format!("{project}-{}.log", filename_timestamp(ts))
}

/// `<project>-d3k.log`
pub fn active_file_name(project: &str) -> String {
    format!("{project}{ACTIVE_SUFFIX}")
}

/// Decompose a filename. Archive names are tried first so that a project
/// literally called `x-d3k` still parses.
pub fn parse_log_filename(name: &str) -> Option<LogFileName> {
    if let Some(caps) = ARCHIVE_RE.captures(name) {
        return Some(LogFileName {
            project: caps["project"].to_string(),
            kind: LogFileKind::Archive(caps["ts"].to_string()),
        });
    }
    ACTIVE_RE.captures(name).map(|caps| LogFileName {
        project: caps["project"].to_string(),
        kind: LogFileKind::Active,
    })
}

/// Recover the project name from a log filename.
pub fn project_from_filename(name: &str) -> Option<String> {
    parse_log_filename(name).map(|parsed| parsed.project)
}

/// Whether `name` is a valid log filename whose project contains `query`.
///
/// Matching is a deliberate substring match: `studio` matches
/// `tailwindui-studio`. Invalid filenames never match.
pub fn log_filename_matches_project(name: &str, query: &str) -> bool {
    project_from_filename(name).is_some_and(|project| project.contains(query))
}

/// Make a directory or package name safe for use in log filenames.
pub fn sanitize_project_name(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = mapped.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        "project".to_string()
    } else {
        trimmed.to_string()
    }
}
