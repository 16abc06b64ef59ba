//! Read-side queries over unified log files: head, tail, list, recent
//! errors and recent logs.
//!
//! Every query reads the whole file. Files are bounded by rotation, and a
//! full read keeps the results consistent with what a tail would show.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use d3k_core::naming::parse_log_filename;
use d3k_core::{ERROR_PREFIX, ErrorDetector, LogFileInfo, LogSlice, LogSource, UnifiedLogLine};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("log file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl QueryError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Non-blank lines of a log file, in order. Invalid UTF-8 is replaced.
pub async fn read_lines(path: &Path) -> Result<Vec<String>, QueryError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| QueryError::from_io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// First `n` lines.
pub async fn head(path: &Path, n: usize) -> Result<LogSlice, QueryError> {
    let mut lines = read_lines(path).await?;
    let total = lines.len();
    lines.truncate(n);
    Ok(LogSlice { lines, total })
}

/// Last `n` lines.
pub async fn tail(path: &Path, n: usize) -> Result<LogSlice, QueryError> {
    let mut lines = read_lines(path).await?;
    let total = lines.len();
    let lines = lines.split_off(total.saturating_sub(n));
    Ok(LogSlice { lines, total })
}

/// Log files of the same project as `current`, newest first.
///
/// `current` may be the pointer; it is resolved before comparing.
pub async fn list(current: &Path) -> Result<Vec<LogFileInfo>, QueryError> {
    let current = tokio::fs::canonicalize(current)
        .await
        .map_err(|e| QueryError::from_io(current, e))?;
    let dir = current.parent().unwrap_or_else(|| Path::new("."));
    let project = current
        .file_name()
        .and_then(|name| parse_log_filename(&name.to_string_lossy()))
        .map(|parsed| parsed.project);

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| QueryError::from_io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| QueryError::from_io(dir, e))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_current = path == current;
        let same_project = match (&project, parse_log_filename(&name)) {
            (Some(project), Some(parsed)) => parsed.project == *project,
            _ => false,
        };
        if !is_current && !same_project {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
        files.push(LogFileInfo {
            name,
            path,
            size: meta.len(),
            modified,
            is_current,
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
    Ok(files)
}

static ERROR_SHAPED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bERROR\b",
        r"Exception",
        r"(?i)\buncaught\b",
        r"TypeError",
        r"ReferenceError",
        r"SyntaxError",
        r"\bFAIL(?:ED)?\b",
        r"(?i)\bunhandled\b",
        r"(?i)hydration",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid error regex"))
    .collect()
});

static HTTP_ERROR_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[45]\d{2}\b").expect("valid status regex"));

/// Parameters for [`recent_errors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorQuery {
    /// Newest matches to return.
    pub limit: usize,
    /// Preceding `[INTERACTION]` lines to attach to each match.
    pub context: usize,
}

impl Default for ErrorQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            context: 0,
        }
    }
}

/// An error line with the interactions that led up to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMatch {
    pub line: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<String>,
}

/// Whether one log line looks like an error.
pub fn is_error_line(line: &str, detector: &dyn ErrorDetector) -> bool {
    let (source, message) = match UnifiedLogLine::parse(line) {
        Some(parsed) => (Some(parsed.source), parsed.message),
        None => (None, line.to_string()),
    };
    if source == Some(LogSource::Error) {
        return true;
    }
    let bare = message.strip_prefix(ERROR_PREFIX).unwrap_or(&message);
    if detector.is_critical(bare) || ERROR_SHAPED.iter().any(|re| re.is_match(bare)) {
        return true;
    }
    source == Some(LogSource::Network) && HTTP_ERROR_STATUS.is_match(bare)
}

fn is_interaction(line: &str) -> bool {
    UnifiedLogLine::parse(line).is_some_and(|parsed| parsed.source == LogSource::Interaction)
}

/// Newest `limit` error lines, oldest first, each with up to `context`
/// preceding interaction lines.
pub async fn recent_errors(
    path: &Path,
    query: ErrorQuery,
    detector: &dyn ErrorDetector,
) -> Result<Vec<ErrorMatch>, QueryError> {
    let lines = read_lines(path).await?;
    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_error_line(line, detector))
        .map(|(i, _)| i)
        .collect();

    let skip = hits.len().saturating_sub(query.limit);
    Ok(hits
        .into_iter()
        .skip(skip)
        .map(|i| {
            let mut interactions: Vec<String> = lines[..i]
                .iter()
                .rev()
                .filter(|line| is_interaction(line))
                .take(query.context)
                .cloned()
                .collect();
            interactions.reverse();
            ErrorMatch {
                line: lines[i].clone(),
                interactions,
            }
        })
        .collect())
}

/// Parameters for [`recent_logs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub limit: usize,
    pub source: Option<LogSource>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            source: None,
        }
    }
}

/// Newest `limit` lines, optionally only those tagged `source`.
pub async fn recent_logs(path: &Path, query: &LogQuery) -> Result<Vec<String>, QueryError> {
    let lines = read_lines(path).await?;
    let filtered: Vec<String> = match &query.source {
        None => lines,
        Some(source) => lines
            .into_iter()
            .filter(|line| UnifiedLogLine::parse(line).is_some_and(|parsed| parsed.source == *source))
            .collect(),
    };
    let skip = filtered.len().saturating_sub(query.limit);
    Ok(filtered.into_iter().skip(skip).collect())
}
