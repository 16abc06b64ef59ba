//! Locating the log file a query should read without explicit
//! configuration.
//!
//! Resolution order: newest live session, then the environment override,
//! then the most recently modified log file in the logs directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use d3k_core::Session;
use d3k_core::naming::parse_log_filename;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::SessionRegistry;

/// Names the active log path directly.
pub const LOG_FILE_PATH_ENV: &str = "D3K_LOG_FILE_PATH";
/// Older name for [`LOG_FILE_PATH_ENV`].
pub const LEGACY_LOG_FILE_PATH_ENV: &str = "LOG_FILE_PATH";

#[derive(Debug, Error)]
pub enum SessionLookupError {
    /// No live session, no override and nothing to scan.
    #[error("No log file found. Start your app with `d3k run` first.")]
    NoLogFound,

    /// A session or override names a file that does not exist yet; this is
    /// expected for a moment at startup.
    #[error("Log file doesn't exist yet: {}", .0.display())]
    NotCreatedYet(PathBuf),
}

/// Where a resolved log path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrigin {
    Session,
    Environment,
    Scan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLog {
    pub path: PathBuf,
    pub origin: LogOrigin,
    /// The live session the path came from, if any.
    pub session: Option<Session>,
}

/// The override from `D3K_LOG_FILE_PATH`, falling back to `LOG_FILE_PATH`.
pub fn log_path_override(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    lookup(LOG_FILE_PATH_ENV)
        .or_else(|| lookup(LEGACY_LOG_FILE_PATH_ENV))
        .map(PathBuf::from)
}

/// Most recently modified file in `logs_dir` that follows the naming
/// convention.
pub fn scan_for_latest_log(logs_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(logs_dir).ok()?;
    entries
        .filter_map(Result::ok)
        .filter(|entry| parse_log_filename(&entry.file_name().to_string_lossy()).is_some())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file()
                .then(|| (meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), entry.path()))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path)
}

impl SessionRegistry {
    /// Resolve the log file queries should read.
    pub fn resolve_log_path(
        &self,
        env_override: Option<PathBuf>,
        logs_dir: &Path,
    ) -> Result<ResolvedLog, SessionLookupError> {
        let sessions = self.list_active().unwrap_or_else(|e| {
            warn!(dir = %self.dir().display(), error = %e, "Cannot read session registry");
            Vec::new()
        });
        if let Some(session) = sessions.into_iter().next() {
            debug!(project = %session.project_name, pid = session.pid, "Resolved log from live session");
            let path = session.log_file_path.clone();
            if !exists(&path) {
                return Err(SessionLookupError::NotCreatedYet(path));
            }
            return Ok(ResolvedLog {
                path,
                origin: LogOrigin::Session,
                session: Some(session),
            });
        }

        if let Some(path) = env_override {
            if !exists(&path) {
                return Err(SessionLookupError::NotCreatedYet(path));
            }
            return Ok(ResolvedLog {
                path,
                origin: LogOrigin::Environment,
                session: None,
            });
        }

        scan_for_latest_log(logs_dir)
            .map(|path| ResolvedLog {
                path,
                origin: LogOrigin::Scan,
                session: None,
            })
            .ok_or(SessionLookupError::NoLogFound)
    }
}

fn exists(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        // Unreadable but present; let the query report the real error.
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::write_descriptor;
    use std::time::Duration;

    fn registry(dir: &Path) -> SessionRegistry {
        SessionRegistry::new(dir.join("sessions"))
    }

    #[test]
    fn live_session_wins() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("my-app-d3k.log");
        fs::write(&log, "x\n").unwrap();
        let registry = registry(dir.path());
        registry.register("my-app", &log, std::process::id(), None).unwrap();

        let resolved = registry
            .resolve_log_path(Some(dir.path().join("other.log")), dir.path())
            .unwrap();
        assert_eq!(resolved.path, log);
        assert_eq!(resolved.origin, LogOrigin::Session);
        assert_eq!(resolved.session.unwrap().project_name, "my-app");
    }

    #[test]
    fn session_with_missing_file_is_not_created_yet() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let log = dir.path().join("my-app-d3k.log");
        registry.register("my-app", &log, std::process::id(), None).unwrap();

        let err = registry.resolve_log_path(None, dir.path()).unwrap_err();
        assert!(matches!(err, SessionLookupError::NotCreatedYet(ref p) if *p == log));
    }

    #[cfg(unix)]
    #[test]
    fn env_override_used_when_no_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let dead = Session::new("ghost", dir.path().join("ghost-d3k.log"), 999_999_999, None);
        write_descriptor(registry.dir(), &dead).unwrap();

        let log = dir.path().join("custom.log");
        fs::write(&log, "x\n").unwrap();
        let resolved = registry.resolve_log_path(Some(log.clone()), dir.path()).unwrap();
        assert_eq!(resolved.path, log);
        assert_eq!(resolved.origin, LogOrigin::Environment);
    }

    #[test]
    fn scan_picks_most_recent_valid_log() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        let older = logs.join("app-2025-01-01T00-00-00-000Z.log");
        let newer = logs.join("app-d3k.log");
        fs::write(&older, "a\n").unwrap();
        fs::write(&newer, "b\n").unwrap();
        fs::write(logs.join("notes.log"), "c\n").unwrap();

        let past = SystemTime::now() - Duration::from_secs(600);
        fs::File::options().write(true).open(&older).unwrap().set_modified(past).unwrap();
        fs::File::options()
            .write(true)
            .open(logs.join("notes.log"))
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(600))
            .unwrap();

        let resolved = registry(dir.path()).resolve_log_path(None, &logs).unwrap();
        assert_eq!(resolved.path, newer);
        assert_eq!(resolved.origin, LogOrigin::Scan);
    }

    #[test]
    fn nothing_anywhere_is_no_log_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = registry(dir.path())
            .resolve_log_path(None, &dir.path().join("logs"))
            .unwrap_err();
        assert!(matches!(err, SessionLookupError::NoLogFound));
    }

    #[test]
    fn override_prefers_new_variable() {
        let lookup = |key: &str| match key {
            LOG_FILE_PATH_ENV => Some("/new.log".to_string()),
            LEGACY_LOG_FILE_PATH_ENV => Some("/old.log".to_string()),
            _ => None,
        };
        assert_eq!(log_path_override(lookup), Some(PathBuf::from("/new.log")));

        let legacy = |key: &str| (key == LEGACY_LOG_FILE_PATH_ENV).then(|| "/old.log".to_string());
        assert_eq!(log_path_override(legacy), Some(PathBuf::from("/old.log")));
        assert_eq!(log_path_override(|_| None), None);
    }
}
