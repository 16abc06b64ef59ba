//! Session registry: which project and process owns which log file.
//!
//! Liveness comes from a null-signal probe on the recorded pid, never from
//! a heartbeat. Dead sessions are filtered at read time and their
//! descriptors are left on disk.

mod io;
mod resolve;
mod verify;

use std::path::{Path, PathBuf};

use d3k_core::Session;
use tracing::debug;

pub use io::{list_descriptors, read_descriptor, write_descriptor};
pub use resolve::{
    LEGACY_LOG_FILE_PATH_ENV, LOG_FILE_PATH_ENV, LogOrigin, ResolvedLog, SessionLookupError,
    log_path_override, scan_for_latest_log,
};
pub use verify::pid_exists;

/// Registry rooted at `<home>/sessions`.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    dir: PathBuf,
}

impl SessionRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a descriptor for a newly monitored project.
    pub fn register(
        &self,
        project_name: &str,
        log_file_path: &Path,
        pid: u32,
        cdp_url: Option<String>,
    ) -> std::io::Result<Session> {
        let session = Session::new(project_name, log_file_path, pid, cdp_url);
        let path = write_descriptor(&self.dir, &session)?;
        debug!(project = project_name, pid, descriptor = %path.display(), "Registered session");
        Ok(session)
    }

    /// Sessions whose process is alive, newest first.
    pub fn list_active(&self) -> std::io::Result<Vec<Session>> {
        let mut sessions: Vec<Session> = list_descriptors(&self.dir)?
            .into_iter()
            .filter(|session| pid_exists(session.pid))
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    /// Newest live session whose project name contains `query`.
    pub fn find_session(&self, query: &str) -> std::io::Result<Option<Session>> {
        Ok(self
            .list_active()?
            .into_iter()
            .find(|session| session.project_name.contains(query)))
    }
}
