//! Atomic session descriptor I/O.
//!
//! Layout:
//! ```text
//! <sessions>/<project>-<pid>/session.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use d3k_core::Session;
use tracing::debug;

const DESCRIPTOR_FILE: &str = "session.json";

/// Write a descriptor atomically using temp file + rename.
pub fn write_descriptor(sessions_dir: &Path, session: &Session) -> io::Result<PathBuf> {
    let dir = sessions_dir.join(format!("{}-{}", session.project_name, session.pid));
    fs::create_dir_all(&dir)?;

    let final_path = dir.join(DESCRIPTOR_FILE);
    let temp_path = dir.join(format!("{DESCRIPTOR_FILE}.tmp"));

    let content = serde_json::to_vec_pretty(session).map_err(io::Error::other)?;
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, &final_path)?;

    Ok(final_path)
}

pub fn read_descriptor(path: &Path) -> io::Result<Session> {
    let content = fs::read(path)?;
    serde_json::from_slice(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Every readable descriptor under `sessions_dir`. Malformed or
/// half-written descriptors are skipped; a missing directory is empty.
pub fn list_descriptors(sessions_dir: &Path) -> io::Result<Vec<Session>> {
    let entries = match fs::read_dir(sessions_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut sessions = Vec::new();
    for entry in entries {
        let path = entry?.path().join(DESCRIPTOR_FILE);
        match read_descriptor(&path) {
            Ok(session) => sessions.push(session),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable session descriptor"),
        }
    }
    Ok(sessions)
}
