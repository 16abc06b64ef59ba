//! Rotation protocol.
//!
//! 1. Verify the active file exists and follows the naming convention.
//! 2. Rename it to `<project>-<timestamp>.log`.
//! 3. Create a new empty file at the active path.
//! 4. Repoint the pointer at the new file.
//!
//! Creation happens before the pointer swap, so a failure at step 4 leaves
//! the pointer on a valid (archived) file rather than a dangling one.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use d3k_core::naming::{LogFileKind, archive_file_name, parse_log_filename};
#[cfg(test)]
use d3k_core::naming::project_from_filename;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::LogStore;

/// The rotation step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    Verify,
    Rename,
    Create,
    Repoint,
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verify => "verify",
            Self::Rename => "rename",
            Self::Create => "create",
            Self::Repoint => "repoint",
        })
    }
}

/// Rotation aborted at `step`. Nothing after `step` was attempted.
#[derive(Debug, Error)]
#[error("Log rotation failed at {step} step for {path}: {source}")]
pub struct RotationError {
    pub step: RotationStep,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl RotationError {
    fn at(step: RotationStep, path: &Path, source: io::Error) -> Self {
        Self {
            step,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the current log did not exist.
    pub fn is_not_found(&self) -> bool {
        self.step == RotationStep::Verify && self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Paths involved in a completed rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationOutcome {
    pub archived_file: PathBuf,
    pub new_file: PathBuf,
}

impl LogStore {
    /// Rotate the active file `current` (or the pointer that references it).
    ///
    /// At most one rotation runs at a time per store; concurrent callers
    /// queue behind the first.
    pub async fn rotate(&self, current: &Path) -> Result<RotationOutcome, RotationError> {
        let _guard = self.rotation.lock().await;

        let active = verify_active(current).await?;
        let project = active_project(&active)?;
        let dir = active.parent().map_or_else(|| self.logs_dir.clone(), Path::to_path_buf);

        let archived = unused_archive_path(&dir, &project).await;
        tokio::fs::rename(&active, &archived)
            .await
            .map_err(|e| RotationError::at(RotationStep::Rename, &active, e))?;

        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&active)
            .await
            .map_err(|e| RotationError::at(RotationStep::Create, &active, e))?;

        self.repoint(&active)
            .await
            .map_err(|e| RotationError::at(RotationStep::Repoint, &self.pointer, e))?;

        info!(
            project,
            archived = %archived.display(),
            active = %active.display(),
            "Rotated log file"
        );
        Ok(RotationOutcome {
            archived_file: archived,
            new_file: active,
        })
    }

    /// Rotate if the policy threshold is configured and reached.
    pub async fn rotate_if_needed(&self, current: &Path) -> Result<Option<RotationOutcome>, RotationError> {
        let Some(max_bytes) = self.policy.max_bytes else {
            return Ok(None);
        };
        let size = match tokio::fs::metadata(current).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %current.display(), error = %e, "Cannot check log size for rotation");
                return Ok(None);
            }
        };
        if size < max_bytes {
            return Ok(None);
        }
        self.rotate(current).await.map(Some)
    }
}

/// Resolve `current` to the real active file and check it is a file.
async fn verify_active(current: &Path) -> Result<PathBuf, RotationError> {
    let verify_err = |e| RotationError::at(RotationStep::Verify, current, e);
    let active = match tokio::fs::canonicalize(current).await {
        Ok(path) => path,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(verify_err(io::Error::new(
                io::ErrorKind::NotFound,
                "current log not found",
            )));
        }
        Err(e) => return Err(verify_err(e)),
    };
    let meta = tokio::fs::metadata(&active).await.map_err(verify_err)?;
    if !meta.is_file() {
        return Err(verify_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "current log is not a regular file",
        )));
    }
    Ok(active)
}

/// Project of an active (`<project>-d3k.log`) file. Archives are never
/// rotated again.
fn active_project(active: &Path) -> Result<String, RotationError> {
    let parsed = active
        .file_name()
        .and_then(|name| parse_log_filename(&name.to_string_lossy()));
    match parsed {
        Some(name) if name.kind == LogFileKind::Active => Ok(name.project),
        Some(_) => Err(RotationError::at(
            RotationStep::Verify,
            active,
            io::Error::new(io::ErrorKind::InvalidInput, "archived log files cannot be rotated"),
        )),
        None => Err(RotationError::at(
            RotationStep::Verify,
            active,
            io::Error::new(io::ErrorKind::InvalidInput, "not a d3k log filename"),
        )),
    }
}

/// Archive path for now, nudged forward a millisecond at a time if a
/// rotation in the same millisecond already took the name.
async fn unused_archive_path(dir: &Path, project: &str) -> PathBuf {
    let mut ts = Utc::now();
    loop {
        let candidate = dir.join(archive_file_name(project, ts));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        ts += Duration::milliseconds(1);
    }
}
