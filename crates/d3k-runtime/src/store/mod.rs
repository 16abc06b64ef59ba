//! Log store: the mapping from "current log" to files on disk.
//!
//! Exactly one file per project is active (`<project>-d3k.log`) and is
//! referenced by the stable pointer symlink. Rotation renames it to a
//! timestamped archive, creates a fresh active file and repoints the
//! pointer, in that order.

mod rotation;
mod symlink;

use std::io;
use std::path::{Path, PathBuf};

use d3k_core::naming::{LogFileKind, active_file_name, parse_log_filename};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use rotation::{RotationError, RotationOutcome, RotationStep};
pub use symlink::{replace_symlink, resolve_pointer};

#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("Failed to create logs directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create log file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to update log pointer {path}: {source}")]
    Pointer {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to scan logs directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove archived log {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// When rotation happens without an explicit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationPolicy {
    /// Rotate once the active file reaches this size.
    pub max_bytes: Option<u64>,
}

/// Owns the logs directory and the pointer symlink.
#[derive(Debug)]
pub struct LogStore {
    logs_dir: PathBuf,
    pointer: PathBuf,
    policy: RotationPolicy,
    rotation: Mutex<()>,
}

impl LogStore {
    pub fn new(logs_dir: impl Into<PathBuf>, pointer: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            pointer: pointer.into(),
            policy: RotationPolicy::default(),
            rotation: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn pointer_path(&self) -> &Path {
        &self.pointer
    }

    pub const fn policy(&self) -> RotationPolicy {
        self.policy
    }

    pub fn active_path(&self, project: &str) -> PathBuf {
        self.logs_dir.join(active_file_name(project))
    }

    /// Create the logs directory and the project's active file (appending
    /// if it already exists), then point the pointer at it.
    pub async fn initialize(&self, project: &str) -> Result<PathBuf, LogStoreError> {
        tokio::fs::create_dir_all(&self.logs_dir)
            .await
            .map_err(|source| LogStoreError::CreateDir {
                path: self.logs_dir.clone(),
                source,
            })?;

        let active = self.active_path(project);
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&active)
            .await
            .map_err(|source| LogStoreError::CreateFile {
                path: active.clone(),
                source,
            })?;

        self.repoint(&active)
            .await
            .map_err(|source| LogStoreError::Pointer {
                path: self.pointer.clone(),
                source,
            })?;

        info!(project, path = %active.display(), "Log store initialized");
        Ok(active)
    }

    /// The file the pointer currently references, if any.
    pub async fn current(&self) -> Option<PathBuf> {
        resolve_pointer(&self.pointer).await.ok()
    }

    /// Point the pointer at `target`. A regular file at the pointer path
    /// is left alone.
    async fn repoint(&self, target: &Path) -> io::Result<()> {
        match tokio::fs::symlink_metadata(&self.pointer).await {
            Ok(meta) if !meta.file_type().is_symlink() => {
                warn!(
                    pointer = %self.pointer.display(),
                    "Log pointer is a regular file, not replacing it"
                );
                Ok(())
            }
            _ => replace_symlink(target, &self.pointer).await,
        }
    }

    /// Delete the oldest archives of `project` beyond the newest `keep`.
    ///
    /// Never runs implicitly. Returns the removed paths.
    pub async fn cleanup_archives(&self, project: &str, keep: usize) -> Result<Vec<PathBuf>, LogStoreError> {
        let scan_err = |source| LogStoreError::Scan {
            path: self.logs_dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.logs_dir).await.map_err(scan_err)?;

        let mut archives = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(parsed) = parse_log_filename(&name)
                && parsed.project == project
                && let LogFileKind::Archive(ts) = parsed.kind
            {
                archives.push((ts, entry.path()));
            }
        }

        // Filename timestamps sort lexicographically.
        archives.sort_by(|a, b| b.0.cmp(&a.0));

        let mut removed = Vec::new();
        for (_, path) in archives.into_iter().skip(keep) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|source| LogStoreError::Remove {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), "Removed archived log");
            removed.push(path);
        }
        Ok(removed)
    }
}
