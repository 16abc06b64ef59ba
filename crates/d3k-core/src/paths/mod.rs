//! Path utilities for the d3k home directory and the stable log pointer.
//!
//! ```text
//! <home>/                 D3K_HOME, or ~/.d3k
//! <home>/logs/            active and archived log files
//! <home>/sessions/        one directory per session descriptor
//! <home>/settings.json
//! <tmp>/d3k.log           pointer symlink to the active file (D3K_LOG_POINTER)
//! ```
//!
//! Resolution reads the environment through a lookup function so tests can
//! supply their own values without touching process state.

mod error;

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::PathError;

/// Overrides the home directory.
pub const HOME_ENV: &str = "D3K_HOME";
/// Overrides the pointer symlink location.
pub const POINTER_ENV: &str = "D3K_LOG_POINTER";

const HOME_DIR_NAME: &str = ".d3k";
const POINTER_FILE_NAME: &str = "d3k.log";

/// Read a variable from the process environment, treating empty as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Root directory for d3k state.
pub fn d3k_home() -> Result<PathBuf, PathError> {
    d3k_home_with(env_lookup)
}

/// [`d3k_home`] with an explicit environment lookup.
pub fn d3k_home_with(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf, PathError> {
    if let Some(dir) = lookup(HOME_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(HOME_DIR_NAME))
        .ok_or(PathError::NoHomeDir)
}

pub fn logs_dir(home: &Path) -> PathBuf {
    home.join("logs")
}

pub fn sessions_dir(home: &Path) -> PathBuf {
    home.join("sessions")
}

pub fn settings_path(home: &Path) -> PathBuf {
    home.join("settings.json")
}

/// Location of the stable pointer to the active log file.
pub fn log_pointer_with(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup(POINTER_ENV).map_or_else(|| env::temp_dir().join(POINTER_FILE_NAME), PathBuf::from)
}

/// Create `path` (and parents) if missing; fail if it exists as a file.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.as_os_str().is_empty() {
        return Err(PathError::EmptyPath);
    }
    if path.exists() {
        if path.is_dir() {
            return Ok(());
        }
        return Err(PathError::NotADirectory(path.to_path_buf()));
    }
    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// All resolved paths captured in a single struct, for the `paths` command
/// and for wiring adapters consistently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub home: PathBuf,
    pub logs_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub settings_path: PathBuf,
    pub log_pointer: PathBuf,
}

impl ResolvedPaths {
    /// Resolve all paths using the current environment.
    pub fn resolve() -> Result<Self, PathError> {
        Self::resolve_with(env_lookup)
    }

    pub fn resolve_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PathError> {
        let home = d3k_home_with(&lookup)?;
        Ok(Self::under(home, log_pointer_with(&lookup)))
    }

    /// Paths rooted at an explicit home directory.
    pub fn under(home: PathBuf, log_pointer: PathBuf) -> Self {
        Self {
            logs_dir: logs_dir(&home),
            sessions_dir: sessions_dir(&home),
            settings_path: settings_path(&home),
            log_pointer,
            home,
        }
    }

    /// Create the home, logs and sessions directories.
    pub fn ensure(&self) -> Result<(), PathError> {
        ensure_directory(&self.home)?;
        ensure_directory(&self.logs_dir)?;
        ensure_directory(&self.sessions_dir)
    }
}

impl fmt::Display for ResolvedPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "home = {}", self.home.display())?;
        writeln!(f, "logs_dir = {}", self.logs_dir.display())?;
        writeln!(f, "sessions_dir = {}", self.sessions_dir.display())?;
        writeln!(f, "settings_path = {}", self.settings_path.display())?;
        write!(f, "log_pointer = {}", self.log_pointer.display())
    }
}
