//! HTTP request handlers.

pub mod browser;
pub mod logs;
pub mod meta;
pub mod stream;

use std::path::{Component, Path, PathBuf};

use crate::error::HttpError;
use crate::state::AppState;

/// The file a request targets: the active log, or `logPath` when given.
///
/// `logPath` may be a bare file name or a path, but it must name a file
/// directly inside the logs directory.
pub(crate) fn target_log(state: &AppState, log_path: Option<&str>) -> Result<PathBuf, HttpError> {
    let Some(raw) = log_path.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(state.log_path.clone());
    };
    confine_to_dir(state.store.logs_dir(), Path::new(raw))
}

fn confine_to_dir(logs_dir: &Path, requested: &Path) -> Result<PathBuf, HttpError> {
    let outside = || HttpError::BadRequest("logPath must name a file in the logs directory".to_string());

    if requested
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(outside());
    }
    let name = requested.file_name().ok_or_else(outside)?;

    if let Some(parent) = requested.parent().filter(|p| !p.as_os_str().is_empty()) {
        let same_dir = match (parent.canonicalize(), logs_dir.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => parent == logs_dir,
        };
        if !same_dir {
            return Err(outside());
        }
    }
    Ok(logs_dir.join(name))
}
