//! Stable pointer maintenance.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Point `link` at `target`.
///
/// A temporary symlink is created next to `link` and renamed over it, so
/// readers never observe a missing pointer. If the rename fails the old
/// link is removed and recreated.
pub async fn replace_symlink(target: &Path, link: &Path) -> io::Result<()> {
    if let Some(parent) = link.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = link
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "pointer path has no file name"))?;
    let tmp = link.with_file_name(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        std::process::id()
    ));
    remove_if_exists(&tmp).await?;
    create_symlink(target, &tmp).await?;

    match tokio::fs::rename(&tmp, link).await {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(link = %link.display(), error = %e, "Atomic pointer swap failed, recreating");
            remove_if_exists(&tmp).await?;
            remove_if_exists(link).await?;
            create_symlink(target, link).await
        }
    }
}

/// Resolve one level of symlink, relative targets against the link's
/// directory. A regular file resolves to itself.
pub async fn resolve_pointer(link: &Path) -> io::Result<PathBuf> {
    let meta = tokio::fs::symlink_metadata(link).await?;
    if !meta.file_type().is_symlink() {
        return Ok(link.to_path_buf());
    }
    let target = tokio::fs::read_link(link).await?;
    match link.parent() {
        Some(dir) if target.is_relative() => Ok(dir.join(target)),
        _ => Ok(target),
    }
}

async fn remove_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(unix)]
async fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink_file(target, link).await
}

#[cfg(not(any(unix, windows)))]
async fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}
