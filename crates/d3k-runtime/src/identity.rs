//! File identity used to notice that a path now names a different file.
//!
//! On Unix this is the device and inode pair. Elsewhere the creation time
//! stands in; it changes when rotation recreates the file.

use std::fs::Metadata;
use std::io;
use std::path::Path;

#[cfg(unix)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    created: Option<std::time::SystemTime>,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn of(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn of(meta: &Metadata) -> Self {
        Self {
            created: meta.created().ok(),
        }
    }

    /// Identity of the file `path` currently resolves to.
    pub async fn of_path(path: &Path) -> io::Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(Self::of(&meta))
    }
}
