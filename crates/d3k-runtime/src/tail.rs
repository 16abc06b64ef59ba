//! Live tail over a log file that survives rotation and truncation.
//!
//! The stream first yields every existing line, then polls. Each poll
//! opens the path afresh and compares the identity of what it opened with
//! the last one seen:
//!
//! * different identity: the file was rotated; the whole new file is sent
//!   as a `rotated` frame
//! * same identity but shorter than our offset: truncated; the whole file
//!   is sent as a `truncated` frame
//! * longer: only the complete lines past our offset are sent
//!
//! The offset only advances past newline-terminated bytes, so a line being
//! written during a poll is delivered once it is complete and never split.
//! The stream owns its timer and file state; dropping it releases both.

use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_stream::stream;
use futures_core::Stream;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::identity::FileIdentity;

/// One server-push event of the tail protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailFrame {
    /// `{"lines": [...]}`
    Initial { lines: Vec<String> },
    /// `{"newLines": [...]}`
    Append { new_lines: Vec<String> },
    /// `{"rotated": true, "lines": [...]}`
    Rotated { lines: Vec<String> },
    /// `{"truncated": true, "lines": [...]}`
    Truncated { lines: Vec<String> },
    /// `{"error": "..."}`
    Error { message: String },
}

impl Serialize for TailFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Initial { lines } => map.serialize_entry("lines", lines)?,
            Self::Append { new_lines } => map.serialize_entry("newLines", new_lines)?,
            Self::Rotated { lines } => {
                map.serialize_entry("rotated", &true)?;
                map.serialize_entry("lines", lines)?;
            }
            Self::Truncated { lines } => {
                map.serialize_entry("truncated", &true)?;
                map.serialize_entry("lines", lines)?;
            }
            Self::Error { message } => map.serialize_entry("error", message)?,
        }
        map.end()
    }
}

#[derive(Debug)]
pub struct TailConfig {
    pub poll_interval: Duration,
    /// Optional wake-up from an in-process writer, so appends are seen
    /// before the next poll tick.
    pub notify: Option<watch::Receiver<u64>>,
}

impl TailConfig {
    pub const fn polling(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            notify: None,
        }
    }

    #[must_use]
    pub fn with_notify(mut self, notify: watch::Receiver<u64>) -> Self {
        self.notify = Some(notify);
        self
    }
}

/// A live tail. Implements [`Stream`] of [`TailFrame`]s and never ends on
/// its own.
pub struct TailStream {
    inner: Pin<Box<dyn Stream<Item = TailFrame> + Send>>,
}

impl TailStream {
    pub fn open(path: impl Into<PathBuf>, config: TailConfig) -> Self {
        let path = path.into();
        let inner = stream! {
            let mut state = TailState::new(path);
            let mut ticker = interval(config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut notify = config.notify;

            yield state.initial().await;
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                let keep_notify = match notify.as_mut() {
                    Some(rx) => tokio::select! {
                        _ = ticker.tick() => true,
                        changed = rx.changed() => changed.is_ok(),
                    },
                    None => {
                        ticker.tick().await;
                        true
                    }
                };
                if !keep_notify {
                    notify = None;
                }
                if let Some(frame) = state.poll().await {
                    yield frame;
                }
            }
        };
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl Stream for TailStream {
    type Item = TailFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for TailStream {
    fn drop(&mut self) {
        debug!("Tail stream released");
    }
}

struct TailState {
    path: PathBuf,
    identity: Option<FileIdentity>,
    /// Bytes of complete lines already delivered.
    offset: u64,
}

impl TailState {
    const fn new(path: PathBuf) -> Self {
        Self {
            path,
            identity: None,
            offset: 0,
        }
    }

    async fn initial(&mut self) -> TailFrame {
        match self.open().await {
            Ok(Some(mut file)) => match self.reread(&mut file).await {
                Ok(lines) => TailFrame::Initial { lines },
                Err(e) => self.error_frame(&e),
            },
            Ok(None) => TailFrame::Initial { lines: Vec::new() },
            Err(e) => self.error_frame(&e),
        }
    }

    async fn poll(&mut self) -> Option<TailFrame> {
        match self.poll_once().await {
            Ok(frame) => frame,
            Err(e) => Some(self.error_frame(&e)),
        }
    }

    async fn poll_once(&mut self) -> io::Result<Option<TailFrame>> {
        // Missing mid-rotation; the next poll sees the new file.
        let Some(mut file) = self.open().await? else {
            return Ok(None);
        };
        let meta = file.metadata().await?;
        let identity = FileIdentity::of(&meta);

        match self.identity {
            Some(previous) if previous != identity => {
                debug!(path = %self.path.display(), "Tailed file was rotated");
                let lines = self.reread(&mut file).await?;
                return Ok(Some(TailFrame::Rotated { lines }));
            }
            Some(_) if meta.len() < self.offset => {
                debug!(path = %self.path.display(), "Tailed file was truncated");
                let lines = self.reread(&mut file).await?;
                return Ok(Some(TailFrame::Truncated { lines }));
            }
            _ => {}
        }

        self.identity = Some(identity);
        if meta.len() <= self.offset {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        let complete = complete_len(&buf);
        if complete == 0 {
            return Ok(None);
        }
        self.offset += complete as u64;
        let new_lines = split_lines(&buf[..complete]);
        Ok((!new_lines.is_empty()).then_some(TailFrame::Append { new_lines }))
    }

    async fn open(&self) -> io::Result<Option<File>> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read `file` from the start and adopt it as the tailed file.
    async fn reread(&mut self, file: &mut File) -> io::Result<Vec<String>> {
        let meta = file.metadata().await?;
        file.seek(SeekFrom::Start(0)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        let complete = complete_len(&buf);
        self.identity = Some(FileIdentity::of(&meta));
        self.offset = complete as u64;
        Ok(split_lines(&buf[..complete]))
    }

    fn error_frame(&self, e: &io::Error) -> TailFrame {
        warn!(path = %self.path.display(), error = %e, "Tail poll failed");
        TailFrame::Error {
            message: e.to_string(),
        }
    }
}

/// Length of the prefix of `buf` that ends in a newline.
fn complete_len(buf: &[u8]) -> usize {
    buf.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1)
}

fn split_lines(buf: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(buf)
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::io::Write;
    use tokio::time::timeout;

    const POLL: Duration = Duration::from_millis(20);

    async fn next(stream: &mut TailStream) -> TailFrame {
        timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("frame within timeout")
            .expect("stream never ends")
    }

    fn append(path: &std::path::Path, text: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn frames_serialize_to_wire_shape() {
        let lines = vec!["a".to_string()];
        let json = |frame: TailFrame| serde_json::to_string(&frame).unwrap();
        assert_eq!(json(TailFrame::Initial { lines: lines.clone() }), r#"{"lines":["a"]}"#);
        assert_eq!(json(TailFrame::Append { new_lines: lines.clone() }), r#"{"newLines":["a"]}"#);
        assert_eq!(
            json(TailFrame::Rotated { lines: lines.clone() }),
            r#"{"rotated":true,"lines":["a"]}"#
        );
        assert_eq!(
            json(TailFrame::Truncated { lines }),
            r#"{"truncated":true,"lines":["a"]}"#
        );
        assert_eq!(
            json(TailFrame::Error { message: "boom".to_string() }),
            r#"{"error":"boom"}"#
        );
    }

    #[tokio::test]
    async fn initial_then_appends_cover_every_line_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-d3k.log");
        std::fs::write(&path, "one\n").unwrap();

        let mut stream = TailStream::open(&path, TailConfig::polling(POLL));
        assert_eq!(next(&mut stream).await, TailFrame::Initial { lines: vec!["one".into()] });

        let mut received = Vec::new();
        for text in ["two\n", "three\nfour\n", "five\n"] {
            append(&path, text);
            match next(&mut stream).await {
                TailFrame::Append { new_lines } => received.extend(new_lines),
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(received, vec!["two", "three", "four", "five"]);
    }

    #[tokio::test]
    async fn partial_lines_wait_until_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-d3k.log");
        std::fs::write(&path, "").unwrap();

        let mut stream = TailStream::open(&path, TailConfig::polling(POLL));
        assert_eq!(next(&mut stream).await, TailFrame::Initial { lines: vec![] });

        append(&path, "hal");
        tokio::time::sleep(POLL * 3).await;
        append(&path, "f line\nnext\n");
        assert_eq!(
            next(&mut stream).await,
            TailFrame::Append { new_lines: vec!["half line".into(), "next".into()] }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rotation_emits_full_new_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-d3k.log");
        std::fs::write(&path, "old\n").unwrap();

        let mut stream = TailStream::open(&path, TailConfig::polling(POLL));
        next(&mut stream).await;

        let staged = dir.path().join("staged.log");
        std::fs::write(&staged, "fresh\n").unwrap();
        std::fs::rename(&path, dir.path().join("app-2025-01-01T00-00-00-000Z.log")).unwrap();
        std::fs::rename(&staged, &path).unwrap();
        assert_eq!(next(&mut stream).await, TailFrame::Rotated { lines: vec!["fresh".into()] });

        append(&path, "more\n");
        assert_eq!(next(&mut stream).await, TailFrame::Append { new_lines: vec!["more".into()] });
    }

    #[tokio::test]
    async fn truncation_emits_full_current_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-d3k.log");
        std::fs::write(&path, "a long first line\nand a second one\n").unwrap();

        let mut stream = TailStream::open(&path, TailConfig::polling(POLL));
        next(&mut stream).await;

        std::fs::write(&path, "short\n").unwrap();

        // A poll may land between the truncate and the write.
        let mut lines = match next(&mut stream).await {
            TailFrame::Truncated { lines } => lines,
            other => panic!("unexpected frame {other:?}"),
        };
        if lines.is_empty() {
            match next(&mut stream).await {
                TailFrame::Append { new_lines } => lines = new_lines,
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(lines, vec!["short"]);
    }

    #[tokio::test]
    async fn missing_file_starts_empty_and_picks_up_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-d3k.log");

        let mut stream = TailStream::open(&path, TailConfig::polling(POLL));
        assert_eq!(next(&mut stream).await, TailFrame::Initial { lines: vec![] });

        std::fs::write(&path, "created\n").unwrap();
        assert_eq!(
            next(&mut stream).await,
            TailFrame::Append { new_lines: vec!["created".into()] }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn read_failures_yield_error_frames_and_tailing_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-d3k.log");
        std::fs::write(&path, "one\n").unwrap();

        let mut stream = TailStream::open(&path, TailConfig::polling(POLL));
        next(&mut stream).await;

        // Opens fine but every read fails, regardless of privileges. The
        // original stays on disk so the replacement gets a fresh identity.
        std::fs::rename(&path, dir.path().join("aside.log")).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(matches!(next(&mut stream).await, TailFrame::Error { .. }));

        std::fs::remove_dir(&path).unwrap();
        std::fs::write(&path, "two\n").unwrap();
        let frame = loop {
            match next(&mut stream).await {
                TailFrame::Error { .. } => {}
                other => break other,
            }
        };
        assert_eq!(frame, TailFrame::Rotated { lines: vec!["two".into()] });

        append(&path, "three\n");
        assert_eq!(next(&mut stream).await, TailFrame::Append { new_lines: vec!["three".into()] });
    }

    #[tokio::test]
    async fn writer_notification_wakes_before_poll() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-d3k.log");
        std::fs::write(&path, "").unwrap();
        let (tx, rx) = watch::channel(0_u64);

        let config = TailConfig::polling(Duration::from_secs(3600)).with_notify(rx);
        let mut stream = TailStream::open(&path, config);
        next(&mut stream).await;

        append(&path, "pushed\n");
        tx.send_replace(7);
        assert_eq!(next(&mut stream).await, TailFrame::Append { new_lines: vec!["pushed".into()] });
    }
}
