//! Unified log writer.
//!
//! One tokio task owns the file handle. Producers hold a cloneable
//! [`LogWriterHandle`] and enqueue records over an unbounded channel, so
//! the stdout/stderr readers never wait on disk I/O and writes are
//! serialized without a lock.
//!
//! Each record becomes exactly one `write_all` of `line + "\n"`. Before
//! every write the task compares the identity of its handle with the file
//! now at the active path and reopens in append mode if rotation replaced
//! it.

use std::io;
use std::path::{Path, PathBuf};

use d3k_core::{BrowserEvent, LogEntry, LogRecord, LogSinkPort, LogSource, TimestampStyle};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::identity::FileIdentity;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Log writer has stopped")]
    Closed,

    #[error("Log writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

enum Command {
    Write(LogRecord),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Cheap, cloneable producer side of the writer.
#[derive(Clone)]
pub struct LogWriterHandle {
    tx: mpsc::UnboundedSender<Command>,
    written: watch::Receiver<u64>,
}

impl LogWriterHandle {
    /// Enqueue a record. Never blocks.
    pub fn send(&self, record: LogRecord) {
        if self.tx.send(Command::Write(record)).is_err() {
            debug!("Dropping log record, writer has stopped");
        }
    }

    /// Append processed dev-server output as a `[SERVER]` line.
    pub fn server_output(&self, entry: &LogEntry) {
        self.send(LogRecord::from_entry(entry));
    }

    /// Append a browser event under its own source tag.
    pub fn browser_event(&self, event: BrowserEvent) {
        self.send(event.into_record());
    }

    /// Append a message stamped now.
    pub fn append(&self, source: LogSource, message: impl Into<String>) {
        self.send(LogRecord::now(source, message));
    }

    /// Wait until every record enqueued before this call is on disk.
    pub async fn flush(&self) -> Result<(), WriterError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .map_err(|_| WriterError::Closed)?;
        ack_rx.await.map_err(|_| WriterError::Closed)
    }

    /// Receiver that changes after every successful write. The value is
    /// the number of bytes this writer has appended so far.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.written.clone()
    }
}

impl LogSinkPort for LogWriterHandle {
    fn record(&self, record: LogRecord) {
        self.send(record);
    }
}

/// Owner of the writer task.
pub struct LogWriter {
    handle: LogWriterHandle,
    task: JoinHandle<()>,
}

impl LogWriter {
    /// Open `path` for appending and start the writer task.
    ///
    /// Must be called within a tokio runtime.
    pub async fn start(path: impl Into<PathBuf>, style: TimestampStyle) -> Result<Self, WriterError> {
        let path = path.into();
        let (file, identity) = open_append(&path)
            .await
            .map_err(|source| WriterError::Open {
                path: path.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (written_tx, written_rx) = watch::channel(0);
        let task = WriterTask {
            path,
            style,
            file: Some(file),
            identity: Some(identity),
            written: written_tx,
            bytes: 0,
        };
        let task = tokio::spawn(task.run(rx));

        Ok(Self {
            handle: LogWriterHandle {
                tx,
                written: written_rx,
            },
            task,
        })
    }

    pub fn handle(&self) -> LogWriterHandle {
        self.handle.clone()
    }

    /// Write everything already queued, then stop the task.
    pub async fn shutdown(self) -> Result<(), WriterError> {
        // An error means the task already exited; joining reports why.
        let _ = self.handle.tx.send(Command::Shutdown);
        self.task.await?;
        Ok(())
    }
}

struct WriterTask {
    path: PathBuf,
    style: TimestampStyle,
    file: Option<File>,
    identity: Option<FileIdentity>,
    written: watch::Sender<u64>,
    bytes: u64,
}

impl WriterTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Write(record) => self.write_record(&record).await,
                Command::Flush(ack) => {
                    let _ = ack.send(());
                }
                Command::Shutdown => {
                    rx.close();
                    while let Ok(command) = rx.try_recv() {
                        match command {
                            Command::Write(record) => self.write_record(&record).await,
                            Command::Flush(ack) => {
                                let _ = ack.send(());
                            }
                            Command::Shutdown => {}
                        }
                    }
                    break;
                }
            }
        }
        debug!(path = %self.path.display(), bytes = self.bytes, "Log writer task exiting");
    }

    async fn write_record(&mut self, record: &LogRecord) {
        if record.critical {
            warn!(source = %record.source, message = %record.message, "Critical error detected");
        }

        let mut line = record.to_line(self.style);
        line.message = single_line(&line.message);
        if let LogSource::Other(tag) = &line.source {
            line.source = LogSource::from_tag(tag);
        }
        let mut rendered = line.render();
        rendered.push('\n');

        if let Err(e) = self.write_line(rendered.as_bytes()).await {
            error!(path = %self.path.display(), error = %e, "Failed to append to log file");
            // Force a reopen on the next write.
            self.file = None;
            self.identity = None;
        }
    }

    async fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.ensure_current().await?;
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file handle unavailable"))?;
        file.write_all(bytes).await?;
        file.flush().await?;

        self.bytes += bytes.len() as u64;
        self.written.send_replace(self.bytes);
        Ok(())
    }

    /// Reopen if the active path no longer names the file we hold.
    async fn ensure_current(&mut self) -> io::Result<()> {
        let on_disk = match FileIdentity::of_path(&self.path).await {
            Ok(identity) => Some(identity),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        if self.file.is_some() && on_disk.is_some() && on_disk == self.identity {
            return Ok(());
        }

        let (file, identity) = open_append(&self.path).await?;
        if self.file.is_some() {
            debug!(path = %self.path.display(), "Active log file was replaced, reopening");
        }
        self.file = Some(file);
        self.identity = Some(identity);
        Ok(())
    }
}

async fn open_append(path: &Path) -> io::Result<(File, FileIdentity)> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    let meta = file.metadata().await?;
    Ok((file, FileIdentity::of(&meta)))
}

/// One record is one physical line; embedded newlines are escaped.
fn single_line(message: &str) -> String {
    message.replace("\r\n", "\\n").replace(['\n', '\r'], "\\n")
}
