//! Dev-server output readers.
//!
//! Dev servers can emit non-UTF8 bytes on stdout/stderr, and
//! `BufReader::lines()` would end the reader on the first invalid byte.
//! Lines are read as bytes and decoded lossily instead.

use std::sync::Arc;

use d3k_core::{LogRecord, LogSinkPort, OutputProcessor};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Which child stream a reader drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    const fn is_error_stream(self) -> bool {
        matches!(self, Self::Stderr)
    }
}

/// Drain `stream` until EOF, feeding each chunk through `processor` and
/// the resulting entries into `sink`.
pub fn spawn_output_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    kind: StreamKind,
    processor: OutputProcessor,
    sink: Arc<dyn LogSinkPort>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let chunk = String::from_utf8_lossy(&buf);
                    for entry in processor.process(&chunk, kind.is_error_stream()) {
                        sink.record(LogRecord::from_entry(&entry));
                    }
                }
                Err(e) => {
                    debug!(stream = kind.as_str(), error = %e, "Output reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(stream = kind.as_str(), "Output reader task exiting");
    })
}
