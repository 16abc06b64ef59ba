//! The monitored dev-server child process.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use d3k_core::{LogSinkPort, OutputProcessor};
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::shutdown::shutdown_child;
use super::stream::{StreamKind, spawn_output_reader};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No dev server command given")]
    EmptyCommand,

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to wait for dev server: {0}")]
    Wait(#[source] io::Error),

    #[error("Failed to stop dev server: {0}")]
    Shutdown(#[source] io::Error),
}

/// How long output readers may keep draining once the dev server is gone.
const READER_DRAIN: Duration = Duration::from_secs(2);

/// How to launch the dev server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevServerSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl DevServerSpec {
    /// Split an argv-style command line into program and arguments.
    pub fn from_argv(argv: &[String]) -> Result<Self, ProcessError> {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for DevServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A running dev server whose stdout and stderr are drained continuously
/// into the unified log.
pub struct DevServer {
    child: Child,
    readers: Vec<JoinHandle<()>>,
    pid: Option<u32>,
}

impl DevServer {
    /// Spawn the dev server and one reader task per output stream.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(
        spec: &DevServerSpec,
        processor: &OutputProcessor,
        sink: Arc<dyn LogSinkPort>,
    ) -> Result<Self, ProcessError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so shutdown reaches the whole tree.
        #[cfg(unix)]
        command.process_group(0);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            command: spec.to_string(),
            source,
        })?;
        let pid = child.id();

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_output_reader(
                stdout,
                StreamKind::Stdout,
                processor.clone(),
                Arc::clone(&sink),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_output_reader(
                stderr,
                StreamKind::Stderr,
                processor.clone(),
                sink,
            ));
        }

        info!(command = %spec, pid = ?pid, "Dev server started");
        Ok(Self {
            child,
            readers,
            pid,
        })
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the dev server to exit and for its output to be drained.
    pub async fn wait(&mut self) -> Result<ExitStatus, ProcessError> {
        let status = self.child.wait().await.map_err(ProcessError::Wait)?;
        self.join_readers().await;
        info!(pid = ?self.pid, %status, "Dev server exited");
        Ok(status)
    }

    /// Stop the dev server, SIGTERM first, then SIGKILL after `grace`.
    pub async fn shutdown(&mut self, grace: Duration) -> Result<ExitStatus, ProcessError> {
        let status = shutdown_child(&mut self.child, grace)
            .await
            .map_err(ProcessError::Shutdown)?;
        self.join_readers().await;
        info!(pid = ?self.pid, %status, "Dev server stopped");
        Ok(status)
    }

    /// Wait for the output readers, detaching any whose pipe is still held
    /// open by a descendant after `READER_DRAIN`.
    async fn join_readers(&mut self) {
        let deadline = tokio::time::Instant::now() + READER_DRAIN;
        for mut reader in self.readers.drain(..) {
            match tokio::time::timeout_at(deadline, &mut reader).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "Output reader task failed"),
                Err(_) => {
                    warn!(pid = ?self.pid, "Dev server output still open after exit, detaching reader");
                    reader.abort();
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use d3k_core::{Framework, LogRecord, ParserKind};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<LogRecord>>);

    impl LogSinkPort for RecordingSink {
        fn record(&self, record: LogRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    fn sh(script: &str) -> DevServerSpec {
        DevServerSpec::from_argv(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(DevServerSpec::from_argv(&[]), Err(ProcessError::EmptyCommand)));
    }

    #[test]
    fn spec_displays_as_command_line() {
        let spec = DevServerSpec::from_argv(&["npm".into(), "run".into(), "dev".into()]).unwrap();
        assert_eq!(spec.to_string(), "npm run dev");
    }

    #[tokio::test]
    async fn captures_both_streams_before_wait_returns() {
        let sink = Arc::new(RecordingSink::default());
        let processor = OutputProcessor::for_framework(Framework::Generic, ParserKind::Standard);
        let spec = sh("echo ready; echo 'Error: listen EADDRINUSE :::3000' >&2; exit 3")
            .env("D3K_TEST", "1");

        let mut server = DevServer::spawn(&spec, &processor, sink.clone()).unwrap();
        assert!(server.pid().is_some());
        let status = server.wait().await.unwrap();
        assert_eq!(status.code(), Some(3));

        let records = sink.0.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.message == "ready" && !r.critical));
        assert!(records
            .iter()
            .any(|r| r.message.starts_with("ERROR: ") && r.critical));
    }

    #[tokio::test]
    async fn shutdown_stops_long_running_server() {
        let sink: Arc<dyn LogSinkPort> = Arc::new(d3k_core::NoopLogSink);
        let processor = OutputProcessor::for_framework(Framework::Generic, ParserKind::Standard);
        let mut server = DevServer::spawn(&sh("sleep 30"), &processor, sink).unwrap();

        let status = server.shutdown(Duration::from_secs(2)).await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn shutdown_does_not_wait_for_descendants_holding_output() {
        let sink: Arc<dyn LogSinkPort> = Arc::new(d3k_core::NoopLogSink);
        let processor = OutputProcessor::for_framework(Framework::Generic, ParserKind::Standard);
        let mut server = DevServer::spawn(&sh("sleep 8; echo done"), &processor, sink).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        let status = server.shutdown(Duration::from_millis(500)).await.unwrap();
        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn wait_detaches_from_background_descendants() {
        let sink: Arc<dyn LogSinkPort> = Arc::new(d3k_core::NoopLogSink);
        let processor = OutputProcessor::for_framework(Framework::Generic, ParserKind::Standard);
        let mut server = DevServer::spawn(&sh("sleep 8 & exit 0"), &processor, sink).unwrap();

        let started = std::time::Instant::now();
        let status = server.wait().await.unwrap();
        assert!(status.success());
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let processor = OutputProcessor::for_framework(Framework::Generic, ParserKind::Standard);
        let spec = DevServerSpec::from_argv(&["definitely-not-a-real-binary-d3k".into()]).unwrap();
        let err = DevServer::spawn(&spec, &processor, Arc::new(d3k_core::NoopLogSink)).err().unwrap();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
