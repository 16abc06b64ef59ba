//! Axum server bootstrap.
//!
//! The CLI composition root builds an [`AxumContext`] from the pieces it
//! already owns (store, writer, detector) and hands it to
//! [`start_server`]. Nothing here opens log files on its own.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use d3k_core::ErrorDetector;
use d3k_core::settings::{DEFAULT_HEARTBEAT_SECS, DEFAULT_SERVER_PORT, DEFAULT_TAIL_POLL_MS};
use d3k_runtime::{LogStore, LogWriterHandle};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::create_router;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins.
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server. `0` picks a free port.
    pub port: u16,
    /// Address to bind. Loopback unless told otherwise.
    pub host: [u8; 4],
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl ServerConfig {
    pub fn with_defaults() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            host: [127, 0, 0, 1],
            cors: CorsConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

/// Everything the handlers need.
pub struct AxumContext {
    /// Project whose log is served.
    pub project: String,
    /// The active log file. Its path survives rotation.
    pub log_path: PathBuf,
    /// Owner of the logs directory and rotation.
    pub store: Arc<LogStore>,
    /// Producer side of the unified log writer. Without it browser events
    /// are rejected and live tails fall back to polling only.
    pub writer: Option<LogWriterHandle>,
    /// Detector used by the recent-errors query.
    pub detector: Arc<dyn ErrorDetector>,
    /// How often live tails poll the file.
    pub tail_poll: Duration,
    /// Idle interval between SSE keep-alive comments.
    pub heartbeat: Duration,
}

impl AxumContext {
    pub fn new(
        project: impl Into<String>,
        log_path: impl Into<PathBuf>,
        store: Arc<LogStore>,
        detector: Arc<dyn ErrorDetector>,
    ) -> Self {
        Self {
            project: project.into(),
            log_path: log_path.into(),
            store,
            writer: None,
            detector,
            tail_poll: Duration::from_millis(DEFAULT_TAIL_POLL_MS),
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
        }
    }

    #[must_use]
    pub fn with_writer(mut self, writer: LogWriterHandle) -> Self {
        self.writer = Some(writer);
        self
    }

    #[must_use]
    pub const fn with_tail_poll(mut self, poll: Duration) -> Self {
        self.tail_poll = poll;
        self
    }

    #[must_use]
    pub const fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

/// Bind the listener. Separate from [`serve`] so callers learn the real
/// port before the server starts.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let listener = TcpListener::bind(config.socket_addr()).await?;
    Ok(listener)
}

/// Serve on an already bound listener until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    ctx: AxumContext,
    cors: CorsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(ctx, &cors);
    let addr = listener.local_addr()?;
    info!("d3k log server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("d3k log server stopped");
    Ok(())
}

/// Bind and serve in one step.
pub async fn start_server(
    config: ServerConfig,
    ctx: AxumContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = bind(&config).await?;
    serve(listener, ctx, config.cors, shutdown).await
}
