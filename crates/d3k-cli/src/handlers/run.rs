//! `d3k run`: supervise a dev server under the unified log.
//!
//! Wires the whole pipeline: log store and pointer, the single writer
//! task, the dev server and its output readers, the session descriptor,
//! the HTTP log server and the size-based rotation check. Exits with the
//! dev server's status.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use d3k_axum::{AxumContext, ServerConfig};
use d3k_core::naming::sanitize_project_name;
use d3k_core::{Framework, OutputProcessor, ParserKind};
use d3k_runtime::process::DEFAULT_GRACE;
use d3k_runtime::sessions::LOG_FILE_PATH_ENV;
use d3k_runtime::{DevServer, DevServerSpec, LogStore, LogWriter, RotationPolicy};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::commands::RunArgs;
use crate::error::CliError;
use crate::presentation::{OutputMode, print_json};

/// How often the active file size is compared with the rotation threshold.
const ROTATION_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Project name from `--project`, else the project directory name.
pub fn project_name(explicit: Option<&str>, project_dir: &Path) -> String {
    let raw = explicit.map_or_else(
        || {
            project_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        },
        str::to_string,
    );
    sanitize_project_name(&raw)
}

pub async fn execute(ctx: &CliContext, args: RunArgs, mode: OutputMode) -> Result<u8, CliError> {
    let settings = ctx.settings();
    let project_dir = ctx.project_dir();
    let project = project_name(args.project.as_deref(), project_dir);

    let framework = args
        .framework
        .or(settings.framework)
        .unwrap_or_else(|| Framework::detect(project_dir));
    let parser = args
        .parser
        .or(settings.parser)
        .unwrap_or_else(|| ParserKind::detect(project_dir));
    let style = args
        .timestamps
        .unwrap_or_else(|| settings.effective_timestamp_style());
    let policy = RotationPolicy {
        max_bytes: args.rotate_max_bytes.or(settings.rotate_max_bytes),
    };
    let app_port = args.port.unwrap_or_else(|| settings.effective_app_port());
    let server_port = args
        .server_port
        .unwrap_or_else(|| settings.effective_server_port());

    // 1. Log store, active file and pointer
    ctx.paths().ensure()?;
    let store = Arc::new(
        LogStore::new(&ctx.paths().logs_dir, &ctx.paths().log_pointer).with_policy(policy),
    );
    let log_path = store.initialize(&project).await?;

    // 2. Single writer task
    let writer = LogWriter::start(&log_path, style).await?;
    let handle = writer.handle();

    // 3. Session descriptor, keyed by this process
    ctx.sessions
        .register(&project, &log_path, std::process::id(), None)?;

    // 4. Dev server with both output streams drained into the writer
    let processor = OutputProcessor::for_framework(framework, parser);
    let spec = DevServerSpec::from_argv(&args.command)?
        .current_dir(project_dir)
        .env("PORT", app_port.to_string())
        .env(LOG_FILE_PATH_ENV, log_path.to_string_lossy());
    let mut dev = DevServer::spawn(&spec, &processor, Arc::new(handle.clone()))?;

    info!(
        project = %project,
        %framework,
        %parser,
        log = %log_path.display(),
        "Monitoring dev server"
    );

    // 5. HTTP log server and rotation check, both stopped by `cancel`
    let cancel = CancellationToken::new();
    let server = if args.no_server {
        None
    } else {
        let http_ctx = AxumContext::new(&project, &log_path, Arc::clone(&store), processor.detector())
            .with_writer(handle.clone())
            .with_tail_poll(ctx.tail_poll())
            .with_heartbeat(Duration::from_secs(settings.effective_heartbeat_secs()));
        start_http(
            ServerConfig::with_defaults().with_port(server_port),
            http_ctx,
            cancel.clone(),
        )
        .await
    };
    let rotation = policy
        .max_bytes
        .is_some()
        .then(|| spawn_rotation_check(Arc::clone(&store), log_path.clone(), cancel.clone()));

    if !mode.is_json() {
        println!("d3k: logging {project} to {}", log_path.display());
        if let Some((addr, _)) = &server {
            println!("d3k: log server at http://{addr}");
        }
    }

    // 6. Wait for the dev server, or stop it on Ctrl-C / SIGTERM
    let exited = tokio::select! {
        status = dev.wait() => Some(status),
        () = shutdown_signal() => None,
    };
    let status = match exited {
        Some(status) => status?,
        None => {
            info!("Stopping dev server");
            dev.shutdown(DEFAULT_GRACE).await?
        }
    };

    // 7. Tear down in reverse order; the writer drains last.
    cancel.cancel();
    if let Some((_, task)) = server {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %format!("{e:#}"), "Log server failed"),
            Err(e) => warn!(error = %e, "Log server task panicked"),
        }
    }
    if let Some(task) = rotation {
        let _ = task.await;
    }
    drop(handle);
    writer.shutdown().await?;

    let code = exit_code(status);
    if mode.is_json() {
        print_json(&json!({
            "project": project,
            "logFile": log_path,
            "exitCode": code,
        }))?;
    }
    Ok(code)
}

/// Bind the log server. A taken port is not fatal; the dev server still
/// runs and the log is still written.
async fn start_http(
    config: ServerConfig,
    ctx: AxumContext,
    cancel: CancellationToken,
) -> Option<(SocketAddr, JoinHandle<anyhow::Result<()>>)> {
    let listener = match d3k_axum::bind(&config).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!(port = config.port, error = %format!("{e:#}"), "Log server unavailable, continuing without it");
            return None;
        }
    };
    let addr = listener.local_addr().ok()?;
    let task = tokio::spawn(d3k_axum::serve(
        listener,
        ctx,
        config.cors,
        cancel.cancelled_owned(),
    ));
    Some((addr, task))
}

fn spawn_rotation_check(
    store: Arc<LogStore>,
    log_path: PathBuf,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ROTATION_CHECK_INTERVAL);
        ticker.tick().await;
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => match store.rotate_if_needed(&log_path).await {
                    Ok(Some(outcome)) => {
                        info!(archived = %outcome.archived_file.display(), "Size threshold reached, rotated log");
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Size-based rotation failed"),
                },
            }
        }
    })
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Process exit code for a child status; signals map to `128 + signo`.
fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code).unwrap_or(1);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return u8::try_from(128 + signal).unwrap_or(1);
        }
    }
    1
}
