//! CLI bootstrap - the composition root.
//!
//! Resolves paths, loads settings and applies environment overrides, then
//! builds the session registry and log store every command shares. Only
//! `run` goes further and starts the writer, the dev server and the HTTP
//! server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use d3k_core::paths::env_lookup;
use d3k_core::{ErrorDetector, Framework, ResolvedPaths, Settings};
use d3k_runtime::sessions::log_path_override;
use d3k_runtime::{LogStore, ResolvedLog, SessionRegistry};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub paths: ResolvedPaths,
    pub settings: Settings,
    /// `D3K_LOG_FILE_PATH` / `LOG_FILE_PATH`.
    pub log_override: Option<PathBuf>,
    /// Directory the project lives in.
    pub project_dir: PathBuf,
}

impl CliConfig {
    /// Build config from the process environment and working directory.
    pub fn from_env() -> Result<Self, CliError> {
        let cwd = std::env::current_dir()?;
        Self::from_lookup(env_lookup, cwd)
    }

    /// Build config from an arbitrary environment lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        project_dir: impl Into<PathBuf>,
    ) -> Result<Self, CliError> {
        let paths = ResolvedPaths::resolve_with(&lookup)?;
        let mut settings = Settings::load(&paths.settings_path)?;
        settings.apply_env(&lookup)?;
        let log_override = log_path_override(&lookup);

        debug!(home = %paths.home.display(), log_override = ?log_override, "Resolved CLI configuration");
        Ok(Self {
            paths,
            settings,
            log_override,
            project_dir: project_dir.into(),
        })
    }
}

/// Composed context shared by every command handler.
pub struct CliContext {
    pub config: CliConfig,
    pub sessions: SessionRegistry,
    pub store: Arc<LogStore>,
}

impl CliContext {
    pub fn paths(&self) -> &ResolvedPaths {
        &self.config.paths
    }

    pub const fn settings(&self) -> &Settings {
        &self.config.settings
    }

    pub fn project_dir(&self) -> &Path {
        &self.config.project_dir
    }

    /// The log file query commands read: live session, then override,
    /// then the newest log in the logs directory.
    pub fn resolve_log(&self) -> Result<ResolvedLog, CliError> {
        let resolved = self
            .sessions
            .resolve_log_path(self.config.log_override.clone(), &self.config.paths.logs_dir)?;
        debug!(path = %resolved.path.display(), origin = ?resolved.origin, "Resolved log file");
        Ok(resolved)
    }

    /// Framework from settings, else detected from the project directory.
    pub fn framework(&self) -> Framework {
        self.config
            .settings
            .framework
            .unwrap_or_else(|| Framework::detect(&self.config.project_dir))
    }

    pub fn detector(&self) -> Arc<dyn ErrorDetector> {
        self.framework().detector()
    }

    pub const fn tail_poll(&self) -> Duration {
        Duration::from_millis(self.config.settings.effective_tail_poll_ms())
    }
}

/// Build the shared context.
pub fn bootstrap(config: CliConfig) -> CliContext {
    let sessions = SessionRegistry::new(&config.paths.sessions_dir);
    let store = LogStore::new(&config.paths.logs_dir, &config.paths.log_pointer);
    CliContext {
        config,
        sessions,
        store: Arc::new(store),
    }
}
