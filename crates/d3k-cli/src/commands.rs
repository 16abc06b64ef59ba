//! Commands enum and the arguments of `run`.

use clap::{Args, Subcommand};
use d3k_core::{Framework, ParserKind, TimestampStyle};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a dev server and capture its output in the unified log
    Run(RunArgs),

    /// Show recent errors from the active log
    Errors {
        /// Number of errors to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Interaction lines to show before each error
        #[arg(long, default_value = "0")]
        context: usize,
    },

    /// Show recent log lines
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Only lines with this source tag (SERVER, BROWSER, NETWORK, ...)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Print the last lines of the active log
    Tail {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "20")]
        lines: usize,
        /// Keep printing new lines as they are written
        #[arg(short, long)]
        follow: bool,
    },

    /// List the log files of the current project
    List,

    /// Archive the active log and start a new one
    Rotate,

    /// Show live d3k sessions
    Sessions,

    /// Show resolved paths for all d3k directories
    Paths,
}

/// Arguments of `d3k run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Project name; defaults to the current directory name
    #[arg(long)]
    pub project: Option<String>,

    /// Port the dev server should listen on (passed as PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Port for the d3k log server
    #[arg(long, env = "D3K_SERVER_PORT")]
    pub server_port: Option<u16>,

    /// Error detector to use (generic, nextjs); detected when absent
    #[arg(long)]
    pub framework: Option<Framework>,

    /// Output parser to use (standard, process-manager); detected when absent
    #[arg(long)]
    pub parser: Option<ParserKind>,

    /// Timestamp style for log lines (iso, clock)
    #[arg(long)]
    pub timestamps: Option<TimestampStyle>,

    /// Rotate the active log once it grows past this many bytes
    #[arg(long)]
    pub rotate_max_bytes: Option<u64>,

    /// Do not start the HTTP log server
    #[arg(long)]
    pub no_server: bool,

    /// Dev server command, e.g. `-- npm run dev`
    #[arg(last = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}
