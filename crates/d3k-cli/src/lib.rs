//! d3k command-line interface.
//!
//! `d3k run -- <dev command>` supervises a dev server and writes its output,
//! together with browser events posted to the HTTP log server, into one
//! unified log. The other commands query that log.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap, init_tracing};
pub use commands::{Commands, RunArgs};
pub use error::CliError;
pub use parser::Cli;
pub use presentation::OutputMode;

/// Run one command to completion and return the process exit code.
pub async fn dispatch(ctx: &CliContext, command: Commands, mode: OutputMode) -> Result<u8, CliError> {
    match command {
        Commands::Run(args) => return handlers::run::execute(ctx, args, mode).await,
        Commands::Errors { limit, context } => {
            handlers::errors::execute(ctx, limit, context, mode).await?;
        }
        Commands::Logs { limit, source } => {
            handlers::logs::execute(ctx, limit, source.as_deref(), mode).await?;
        }
        Commands::Tail { lines, follow } => {
            handlers::tail::execute(ctx, lines, follow, mode).await?;
        }
        Commands::List => handlers::list::execute(ctx, mode).await?,
        Commands::Rotate => handlers::rotate::execute(ctx, mode).await?,
        Commands::Sessions => handlers::sessions::execute(ctx, mode)?,
        Commands::Paths => handlers::paths::execute(ctx, mode)?,
    }
    Ok(0)
}
