//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Unified server and browser logs for AI-assisted debugging.
#[derive(Parser)]
#[command(name = "d3k")]
#[command(about = "Run a dev server under a unified, queryable log")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["d3k", "--verbose", "errors", "--json"]);
        assert!(cli.verbose);
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Errors { .. })));
    }
}
