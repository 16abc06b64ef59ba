//! CLI entry point.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use d3k_cli::{Cli, CliConfig, OutputMode, bootstrap, dispatch, init_tracing, presentation};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mode = OutputMode::from_flag(cli.json);

    let Some(command) = cli.command else {
        // No command provided - show help
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    let result = match CliConfig::from_env() {
        Ok(config) => dispatch(&bootstrap(config), command, mode).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            presentation::report_error(&err, mode);
            ExitCode::from(err.exit_code())
        }
    }
}
