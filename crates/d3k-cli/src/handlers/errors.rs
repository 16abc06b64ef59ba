//! `d3k errors`: recent error lines with optional interaction context.

use std::path::PathBuf;

use d3k_runtime::query::{self, ErrorMatch, ErrorQuery};
use serde::Serialize;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{OutputMode, print_json};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorsReport {
    log_file: PathBuf,
    errors: Vec<ErrorMatch>,
}

pub async fn execute(
    ctx: &CliContext,
    limit: usize,
    context: usize,
    mode: OutputMode,
) -> Result<(), CliError> {
    let resolved = ctx.resolve_log()?;
    let detector = ctx.detector();
    let errors =
        query::recent_errors(&resolved.path, ErrorQuery { limit, context }, detector.as_ref()).await?;

    if mode.is_json() {
        return print_json(&ErrorsReport {
            log_file: resolved.path,
            errors,
        });
    }

    if errors.is_empty() {
        println!("No errors found in {}", resolved.path.display());
        return Ok(());
    }
    for hit in &errors {
        for interaction in &hit.interactions {
            println!("  {interaction}");
        }
        println!("{}", hit.line);
    }
    Ok(())
}
