//! `d3k rotate`: archive the active log and start a new one.

use d3k_core::paths::ensure_directory;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{OutputMode, print_json};

pub async fn execute(ctx: &CliContext, mode: OutputMode) -> Result<(), CliError> {
    let resolved = ctx.resolve_log()?;
    ensure_directory(ctx.store.logs_dir())?;
    let outcome = ctx.store.rotate(&resolved.path).await?;

    if mode.is_json() {
        return print_json(&outcome);
    }
    println!("Archived {}", outcome.archived_file.display());
    println!("Active   {}", outcome.new_file.display());
    Ok(())
}
