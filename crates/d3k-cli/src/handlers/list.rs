//! `d3k list`: the log files of the current project, newest first.

use d3k_core::naming::project_from_filename;
use d3k_runtime::query;
use serde_json::json;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{OutputMode, format_local, format_size, print_json, truncate_string};

pub async fn execute(ctx: &CliContext, mode: OutputMode) -> Result<(), CliError> {
    let resolved = ctx.resolve_log()?;
    let files = query::list(&resolved.path).await?;
    let project = resolved
        .path
        .file_name()
        .and_then(|name| project_from_filename(&name.to_string_lossy()));

    if mode.is_json() {
        return print_json(&json!({
            "files": files,
            "currentFile": resolved.path,
            "projectName": project,
        }));
    }

    if let Some(project) = &project {
        println!("Log files for {project}:");
    }
    println!("  {:<48} {:>10}  {:<19}", "NAME", "SIZE", "MODIFIED");
    for file in &files {
        let marker = if file.is_current { "*" } else { " " };
        println!(
            "{marker} {:<48} {:>10}  {:<19}",
            truncate_string(&file.name, 48),
            format_size(file.size),
            format_local(file.modified)
        );
    }
    Ok(())
}
