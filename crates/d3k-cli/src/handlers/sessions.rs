//! `d3k sessions`: live sessions, newest first.

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{OutputMode, format_local, print_json, truncate_string};

pub fn execute(ctx: &CliContext, mode: OutputMode) -> Result<(), CliError> {
    let sessions = ctx.sessions.list_active()?;

    if mode.is_json() {
        return print_json(&sessions);
    }
    if sessions.is_empty() {
        println!("No live d3k sessions.");
        return Ok(());
    }
    println!("{:<24} {:>8}  {:<19}  LOG", "PROJECT", "PID", "STARTED");
    for session in &sessions {
        println!(
            "{:<24} {:>8}  {:<19}  {}",
            truncate_string(&session.project_name, 24),
            session.pid,
            format_local(session.start_time),
            session.log_file_path.display()
        );
    }
    Ok(())
}
