//! `d3k paths`: resolved directories in `key = value` form.

use serde_json::json;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{OutputMode, print_json};

pub fn execute(ctx: &CliContext, mode: OutputMode) -> Result<(), CliError> {
    let paths = ctx.paths();
    if mode.is_json() {
        return print_json(&json!({
            "home": paths.home,
            "logsDir": paths.logs_dir,
            "sessionsDir": paths.sessions_dir,
            "settingsPath": paths.settings_path,
            "logPointer": paths.log_pointer,
        }));
    }
    println!("{paths}");
    Ok(())
}
