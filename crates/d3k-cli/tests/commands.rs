//! End-to-end tests for CLI command dispatch against a temporary d3k home.

use std::path::{Path, PathBuf};

use d3k_cli::{CliConfig, CliContext, CliError, Commands, OutputMode, RunArgs, bootstrap, dispatch};
use d3k_core::Framework;

fn context(home: &Path, project_dir: &Path) -> CliContext {
    context_with_override(home, project_dir, None)
}

fn context_with_override(home: &Path, project_dir: &Path, log_file: Option<&Path>) -> CliContext {
    let home = home.to_string_lossy().into_owned();
    let pointer = PathBuf::from(&home).join("d3k.log").to_string_lossy().into_owned();
    let log_file = log_file.map(|p| p.to_string_lossy().into_owned());
    let lookup = move |key: &str| match key {
        "D3K_HOME" => Some(home.clone()),
        "D3K_LOG_POINTER" => Some(pointer.clone()),
        "D3K_LOG_FILE_PATH" => log_file.clone(),
        _ => None,
    };
    bootstrap(CliConfig::from_lookup(lookup, project_dir).unwrap())
}

fn write_log(home: &Path, name: &str, contents: &str) -> PathBuf {
    let logs = home.join("logs");
    std::fs::create_dir_all(&logs).unwrap();
    let path = logs.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn query_commands_without_any_log_report_no_log() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir.path().join("home"), dir.path());

    let err = dispatch(&ctx, Commands::Errors { limit: 20, context: 0 }, OutputMode::Json)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::NoLog(_)));
    assert_eq!(err.exit_code(), 66);
}

#[tokio::test]
async fn rotate_archives_the_scanned_log() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let active = write_log(&home, "my-app-d3k.log", "[2025-01-01T00:00:00.000Z] [SERVER] hello\n");
    let ctx = context(&home, dir.path());

    let code = dispatch(&ctx, Commands::Rotate, OutputMode::Json).await.unwrap();
    assert_eq!(code, 0);
    assert_eq!(std::fs::read_to_string(&active).unwrap(), "");

    let archives: Vec<String> = std::fs::read_dir(home.join("logs"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != "my-app-d3k.log")
        .collect();
    assert_eq!(archives.len(), 1);
    assert!(archives[0].starts_with("my-app-"));
}

#[tokio::test]
async fn rotate_refuses_an_archived_log() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let archive = write_log(&home, "my-app-2025-01-01T00-00-00-000Z.log", "old\n");
    let ctx = context_with_override(&home, dir.path(), Some(&archive));

    let err = dispatch(&ctx, Commands::Rotate, OutputMode::Json).await.unwrap_err();
    assert!(matches!(err, CliError::Rotation(_)));
    assert_eq!(std::fs::read_to_string(&archive).unwrap(), "old\n");
    assert_eq!(std::fs::read_dir(home.join("logs")).unwrap().count(), 1);
    assert!(!home.join("d3k.log").exists());
}

#[tokio::test]
async fn list_and_logs_succeed_on_existing_log() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    write_log(&home, "my-app-d3k.log", "[2025-01-01T00:00:00.000Z] [BROWSER] hi\n");
    let ctx = context(&home, dir.path());

    assert_eq!(dispatch(&ctx, Commands::List, OutputMode::Json).await.unwrap(), 0);
    let logs = Commands::Logs {
        limit: 10,
        source: Some("browser".to_string()),
    };
    assert_eq!(dispatch(&ctx, logs, OutputMode::Text).await.unwrap(), 0);
    assert_eq!(dispatch(&ctx, Commands::Paths, OutputMode::Text).await.unwrap(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn run_captures_dev_server_output_and_exits_with_its_status() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let ctx = context(&home, dir.path());

    let args = RunArgs {
        project: Some("demo".to_string()),
        port: Some(4000),
        server_port: None,
        framework: Some(Framework::Generic),
        parser: None,
        timestamps: None,
        rotate_max_bytes: None,
        no_server: true,
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo \"ready on $PORT\"; echo 'Error: listen EADDRINUSE: address already in use :::4000' >&2; exit 4"
                .to_string(),
        ],
    };
    let code = dispatch(&ctx, Commands::Run(args), OutputMode::Json).await.unwrap();
    assert_eq!(code, 4);

    let log = std::fs::read_to_string(home.join("logs").join("demo-d3k.log")).unwrap();
    assert!(log.contains("[SERVER] ready on 4000"), "{log}");
    assert!(log.contains("[SERVER] ERROR: Error: listen EADDRINUSE"), "{log}");

    let sessions = ctx.sessions.list_active().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].project_name, "demo");

    // The pointer follows the active file.
    let pointer = std::fs::canonicalize(home.join("d3k.log")).unwrap();
    assert_eq!(pointer, std::fs::canonicalize(home.join("logs").join("demo-d3k.log")).unwrap());

    // Query commands now resolve the session's log.
    assert_eq!(
        dispatch(&ctx, Commands::Errors { limit: 5, context: 0 }, OutputMode::Json)
            .await
            .unwrap(),
        0
    );
}
