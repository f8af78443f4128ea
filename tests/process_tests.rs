use ask_llama::error::ExecError;
use ask_llama::exec::run_command;
use std::time::Instant;
use tempfile::TempDir;

fn setup_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

// ============================================================
// Normal execution
// ============================================================

#[tokio::test]
async fn test_stdout_capture() {
    let result = run_command("echo", &["hello".to_string()], None, 5)
        .await
        .unwrap();
    assert_eq!(result.stdout, "hello\n");
    assert_eq!(result.exit_code, Some(0));
    assert!(result.success());
}

#[tokio::test]
async fn test_stderr_capture() {
    let result = run_command("sh", &sh("echo err >&2"), None, 5).await.unwrap();
    assert_eq!(result.stderr, "err\n");
    assert_eq!(result.stdout, "");
    assert!(!result.timed_out);
}

#[tokio::test]
async fn test_exit_code() {
    let result = run_command("sh", &sh("exit 42"), None, 5).await.unwrap();
    assert_eq!(result.exit_code, Some(42));
    assert!(!result.success());
}

#[tokio::test]
async fn test_working_directory() {
    let dir = setup_dir();
    let canonical = std::fs::canonicalize(dir.path()).unwrap();
    let result = run_command("pwd", &[], Some(dir.path()), 5).await.unwrap();
    assert_eq!(result.stdout.trim(), canonical.to_str().unwrap());
}

// ============================================================
// Timeout and spawn failures
// ============================================================

#[tokio::test]
async fn test_timeout_kills_process() {
    let start = Instant::now();
    let result = run_command("sleep", &["60".to_string()], None, 1)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(result.timed_out, "should report timed_out");
    assert!(!result.success());
    assert!(elapsed.as_secs() < 10, "took {elapsed:?}");
}

#[tokio::test]
async fn test_missing_program_is_a_spawn_error() {
    let err = run_command("definitely-not-a-real-program-xyz", &[], None, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::SpawnFailed { .. }));
}
