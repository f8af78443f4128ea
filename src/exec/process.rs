use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::ExecError;

/// Result of an external command execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run `program` with `args` and capture its output.
///
/// The child runs in its own process group with `kill_on_drop`, so a
/// timeout tears the whole group down. A timeout is reported through
/// `timed_out`, not as an error; only a failure to spawn is `Err`.
pub async fn run_command(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout_secs: u64,
) -> Result<ExecResult, ExecError> {
    #[allow(unused_imports)]
    use std::os::unix::process::CommandExt;

    let mut command = Command::new(program);
    command
        .args(args)
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let child = command.spawn().map_err(|e| ExecError::SpawnFailed {
        program: program.to_string(),
        message: e.to_string(),
    })?;
    let pid = child.id();

    tracing::debug!(program, ?args, pid, "Spawned process");

    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        child.wait_with_output(),
    )
    .await
    {
        Ok(Ok(output)) => Ok(ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            timed_out: false,
        }),
        Ok(Err(e)) => Err(ExecError::ProcessFailed(e.to_string())),
        Err(_) => {
            // The future owning the child was dropped, which kills the leader;
            // signal the group too so grandchildren don't linger.
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            tracing::warn!(program, timeout_secs, "Process timed out");
            Ok(ExecResult {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: None,
                timed_out: true,
            })
        }
    }
}

/// Send SIGKILL to the process group led by `pid`. Errors are ignored.
pub fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
}

/// Send SIGTERM to a single process. Returns false if it was already gone.
pub fn terminate_process(pid: u32) -> bool {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
}
