// Bounded external command execution for provisioners
//
// Every package-manager and toolchain invocation goes through
// CommandExecutor: working directory + environment overlay + timeout, with
// stdout/stderr drained concurrently so the child can never block on a full
// OS pipe while the caller waits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::DEFAULT_COMMAND_TIMEOUT;
use crate::error::{CommandError, Result};

/// Bound on waiting for a drain task after the child has exited or been
/// killed.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// How long a timed-out child gets to react to the graceful terminate
/// signal before it is force-killed.
const TERMINATION_GRACE: Duration = Duration::from_secs(2);

/// Runs external commands on the execution node with a fixed working
/// directory, an environment overlay and a bounded timeout.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    working_dir: PathBuf,
    environment: HashMap<String, String>,
    timeout: Duration,
}

struct CapturedOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl CommandExecutor {
    pub fn new(working_dir: impl Into<PathBuf>, environment: HashMap<String, String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            environment,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra variables layered on top of the overlay for subsequent
    /// commands run through the returned executor.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn env_overlay(&self) -> &HashMap<String, String> {
        &self.environment
    }

    /// Run `argv` and hand the captured stdout to `parser`.
    pub async fn execute<T, F>(&self, parser: F, argv: &[&str]) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        let output = self.run(argv).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parser(stdout.as_ref())
    }

    /// Run `argv` and hand the captured stderr to `parser`, for tools that
    /// report on the error stream.
    pub async fn execute_reading_error<T, F>(&self, parser: F, argv: &[&str]) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        let output = self.run(argv).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        parser(stderr.as_ref())
    }

    async fn run(&self, argv: &[&str]) -> Result<CapturedOutput> {
        let rendered = argv.join(" ");
        let (program, args) = argv.split_first().ok_or_else(|| CommandError::SpawnFailed {
            command: rendered.clone(),
            error: "empty argv".to_string(),
        })?;

        debug!(command = %rendered, working_dir = %self.working_dir.display(), "Running command");

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.working_dir)
            .envs(&self.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Cancellation of the calling future must not leak the child.
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| CommandError::SpawnFailed {
            command: rendered.clone(),
            error: e.to_string(),
        })?;

        let stdout_pipe = child.stdout.take().ok_or_else(|| CommandError::OutputCapture {
            command: rendered.clone(),
            message: "stdout pipe missing".to_string(),
        })?;
        let stderr_pipe = child.stderr.take().ok_or_else(|| CommandError::OutputCapture {
            command: rendered.clone(),
            message: "stderr pipe missing".to_string(),
        })?;

        // Drain both pipes concurrently with execution; the buffers come
        // back when the pipes reach EOF.
        let stdout_task = spawn_drain(stdout_pipe);
        let stderr_task = spawn_drain(stderr_pipe);

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = join_drain(stdout_task, &rendered).await?;
                let stderr = join_drain(stderr_task, &rendered).await?;
                if status.success() {
                    Ok(CapturedOutput { stdout, stderr })
                } else {
                    Err(CommandError::ExecutionFailed {
                        command: rendered,
                        exit_code: status.code(),
                        stderr: String::from_utf8_lossy(&stderr).to_string(),
                    }
                    .into())
                }
            }
            Ok(Err(e)) => Err(CommandError::ExecutionFailed {
                command: rendered,
                exit_code: None,
                stderr: format!("failed to wait for process: {e}"),
            }
            .into()),
            Err(_) => {
                self.terminate(&mut child, &rendered).await;
                // Killing the child closed its pipes, so the drains finish
                // with whatever was captured up to that point.
                let stderr = join_drain(stderr_task, &rendered).await.unwrap_or_default();
                stdout_task.abort();
                Err(CommandError::Timeout {
                    command: rendered,
                    duration: self.timeout,
                    stderr: String::from_utf8_lossy(&stderr).to_string(),
                }
                .into())
            }
        }
    }

    /// Graceful terminate, bounded grace period, then force-kill.
    async fn terminate(&self, child: &mut Child, command: &str) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(TERMINATION_GRACE, child.wait())
                    .await
                    .is_ok()
            {
                debug!(command = %command, "Command terminated after SIGTERM");
                return;
            }
        }

        if let Err(e) = child.kill().await {
            warn!(command = %command, error = %e, "Failed to kill timed-out command");
        }
        let _ = child.wait().await;
    }
}

fn spawn_drain<R>(mut pipe: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer).await;
        buffer
    })
}

async fn join_drain(task: JoinHandle<Vec<u8>>, command: &str) -> Result<Vec<u8>> {
    match tokio::time::timeout(DRAIN_GRACE, task).await {
        Ok(Ok(buffer)) => Ok(buffer),
        Ok(Err(e)) => Err(CommandError::OutputCapture {
            command: command.to_string(),
            message: format!("drain task failed: {e}"),
        }
        .into()),
        Err(_) => Err(CommandError::OutputCapture {
            command: command.to_string(),
            message: "drain task did not finish".to_string(),
        }
        .into()),
    }
}
