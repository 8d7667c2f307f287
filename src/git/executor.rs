use crate::error::{ExecResult, ExecutionError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Result of executing one git command.
///
/// stdout is kept as raw bytes so diff output and file content survive
/// unmangled; callers that know the output is text use [`stdout_text`].
///
/// [`stdout_text`]: CommandResult::stdout_text
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout decoded as UTF-8, lossily.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Convert a non-zero exit into [`ExecutionError::NonZeroExit`].
    ///
    /// The executor itself never raises on exit status; whether non-zero is
    /// an error depends on the command (e.g. "nothing to commit").
    pub fn require_success(self, operation: &str) -> ExecResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecutionError::NonZeroExit {
                operation: operation.to_string(),
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs git commands in a repository working directory.
///
/// Spawns exactly one subprocess per call and enforces a per-invocation
/// timeout. Serialization across calls is the queue's job, not this one's.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    repo_path: PathBuf,
    binary: PathBuf,
    default_timeout: Duration,
}

impl CommandExecutor {
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            binary: PathBuf::from("git"),
            default_timeout: Duration::from_secs(30),
        }
    }

    /// Override the git binary (tests, non-PATH installs).
    pub fn with_binary<P: AsRef<Path>>(mut self, binary: P) -> Self {
        self.binary = binary.as_ref().to_path_buf();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run with the executor's default timeout.
    pub async fn run(&self, args: &[String]) -> ExecResult<CommandResult> {
        self.run_with_timeout(args, self.default_timeout).await
    }

    /// Run the configured binary with the given argument vector.
    ///
    /// Captures full stdout/stderr. If the process has not exited within
    /// `timeout` it is killed and `Timeout` is returned.
    pub async fn run_with_timeout(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> ExecResult<CommandResult> {
        if args.is_empty() {
            return Err(ExecutionError::SpawnFailure {
                binary: self.binary.display().to_string(),
                message: "empty argument vector".to_string(),
            });
        }

        let started = Instant::now();
        let child = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.repo_path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailure {
                binary: self.binary.display().to_string(),
                message: e.to_string(),
            })?;

        // kill_on_drop reaps the child when the elapsed branch drops the
        // wait future.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExecutionError::SpawnFailure {
                    binary: self.binary.display().to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => return Err(ExecutionError::Timeout(timeout)),
        };

        Ok(CommandResult {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().to_path_buf();

        StdCommand::new("git")
            .args(["init"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        StdCommand::new("git")
            .args(["config", "user.name", "Test User"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        StdCommand::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        (temp_dir, repo_path)
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_status() {
        let (_temp, repo_path) = create_test_repo();
        let executor = CommandExecutor::new(&repo_path);

        let result = executor.run(&args(&["status", "--porcelain"])).await.unwrap();
        assert!(result.success());
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported_not_raised() {
        let (_temp, repo_path) = create_test_repo();
        let executor = CommandExecutor::new(&repo_path);

        // Log in an empty repo exits non-zero.
        let result = executor.run(&args(&["log", "--oneline"])).await.unwrap();
        assert!(!result.success());
        assert!(result.require_success("log").is_err());
    }

    #[tokio::test]
    async fn test_require_success_carries_stderr() {
        let (_temp, repo_path) = create_test_repo();
        let executor = CommandExecutor::new(&repo_path);

        let result = executor
            .run(&args(&["checkout", "no-such-branch"]))
            .await
            .unwrap();
        let err = result.require_success("checkout").unwrap_err();
        match err {
            ExecutionError::NonZeroExit {
                operation, stderr, ..
            } => {
                assert_eq!(operation, "checkout");
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_for_missing_binary() {
        let (_temp, repo_path) = create_test_repo();
        let executor =
            CommandExecutor::new(&repo_path).with_binary("/nonexistent/definitely-not-git");

        let err = executor.run(&args(&["status"])).await.unwrap_err();
        assert!(matches!(err, ExecutionError::SpawnFailure { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_the_command() {
        let (_temp, repo_path) = create_test_repo();
        let executor = CommandExecutor::new(&repo_path).with_binary("/bin/sleep");

        let err = executor
            .run_with_timeout(&args(&["5"]), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_empty_args_rejected() {
        let (_temp, repo_path) = create_test_repo();
        let executor = CommandExecutor::new(&repo_path);

        assert!(executor.run(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_duration_measured() {
        let (_temp, repo_path) = create_test_repo();
        let executor = CommandExecutor::new(&repo_path);

        let result = executor.run(&args(&["status", "--porcelain"])).await.unwrap();
        assert!(result.duration > Duration::ZERO);
    }
}
