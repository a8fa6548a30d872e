//! Process boundary for curl.
//!
//! Everything above this module talks to curl through [`CurlRunner`], so
//! tests can inject mock runners that simulate exit statuses and output.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;

use cp_core::Error;

/// Captured outcome of one curl run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// `None` when the process was terminated by a signal.
    pub exit_status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    pub fn exited_with(&self, code: i32) -> bool {
        self.exit_status == Some(code)
    }

    pub fn last_stderr_line(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim_end().to_string())
            .unwrap_or_default()
    }

    /// Convert a failed run into [`Error::ExecutionFailed`].
    pub fn assert_success(self, command: &str) -> Result<ExecResult, Error> {
        if self.success() {
            return Ok(self);
        }
        Err(Error::ExecutionFailed {
            command: command.to_string(),
            exit_status: self.exit_status,
            stderr: self.stderr,
        })
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CurlRunner: Send + Sync {
    /// Run `program` with `args`, capturing stdout and stderr.
    ///
    /// With a `timeout`, a run that outlives it is killed and reported as
    /// [`Error::Timeout`].
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, Error>;
}

/// Runs the real binary with tokio's process support.
pub struct SystemCurlRunner;

impl SystemCurlRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemCurlRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CurlRunner for SystemCurlRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, Error> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| Error::CurlUnavailable {
            message: format!("{}: {}", program.display(), e),
        })?;

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| Error::Timeout {
                    message: format!("no response within {:.1}s", limit.as_secs_f64()),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::CurlUnavailable {
            message: format!("{}: {}", program.display(), e),
        })?;

        Ok(ExecResult {
            exit_status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Shell-style rendering used in logs and error messages.
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
            rendered.push('\'');
            rendered.push_str(&arg.replace('\'', r"'\''"));
            rendered.push('\'');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}
