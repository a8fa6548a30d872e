//! Running curl with compatibility workarounds.
//!
//! Submodules add the higher-level operations on [`Curl`]:
//!
//! - `headers` - header probes with a GET fallback
//! - `download` - downloads with resume support
//! - `content` - full body fetch with headers and checksum

mod content;
mod download;
mod headers;

use std::time::{Duration, Instant};

use tracing::debug;

use cp_core::exit_code::{HTTP2_FRAMING_ERROR, OPERATION_TIMEDOUT, RECV_ERROR};
use cp_core::{CurlConfig, CurlOptions, Error, Version, curl_args};

use crate::context::CurlContext;
use crate::runner::{ExecResult, render_command};

pub use content::{ContentProbe, ContentRequest, SpecValue, spec_args};
pub use download::DownloadOutcome;
pub use headers::ProbeMethod;

/// The first curl release without the HTTP/2 unexpected-EOF bug.
const HTTP2_EOF_FIXED_IN: &str = "7.60.0";

const HTTP1_FLAG: &str = "--http1.1";

pub struct Curl {
    ctx: CurlContext,
}

impl Curl {
    pub fn new(ctx: CurlContext) -> Self {
        Self { ctx }
    }

    pub fn system(config: CurlConfig) -> Self {
        Self::new(CurlContext::system(config))
    }

    pub fn context(&self) -> &CurlContext {
        &self.ctx
    }

    pub fn config(&self) -> &CurlConfig {
        self.ctx.config()
    }

    /// The argument vector for one invocation with this context's settings.
    pub fn args(&self, options: &CurlOptions, extra: &[String]) -> Vec<String> {
        curl_args(self.ctx.config(), options, extra)
    }

    /// Run curl once, retrying with `--http1.1` after the HTTP/2 failures
    /// older curls are known for.
    ///
    /// Non-success results are returned as-is for the caller to judge. A
    /// `timeout` is a budget for the whole call, retries included.
    pub async fn run_with_workarounds(
        &self,
        extra: &[String],
        options: &CurlOptions,
        timeout: Option<Duration>,
    ) -> Result<ExecResult, Error> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut extra = extra.to_vec();

        // Each workaround adds --http1.1, which ends the loop on the next pass.
        loop {
            let remaining = deadline.map(remaining_until).transpose()?;
            let args = self.args(options, &extra);
            let program = self.ctx.executable();
            debug!(command = %render_command(program, &args), "running curl");

            let result = self.ctx.runner().run(program, &args, remaining).await?;
            if result.success() || extra.iter().any(|a| a == HTTP1_FLAG) {
                return Ok(result);
            }

            if timeout.is_some() && result.exited_with(OPERATION_TIMEDOUT) {
                return Err(Error::Timeout {
                    message: result.last_stderr_line(),
                });
            }

            if result.exited_with(HTTP2_FRAMING_ERROR) {
                debug!("HTTP/2 framing error, retrying with {}", HTTP1_FLAG);
                extra.push(HTTP1_FLAG.to_string());
                continue;
            }

            if result.exited_with(RECV_ERROR) && self.has_http2_eof_bug().await {
                debug!("unexpected EOF on a curl with the HTTP/2 EOF bug, retrying with {}", HTTP1_FLAG);
                extra.push(HTTP1_FLAG.to_string());
                continue;
            }

            return Ok(result);
        }
    }

    /// Like [`Curl::run_with_workarounds`] but any failure is an error.
    pub async fn run(
        &self,
        extra: &[String],
        options: &CurlOptions,
        timeout: Option<Duration>,
    ) -> Result<ExecResult, Error> {
        let result = self.run_with_workarounds(extra, options, timeout).await?;
        result.assert_success(&self.describe(extra))
    }

    /// Run with output captured for parsing rather than passed through.
    pub async fn output(
        &self,
        extra: &[String],
        options: &CurlOptions,
        timeout: Option<Duration>,
    ) -> Result<ExecResult, Error> {
        let options = CurlOptions {
            show_output: true,
            ..options.clone()
        };
        self.run_with_workarounds(extra, &options, timeout).await
    }

    async fn has_http2_eof_bug(&self) -> bool {
        let info = self.ctx.version_info().await;
        if !info.supports_http2() {
            return false;
        }
        info.version
            .as_ref()
            .is_some_and(|v| v < &Version::parse(HTTP2_EOF_FIXED_IN))
    }

    fn describe(&self, extra: &[String]) -> String {
        render_command(self.ctx.executable(), extra)
    }

    fn execution_error(&self, extra: &[String], result: ExecResult) -> Error {
        Error::ExecutionFailed {
            command: self.describe(extra),
            exit_status: result.exit_status,
            stderr: result.stderr,
        }
    }
}

fn remaining_until(deadline: Instant) -> Result<Duration, Error> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(Error::Timeout {
            message: "deadline exceeded before curl could be retried".to_string(),
        });
    }
    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockCurlRunner;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OLD_HTTP2_BANNER: &str = "curl 7.54.0 (x86_64-apple-darwin17.0)\nFeatures: IPv6 SSL HTTP2\n";
    const NEW_HTTP2_BANNER: &str = "curl 8.11.0 (x86_64-pc-linux-gnu)\nFeatures: IPv6 SSL HTTP2\n";
    const OLD_HTTP1_BANNER: &str = "curl 7.54.0 (x86_64-apple-darwin17.0)\nFeatures: IPv6 SSL\n";

    fn curl_with(runner: MockCurlRunner) -> Curl {
        let config = CurlConfig {
            curl_path: Some(PathBuf::from("curl")),
            ..CurlConfig::default()
        };
        Curl::new(CurlContext::new(config, Arc::new(runner)))
    }

    fn exit(code: i32) -> ExecResult {
        ExecResult {
            exit_status: Some(code),
            stdout: String::new(),
            stderr: format!("curl: ({}) failure", code),
        }
    }

    fn is_version_query(args: &[String]) -> bool {
        args.len() == 1 && args[0] == "--version"
    }

    fn expect_banner(mock: &mut MockCurlRunner, banner: &'static str) {
        mock.expect_run()
            .withf(|_, args, _| is_version_query(args))
            .returning(move |_, _, _| {
                Ok(ExecResult {
                    exit_status: Some(0),
                    stdout: banner.to_string(),
                    stderr: String::new(),
                })
            });
    }

    fn url() -> Vec<String> {
        vec!["https://example.com/".to_string()]
    }

    #[tokio::test]
    async fn success_is_returned_without_retry() {
        let mut mock = MockCurlRunner::new();
        mock.expect_run().times(1).returning(|_, _, _| Ok(exit(0)));

        let result = curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), None)
            .await
            .unwrap();
        assert!(result.success());
    }

    #[tokio::test]
    async fn http2_framing_error_retries_once_with_http1() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockCurlRunner::new();
        mock.expect_run().times(2).returning(move |_, args, _| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => {
                    assert!(!args.iter().any(|a| a == "--http1.1"));
                    Ok(exit(16))
                }
                _ => {
                    assert_eq!(args.last().map(String::as_str), Some("--http1.1"));
                    Ok(ExecResult {
                        exit_status: Some(35),
                        stdout: "retry output".into(),
                        stderr: "curl: (35) SSL connect error".into(),
                    })
                }
            }
        });

        let result = curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), None)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.exit_status, Some(35));
        assert_eq!(result.stdout, "retry output");
    }

    #[tokio::test]
    async fn http2_framing_error_with_http1_already_set_is_returned() {
        let mut mock = MockCurlRunner::new();
        mock.expect_run().times(1).returning(|_, _, _| Ok(exit(16)));

        let extra = vec!["--http1.1".to_string(), "https://example.com/".to_string()];
        let result = curl_with(mock)
            .run_with_workarounds(&extra, &CurlOptions::captured(), None)
            .await
            .unwrap();
        assert!(result.exited_with(16));
    }

    #[tokio::test]
    async fn unexpected_eof_on_buggy_curl_retries_with_http1() {
        let mut mock = MockCurlRunner::new();
        expect_banner(&mut mock, OLD_HTTP2_BANNER);
        mock.expect_run()
            .withf(|_, args, _| !is_version_query(args) && !args.iter().any(|a| a == "--http1.1"))
            .times(1)
            .returning(|_, _, _| Ok(exit(56)));
        mock.expect_run()
            .withf(|_, args, _| args.iter().any(|a| a == "--http1.1"))
            .times(1)
            .returning(|_, _, _| Ok(exit(0)));

        let result = curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), None)
            .await
            .unwrap();
        assert!(result.success());
    }

    #[tokio::test]
    async fn unexpected_eof_on_fixed_curl_is_returned() {
        let mut mock = MockCurlRunner::new();
        expect_banner(&mut mock, NEW_HTTP2_BANNER);
        mock.expect_run()
            .withf(|_, args, _| !is_version_query(args))
            .times(1)
            .returning(|_, _, _| Ok(exit(56)));

        let result = curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), None)
            .await
            .unwrap();
        assert!(result.exited_with(56));
    }

    #[tokio::test]
    async fn unexpected_eof_without_http2_support_is_returned() {
        let mut mock = MockCurlRunner::new();
        expect_banner(&mut mock, OLD_HTTP1_BANNER);
        mock.expect_run()
            .withf(|_, args, _| !is_version_query(args))
            .times(1)
            .returning(|_, _, _| Ok(exit(56)));

        let result = curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), None)
            .await
            .unwrap();
        assert!(result.exited_with(56));
    }

    #[tokio::test]
    async fn timeout_exit_with_deadline_is_an_error() {
        let mut mock = MockCurlRunner::new();
        mock.expect_run().times(1).returning(|_, _, timeout| {
            assert!(timeout.is_some());
            Ok(ExecResult {
                exit_status: Some(28),
                stdout: String::new(),
                stderr: "  0 0\ncurl: (28) Operation timed out after 2001 milliseconds\n".into(),
            })
        });

        let err = curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), Some(Duration::from_secs(30)))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::Timeout {
                message: "curl: (28) Operation timed out after 2001 milliseconds".into()
            }
        );
    }

    #[tokio::test]
    async fn timeout_exit_without_deadline_is_returned() {
        let mut mock = MockCurlRunner::new();
        mock.expect_run().times(1).returning(|_, _, _| Ok(exit(28)));

        let result = curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), None)
            .await
            .unwrap();
        assert!(result.exited_with(28));
    }

    #[tokio::test]
    async fn retry_gets_the_remaining_budget() {
        let budgets = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = budgets.clone();
        let mut mock = MockCurlRunner::new();
        mock.expect_run().times(2).returning(move |_, args, timeout| {
            seen.lock().unwrap().push(timeout);
            if args.iter().any(|a| a == "--http1.1") {
                Ok(exit(0))
            } else {
                Ok(exit(16))
            }
        });

        curl_with(mock)
            .run_with_workarounds(&url(), &CurlOptions::captured(), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let budgets = budgets.lock().unwrap();
        let first = budgets[0].unwrap();
        let second = budgets[1].unwrap();
        assert!(first <= Duration::from_secs(60));
        assert!(second <= first);
    }

    #[tokio::test]
    async fn strict_run_fails_on_error_status() {
        let mut mock = MockCurlRunner::new();
        mock.expect_run().times(1).returning(|_, _, _| Ok(exit(22)));

        let err = curl_with(mock)
            .run(&url(), &CurlOptions::default(), None)
            .await
            .unwrap_err();

        match err {
            Error::ExecutionFailed {
                command,
                exit_status,
                ..
            } => {
                assert!(command.contains("https://example.com/"));
                assert_eq!(exit_status, Some(22));
            }
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn output_forces_captured_mode() {
        let mut mock = MockCurlRunner::new();
        mock.expect_run()
            .withf(|_, args, _| !args.iter().any(|a| a == "--fail" || a == "--progress-bar"))
            .times(1)
            .returning(|_, _, _| Ok(exit(0)));

        curl_with(mock)
            .output(&url(), &CurlOptions::default(), None)
            .await
            .unwrap();
    }
}
