//! Test utilities for cprobe
//!
//! This module provides common test infrastructure for unit and integration
//! tests that would otherwise need a real curl and a live network:
//!
//! - `ScriptedRunner` - A `CurlRunner` that answers per URL from canned replies
//! - `http_block` - Build a raw response header block as curl prints it
//! - `TestContext` - Wraps TempDir, MockServer (GitHub API) and a scripted curl
//!
//! # Example
//!
//! ```ignore
//! use cp_io::test_utils::{CannedCurl, TestContext, http_block};
//!
//! #[tokio::test]
//! async fn test_probe() {
//!     let ctx = TestContext::new().await;
//!     ctx.runner.on("https://example.com/", CannedCurl::ok(http_block(200, &[])));
//!
//!     let finding = ctx.auditor().check_http_content(&request).await.unwrap();
//!     assert!(finding.is_none());
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cp_core::{CurlConfig, Error};

use crate::audit::Auditor;
use crate::context::CurlContext;
use crate::curl::Curl;
use crate::github::GitHubClient;
use crate::runner::{CurlRunner, ExecResult};

pub const DEFAULT_BANNER: &str = "curl 8.11.0 (x86_64-pc-linux-gnu) libcurl/8.11.0 OpenSSL/3.0.13\n\
Release-Date: 2024-11-06\n\
Protocols: dict file ftp ftps http https\n\
Features: alt-svc AsynchDNS HSTS HTTP2 HTTPS-proxy IPv6 Largefile libz SSL threadsafe UnixSockets\n";

// ============================================================================
// Response fixtures
// ============================================================================

/// A raw header block for one response, terminated by a blank line.
pub fn http_block(status: u16, headers: &[(&str, &str)]) -> String {
    let mut block = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
    for (name, value) in headers {
        block.push_str(&format!("{}: {}\r\n", name, value));
    }
    block.push_str("\r\n");
    block
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// One canned curl run.
#[derive(Debug, Clone, Default)]
pub struct CannedCurl {
    pub exit_status: i32,
    /// Header blocks, printed to stdout.
    pub headers: String,
    /// Written to the `--output` file on success, else appended to stdout.
    pub body: String,
    pub stderr: String,
}

impl CannedCurl {
    pub fn ok(headers: impl Into<String>) -> Self {
        Self {
            headers: headers.into(),
            ..Self::default()
        }
    }

    /// A run that produced nothing but an error.
    pub fn failure(exit_status: i32, stderr: &str) -> Self {
        Self {
            exit_status,
            stderr: stderr.to_string(),
            ..Self::default()
        }
    }

    pub fn exit(mut self, exit_status: i32) -> Self {
        self.exit_status = exit_status;
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }
}

// ============================================================================
// ScriptedRunner
// ============================================================================

/// A `CurlRunner` that never spawns a process.
///
/// Replies are queued per URL (the last argument); the final reply in a
/// queue repeats forever. `--version` is answered with the banner. URLs
/// with nothing queued fail like an unresolvable host.
pub struct ScriptedRunner {
    banner: String,
    routes: Mutex<HashMap<String, VecDeque<CannedCurl>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            banner: DEFAULT_BANNER.to_string(),
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_banner(mut self, banner: &str) -> Self {
        self.banner = banner.to_string();
        self
    }

    pub fn on(&self, url: &str, reply: CannedCurl) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every recorded argument vector, `--version` queries excluded.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|args| args.last().is_some_and(|a| a == url))
            .count()
    }

    fn next_reply(&self, url: &str) -> Option<CannedCurl> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CurlRunner for ScriptedRunner {
    async fn run(
        &self,
        _program: &Path,
        args: &[String],
        _timeout: Option<Duration>,
    ) -> Result<ExecResult, Error> {
        if args.len() == 1 && args[0] == "--version" {
            return Ok(ExecResult {
                exit_status: Some(0),
                stdout: self.banner.clone(),
                stderr: String::new(),
            });
        }

        self.calls.lock().unwrap().push(args.to_vec());
        let url = args.last().map(String::as_str).unwrap_or_default();
        let Some(reply) = self.next_reply(url) else {
            return Ok(ExecResult {
                exit_status: Some(6),
                stdout: String::new(),
                stderr: format!("curl: (6) Could not resolve host: {}", url),
            });
        };

        let output = args
            .windows(2)
            .find(|w| w[0] == "--output")
            .map(|w| PathBuf::from(&w[1]));

        let mut stdout = reply.headers.clone();
        match output {
            Some(path) if reply.exit_status == 0 => {
                std::fs::write(&path, &reply.body).map_err(|e| Error::FileSystem {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            }
            Some(_) => {}
            None => stdout.push_str(&reply.body),
        }

        Ok(ExecResult {
            exit_status: Some(reply.exit_status),
            stdout,
            stderr: reply.stderr,
        })
    }
}

// ============================================================================
// TestContext - Main test infrastructure
// ============================================================================

/// Test context that wraps common test setup.
///
/// Provides:
/// - Temporary directory for downloads
/// - Mock server standing in for the GitHub API
/// - A shared `ScriptedRunner` behind every `Curl` it hands out
pub struct TestContext {
    pub tmp: TempDir,
    pub github: MockServer,
    pub runner: Arc<ScriptedRunner>,
    config: CurlConfig,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_runner(ScriptedRunner::new()).await
    }

    pub async fn with_runner(runner: ScriptedRunner) -> Self {
        Self::with_config(runner, Self::config()).await
    }

    pub async fn with_config(runner: ScriptedRunner, config: CurlConfig) -> Self {
        Self {
            tmp: TempDir::new().expect("failed to create temp dir"),
            github: MockServer::start().await,
            runner: Arc::new(runner),
            config,
        }
    }

    /// Non-interactive configuration with a GitHub token set.
    pub fn config() -> CurlConfig {
        CurlConfig {
            curl_path: Some(PathBuf::from("curl")),
            github_api_token: Some("test-token".to_string()),
            ..CurlConfig::default()
        }
    }

    /// A fresh `Curl`; each one re-detects the curl version.
    pub fn curl(&self) -> Curl {
        let runner: Arc<dyn CurlRunner> = self.runner.clone();
        Curl::new(CurlContext::new(self.config.clone(), runner))
    }

    /// An auditor whose GitHub lookups go to the mock server.
    pub fn auditor(&self) -> Auditor {
        let github = GitHubClient::with_base_url(
            self.github.uri(),
            self.config.github_api_token.clone(),
        );
        Auditor::new(self.curl()).with_repositories(Arc::new(github))
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.tmp.path().join(relative)
    }

    /// Answer `GET /repos/{owner}/{repo}` with 200 or 404.
    pub async fn mount_repository(&self, owner: &str, repo: &str, exists: bool) {
        let response = if exists {
            ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"full_name":"{}/{}"}}"#,
                owner, repo
            ))
        } else {
            ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#)
        };

        Mock::given(method("GET"))
            .and(path(format!("/repos/{}/{}", owner, repo)))
            .respond_with(response)
            .mount(&self.github)
            .await;
    }
}

// ============================================================================
// Module tests
// ============================================================================
