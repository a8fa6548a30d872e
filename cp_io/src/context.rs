//! Per-configuration curl state.
//!
//! The executable path and the `--version` banner are looked up at most once
//! per context and then shared read-only. Build a fresh context to start
//! over (tests do this for every case).

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use cp_core::{CurlConfig, CurlVersionInfo, Version};

use crate::runner::{CurlRunner, SystemCurlRunner};

pub struct CurlContext {
    config: CurlConfig,
    runner: Arc<dyn CurlRunner>,
    executable: OnceLock<PathBuf>,
    version_info: OnceCell<CurlVersionInfo>,
}

impl CurlContext {
    pub fn new(config: CurlConfig, runner: Arc<dyn CurlRunner>) -> Self {
        Self {
            config,
            runner,
            executable: OnceLock::new(),
            version_info: OnceCell::new(),
        }
    }

    /// A context running the real curl, with terminal detection applied.
    pub fn system(mut config: CurlConfig) -> Self {
        config.stdout_is_tty = console::Term::stdout().is_term();
        Self::new(config, Arc::new(SystemCurlRunner::new()))
    }

    pub fn config(&self) -> &CurlConfig {
        &self.config
    }

    pub fn runner(&self) -> &dyn CurlRunner {
        self.runner.as_ref()
    }

    /// The curl binary: the configured path, else `curl` from `PATH`.
    pub fn executable(&self) -> &PathBuf {
        self.executable.get_or_init(|| match &self.config.curl_path {
            Some(path) => path.clone(),
            None => which::which("curl").unwrap_or_else(|_| PathBuf::from("curl")),
        })
    }

    /// Parsed `curl --version`; an unknown version when curl cannot run.
    pub async fn version_info(&self) -> &CurlVersionInfo {
        self.version_info
            .get_or_init(|| async {
                let program = self.executable();
                match self
                    .runner
                    .run(program, &["--version".to_string()], None)
                    .await
                {
                    Ok(result) => {
                        let info = CurlVersionInfo::parse(&result.stdout);
                        debug!(
                            version = info.version.as_ref().map(Version::as_str),
                            http2 = info.supports_http2(),
                            "detected curl"
                        );
                        info
                    }
                    Err(e) => {
                        warn!("could not determine curl version: {}", e);
                        CurlVersionInfo::default()
                    }
                }
            })
            .await
    }

    pub async fn version(&self) -> Option<&Version> {
        self.version_info().await.version.as_ref()
    }

    pub async fn supports_http2(&self) -> bool {
        self.version_info().await.supports_http2()
    }
}
