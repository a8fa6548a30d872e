//! Settings that shape every curl invocation.
//!
//! Values come from `CPROBE_*` environment variables and can be overridden
//! by the CLI afterwards.

use std::path::PathBuf;

/// Upper bound on the number of chained responses accepted from one capture.
pub const DEFAULT_MAX_RESPONSES: usize = 25;

pub const DEFAULT_CURL_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlConfig {
    /// Explicit curl binary; resolved from `PATH` when unset.
    pub curl_path: Option<PathBuf>,
    /// A curlrc to load exclusively. When unset, curl is told to ignore
    /// every user config file.
    pub curlrc: Option<PathBuf>,
    pub retries: u32,
    pub verbose: bool,
    pub quiet: bool,
    /// Pass `--verbose` to curl itself.
    pub curl_verbose: bool,
    pub no_insecure_redirect: bool,
    pub github_api_token: Option<String>,
    pub max_responses: usize,
    pub stdout_is_tty: bool,
}

impl Default for CurlConfig {
    fn default() -> Self {
        Self {
            curl_path: None,
            curlrc: None,
            retries: DEFAULT_CURL_RETRIES,
            verbose: false,
            quiet: false,
            curl_verbose: false,
            no_insecure_redirect: false,
            github_api_token: None,
            max_responses: DEFAULT_MAX_RESPONSES,
            stdout_is_tty: false,
        }
    }
}

impl CurlConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| non_empty(key).is_some_and(|v| is_truthy(&v));

        Self {
            curl_path: non_empty("CPROBE_CURL_PATH").map(PathBuf::from),
            curlrc: non_empty("CPROBE_CURLRC").map(PathBuf::from),
            retries: non_empty("CPROBE_CURL_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_CURL_RETRIES),
            verbose: flag("CPROBE_VERBOSE"),
            quiet: flag("CPROBE_QUIET"),
            curl_verbose: flag("CPROBE_CURL_VERBOSE"),
            no_insecure_redirect: flag("CPROBE_NO_INSECURE_REDIRECT"),
            github_api_token: non_empty("CPROBE_GITHUB_API_TOKEN"),
            ..Self::default()
        }
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
