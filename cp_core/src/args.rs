//! Argument construction for a single curl invocation.

use crate::config::CurlConfig;
use crate::user_agent::UserAgent;

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Caller intent for one curl run.
#[derive(Debug, Clone, PartialEq)]
pub struct CurlOptions {
    /// Seconds; rounded to milliseconds.
    pub connect_timeout: Option<f64>,
    /// Seconds; rounded to milliseconds.
    pub max_time: Option<f64>,
    /// Falls back to [`CurlConfig::retries`] when unset.
    pub retries: Option<u32>,
    /// Seconds; rounded to whole seconds.
    pub retry_max_time: Option<f64>,
    /// Output is captured by the caller instead of passed through.
    pub show_output: bool,
    pub show_error: bool,
    pub user_agent: UserAgent,
    pub referer: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            max_time: None,
            retries: None,
            retry_max_time: None,
            show_output: false,
            show_error: true,
            user_agent: UserAgent::Default,
            referer: None,
        }
    }
}

impl CurlOptions {
    /// Options for runs whose stdout is parsed rather than shown.
    pub fn captured() -> Self {
        Self {
            show_output: true,
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }
}

/// Build the full argument vector; `extra` is appended last.
pub fn curl_args(config: &CurlConfig, options: &CurlOptions, extra: &[String]) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    // Config handling has to come first for curl to honour it.
    args.push("--disable".into());
    if let Some(curlrc) = &config.curlrc {
        args.push("--config".into());
        args.push(curlrc.to_string_lossy().into_owned());
    }

    // Cookies received on a redirect are echoed back but never persisted.
    args.push("--cookie".into());
    args.push(NULL_DEVICE.into());
    args.push("--globoff".into());

    if options.show_error {
        args.push("--show-error".into());
    }

    args.push("--user-agent".into());
    args.push(options.user_agent.header_value().to_string());

    args.push("--header".into());
    args.push("Accept-Language: en".into());

    if !options.show_output {
        args.push("--fail".into());
        if !config.verbose {
            args.push("--progress-bar".into());
        }
        if config.curl_verbose {
            args.push("--verbose".into());
        }
        if !config.stdout_is_tty || config.quiet {
            args.push("--silent".into());
        }
    }

    if let Some(secs) = positive(options.connect_timeout) {
        args.push("--connect-timeout".into());
        args.push(format_seconds(secs));
    }
    if let Some(secs) = positive(options.max_time) {
        args.push("--max-time".into());
        args.push(format_seconds(secs));
    }

    let retries = options.retries.unwrap_or(config.retries);
    if retries > 0 {
        args.push("--retry".into());
        args.push(retries.to_string());
    }

    if let Some(secs) = positive(options.retry_max_time) {
        args.push("--retry-max-time".into());
        args.push(format!("{}", secs.round() as u64));
    }

    if let Some(referer) = options.referer.as_deref().filter(|r| !r.trim().is_empty()) {
        args.push("--referer".into());
        args.push(referer.to_string());
    }

    args.extend(extra.iter().cloned());
    args
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn format_seconds(secs: f64) -> String {
    let rounded = (secs * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}
