use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use cp_core::detect::{charset, etag_value};
use cp_core::{
    CurlOptions, Error, Headers, ParsedResponse, UserAgent, follow_redirections, http_status_ok,
    parse_output,
};

use super::Curl;

const CONNECT_TIMEOUT_SECS: f64 = 15.0;
/// Whole-body fetches for hashing may be large downloads.
const HASH_MAX_TIME_SECS: f64 = 600.0;
const MAX_TIME_SECS: f64 = 25.0;

/// A caller-supplied curl option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecValue {
    /// `true` adds the bare flag, `false` omits it.
    Flag(bool),
    Value(String),
}

/// Turn `(name, value)` pairs into curl flags, `user_agent` becoming
/// `--user-agent`.
pub fn spec_args(specs: &[(String, SpecValue)]) -> Vec<String> {
    let mut args = Vec::new();
    for (name, value) in specs {
        let flag = format!("--{}", name.replace('_', "-"));
        match value {
            SpecValue::Flag(true) => args.push(flag),
            SpecValue::Flag(false) => {}
            SpecValue::Value(v) => {
                args.push(flag);
                args.push(v.clone());
            }
        }
    }
    args
}

#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    pub url: String,
    pub specs: Vec<(String, SpecValue)>,
    /// Fetch the whole body and hash it, with a longer time limit.
    pub hash_needed: bool,
    pub user_agent: UserAgent,
    pub referer: Option<String>,
}

impl ContentRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Everything learned from fetching one URL in full.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentProbe {
    pub url: String,
    /// `None` when a redirect target could not be resolved.
    pub final_url: Option<String>,
    pub exit_status: Option<i32>,
    pub status_code: Option<String>,
    /// Headers of the final response.
    pub headers: Headers,
    pub responses: Vec<ParsedResponse>,
    pub etag: Option<String>,
    pub content_length: Option<String>,
    /// Decoded body; only present when curl succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Hex SHA-256 of the raw body bytes.
    pub body_hash: Option<String>,
}

impl ContentProbe {
    /// A probe that never produced a response, e.g. one that timed out.
    pub fn unreachable(url: impl Into<String>, exit_status: Option<i32>) -> Self {
        Self {
            url: url.into(),
            exit_status,
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        http_status_ok(self.status_code.as_deref())
    }
}

impl Curl {
    /// Fetch a URL with its full body, recording headers, redirect target,
    /// ETag, length and (if asked) a SHA-256 of the body.
    ///
    /// The body goes to a scratch file that is removed on every path out.
    pub async fn content_headers_and_checksum(
        &self,
        request: &ContentRequest,
    ) -> Result<ContentProbe, Error> {
        let scratch = tempfile::Builder::new()
            .prefix("cprobe-body-")
            .tempfile()
            .map_err(|e| Error::FileSystem {
                path: std::env::temp_dir(),
                message: format!("failed to create scratch file: {}", e),
            })?
            .into_temp_path();

        let max_time = if request.hash_needed {
            HASH_MAX_TIME_SECS
        } else {
            MAX_TIME_SECS
        };
        let options = CurlOptions {
            connect_timeout: Some(CONNECT_TIMEOUT_SECS),
            max_time: Some(max_time),
            retry_max_time: Some(max_time),
            user_agent: request.user_agent.clone(),
            referer: request.referer.clone(),
            ..CurlOptions::captured()
        };

        let mut extra = spec_args(&request.specs);
        extra.extend([
            "--dump-header".to_string(),
            "-".to_string(),
            "--output".to_string(),
            scratch.to_string_lossy().into_owned(),
            "--location".to_string(),
            request.url.clone(),
        ]);

        // --max-time bounds one attempt and --retry-max-time the retries.
        let deadline = Duration::from_secs_f64(max_time * 2.0);
        let result = self.output(&extra, &options, Some(deadline)).await?;
        let parsed = parse_output(&result.stdout, self.config().max_responses)?;

        let final_url = match follow_redirections(&parsed.responses, &request.url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("could not resolve redirect target for {}: {}", request.url, e);
                None
            }
        };

        let (status_code, headers) = match parsed.last() {
            Some(last) => (Some(last.status_code.clone()), last.headers.clone()),
            None => (None, Headers::new()),
        };
        let etag = headers.last_value("etag").and_then(etag_value);
        let content_length = headers.last_value("content-length").map(|v| v.trim().to_string());

        let mut body = None;
        let mut body_hash = None;
        if result.success() {
            let bytes = tokio::fs::read(&scratch).await.map_err(|e| Error::FileSystem {
                path: scratch.to_path_buf(),
                message: format!("failed to read body: {}", e),
            })?;
            if request.hash_needed {
                body_hash = Some(format!("{:x}", Sha256::digest(&bytes)));
            }
            body = Some(decode_body(&bytes, headers.last_value("content-type")));
        }

        debug!(
            url = %request.url,
            status = status_code.as_deref(),
            exit_status = result.exit_status,
            "fetched content"
        );

        Ok(ContentProbe {
            url: request.url.clone(),
            final_url,
            exit_status: result.exit_status,
            status_code,
            headers,
            responses: parsed.responses,
            etag,
            content_length,
            body,
            body_hash,
        })
    }
}

/// Decode with the declared charset, else as lossy UTF-8.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some(label) = content_type.and_then(charset) {
        match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(encoding) => {
                let (text, _, _) = encoding.decode(bytes);
                return text.into_owned();
            }
            None => warn!("unknown charset {}, decoding as UTF-8", label),
        }
    }
    String::from_utf8_lossy(bytes).into_owned()
}
