//! Heuristics applied on top of parsed responses and downloaded bodies.

use std::sync::LazyLock;

use regex::Regex;

use crate::response::ParsedResponse;

static CLOUDFLARE_SERVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^cloudflare").unwrap());

static INCAPSULA_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(visid_incap|incap_ses)_").unwrap());

static ETAG_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(?:[wW]/)?"((?:[^"]|\\")*)""#).unwrap());

static CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i);\s*charset\s*=\s*([^\s;]+)").unwrap());

/// Matches `http://`, `https://` and their JSON-escaped `http:\/\/` forms.
static PROTOCOL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?:\\?/\\?/").unwrap());

/// A 403/503 served by Cloudflare's bot challenge.
pub fn protected_by_cloudflare(response: &ParsedResponse) -> bool {
    if !matches!(response.status(), Some(403 | 503)) {
        return false;
    }
    response
        .headers
        .get("server")
        .is_some_and(|v| v.values().iter().any(|s| CLOUDFLARE_SERVER.is_match(s)))
}

/// A 403 carrying Incapsula's visitor/session cookies.
pub fn protected_by_incapsula(response: &ParsedResponse) -> bool {
    if response.status() != Some(403) {
        return false;
    }
    response
        .headers
        .get("set-cookie")
        .is_some_and(|v| v.values().iter().any(|c| INCAPSULA_COOKIE.is_match(c)))
}

pub fn protected_by_bot_mitigation(responses: &[ParsedResponse]) -> bool {
    responses
        .iter()
        .any(|r| protected_by_cloudflare(r) || protected_by_incapsula(r))
}

/// The opaque part of an `ETag` header, without quotes or weak prefix.
pub fn etag_value(header: &str) -> Option<String> {
    ETAG_VALUE
        .captures(header.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The `charset` parameter of a `Content-Type` header.
pub fn charset(content_type: &str) -> Option<&str> {
    CHARSET
        .captures(content_type)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_matches('"'))
}

/// Replace every protocol prefix with `/` so that pages differing only in
/// the scheme of their links compare equal.
pub fn strip_protocols(content: &str) -> String {
    PROTOCOL_PREFIX.replace_all(content, "/").into_owned()
}
