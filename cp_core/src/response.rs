//! Parser for the raw text curl writes with `--dump-header -` / `--include`.
//!
//! Grammar of one capture:
//!
//! ```text
//! capture    = *( response separator ) body
//! response   = status-line *( line-break header-line )
//! status     = "HTTP/" version SP code [ SP text ]
//! header     = name ":" *WS value
//! separator  = CRLF CRLF | LF LF
//! ```
//!
//! Redirects produce one response block per hop, oldest first.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::Error;

static STATUS_LINE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\AHTTP/[\d.]+ \d+").unwrap());

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\AHTTP/[\d.]+ (?P<code>\d+)(?: +(?P<text>[^\r\n]*))?").unwrap()
});

/// A header that appeared once keeps a plain value; repeats accumulate in
/// order of appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = HeaderValue::Multiple(vec![first, value]);
            }
            HeaderValue::Multiple(values) => values.push(value),
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            HeaderValue::Single(value) => std::slice::from_ref(value),
            HeaderValue::Multiple(values) => values,
        }
    }

    pub fn first(&self) -> &str {
        self.values().first().map(String::as_str).unwrap_or_default()
    }

    pub fn last(&self) -> &str {
        self.values().last().map(String::as_str).unwrap_or_default()
    }
}

/// Header map keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, HeaderValue>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let key = name.trim().to_ascii_lowercase();
        match self.0.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                self.0.insert(key, HeaderValue::Single(value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.0.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The last non-blank occurrence of `name`.
    pub fn last_value(&self, name: &str) -> Option<&str> {
        self.get(name)?
            .values()
            .iter()
            .rev()
            .map(|v| v.as_str())
            .find(|v| !v.trim().is_empty())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedResponse {
    pub status_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    pub headers: Headers,
}

impl ParsedResponse {
    pub fn status(&self) -> Option<u16> {
        self.status_code.parse().ok()
    }

    pub fn is_ok(&self) -> bool {
        http_status_ok(Some(&self.status_code))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedOutput {
    pub responses: Vec<ParsedResponse>,
    pub body: String,
}

impl ParsedOutput {
    pub fn last(&self) -> Option<&ParsedResponse> {
        self.responses.last()
    }
}

/// True for 1xx and 2xx codes.
pub fn http_status_ok(status: Option<&str>) -> bool {
    status
        .and_then(|s| s.trim().parse::<u16>().ok())
        .is_some_and(|code| (100..=299).contains(&code))
}

/// Split a capture into its chained responses and the trailing body.
///
/// Fails with [`Error::TooManyRedirects`] when more than `max_responses`
/// blocks are found.
pub fn parse_output(output: &str, max_responses: usize) -> Result<ParsedOutput, Error> {
    let mut responses = Vec::new();
    let mut rest = output;
    let mut iterations = 0usize;

    loop {
        let candidate = rest.trim_start();
        if !STATUS_LINE_START.is_match(candidate) {
            break;
        }
        let Some((block, remainder)) = split_block(candidate) else {
            break;
        };

        iterations += 1;
        if iterations > max_responses {
            return Err(Error::TooManyRedirects { max: max_responses });
        }

        rest = remainder;
        if let Some(response) = parse_response(block) {
            responses.push(response);
        }
    }

    Ok(ParsedOutput {
        responses,
        body: rest.to_string(),
    })
}

/// Parse one response block (status line plus header lines).
pub fn parse_response(block: &str) -> Option<ParsedResponse> {
    let block = block.trim_end();
    let caps = STATUS_LINE.captures(block)?;

    let status_code = caps.name("code")?.as_str().to_string();
    let status_text = caps
        .name("text")
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let mut headers = Headers::new();
    for line in block.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().is_empty() {
            continue;
        }
        headers.insert(name, value.trim());
    }

    Some(ParsedResponse {
        status_code,
        status_text,
        headers,
    })
}

/// Split at the first blank line, accepting either CRLF or bare LF.
fn split_block(text: &str) -> Option<(&str, &str)> {
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let lf = text.find("\n\n").map(|i| (i, 2));

    let (idx, len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (a, b) => a.or(b)?,
    };

    Some((&text[..idx], &text[idx + len..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(code: u16, headers: &[(&str, &str)]) -> String {
        let mut text = format!("HTTP/1.1 {} Status\r\n", code);
        for (name, value) in headers {
            text.push_str(&format!("{}: {}\r\n", name, value));
        }
        text.push_str("\r\n");
        text
    }

    #[test]
    fn parses_single_response_with_body() {
        let raw = format!(
            "{}<html>hello</html>",
            block(200, &[("Content-Type", "text/html"), ("Content-Length", "18")])
        );
        let parsed = parse_output(&raw, 25).unwrap();

        assert_eq!(parsed.responses.len(), 1);
        let response = &parsed.responses[0];
        assert_eq!(response.status_code, "200");
        assert_eq!(response.status_text.as_deref(), Some("Status"));
        assert_eq!(
            response.headers.get("content-type"),
            Some(&HeaderValue::Single("text/html".into()))
        );
        assert_eq!(parsed.body, "<html>hello</html>");
    }

    #[test]
    fn parses_redirect_chain_in_order() {
        let raw = format!(
            "{}{}{}",
            block(301, &[("Location", "https://example.com/")]),
            block(302, &[("Location", "/home")]),
            block(200, &[("ETag", "\"abc\"")]),
        );
        let parsed = parse_output(&raw, 25).unwrap();

        let codes: Vec<&str> = parsed.responses.iter().map(|r| r.status_code.as_str()).collect();
        assert_eq!(codes, ["301", "302", "200"]);
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn http2_status_line_without_text() {
        let parsed = parse_output("HTTP/2 204\r\nserver: nginx\r\n\r\n", 25).unwrap();

        assert_eq!(parsed.responses[0].status_code, "204");
        assert!(parsed.responses[0].status_text.is_none());
        assert_eq!(parsed.responses[0].headers.last_value("server"), Some("nginx"));
    }

    #[test]
    fn tolerates_bare_newline_separator() {
        let parsed = parse_output("HTTP/1.0 200 OK\nServer: test\n\nbody text", 25).unwrap();

        assert_eq!(parsed.responses.len(), 1);
        assert_eq!(parsed.responses[0].headers.last_value("server"), Some("test"));
        assert_eq!(parsed.body, "body text");
    }

    #[test]
    fn repeated_headers_accumulate_in_order() {
        let raw = block(
            200,
            &[("Set-Cookie", "a=1"), ("set-cookie", "b=2"), ("SET-COOKIE", "c=3"), ("Server", "x")],
        );
        let parsed = parse_output(&raw, 25).unwrap();
        let headers = &parsed.responses[0].headers;

        assert_eq!(
            headers.get("set-cookie"),
            Some(&HeaderValue::Multiple(vec!["a=1".into(), "b=2".into(), "c=3".into()]))
        );
        assert_eq!(headers.get("server"), Some(&HeaderValue::Single("x".into())));
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let upper = parse_output(&block(200, &[("ETag", "\"abc\"")]), 25).unwrap();
        let lower = parse_output(&block(200, &[("etag", "\"abc\"")]), 25).unwrap();

        assert_eq!(upper, lower);
        assert!(upper.responses[0].headers.contains("ETAG"));
    }

    #[test]
    fn header_value_keeps_colons() {
        let parsed = parse_output(&block(302, &[("Location", "https://a:8443/x")]), 25).unwrap();
        assert_eq!(
            parsed.responses[0].headers.last_value("location"),
            Some("https://a:8443/x")
        );
    }

    #[test]
    fn text_without_status_line_is_all_body() {
        let parsed = parse_output("just some text\r\n\r\nmore", 25).unwrap();
        assert!(parsed.responses.is_empty());
        assert_eq!(parsed.body, "just some text\r\n\r\nmore");
    }

    #[test]
    fn status_line_without_separator_is_body() {
        let parsed = parse_output("HTTP/1.1 200 OK\r\nServer: x", 25).unwrap();
        assert!(parsed.responses.is_empty());
        assert_eq!(parsed.body, "HTTP/1.1 200 OK\r\nServer: x");
    }

    #[test]
    fn exceeding_the_limit_is_an_error() {
        let raw = block(301, &[("Location", "/loop")]).repeat(4);

        assert_eq!(parse_output(&raw, 4).unwrap().responses.len(), 4);
        assert_eq!(
            parse_output(&raw, 3).unwrap_err(),
            Error::TooManyRedirects { max: 3 }
        );
    }

    #[test]
    fn status_ok_predicate() {
        assert!(http_status_ok(Some("100")));
        assert!(http_status_ok(Some("200")));
        assert!(http_status_ok(Some("299")));
        assert!(!http_status_ok(Some("99")));
        assert!(!http_status_ok(Some("300")));
        assert!(!http_status_ok(Some("404")));
        assert!(!http_status_ok(Some("abc")));
        assert!(!http_status_ok(Some("")));
        assert!(!http_status_ok(None));
    }

    #[test]
    fn serializes_single_and_multiple_values() {
        let raw = block(200, &[("Vary", "Accept"), ("Vary", "Origin"), ("Server", "x")]);
        let parsed = parse_output(&raw, 25).unwrap();
        let json = serde_json::to_value(&parsed.responses[0].headers).unwrap();

        assert_eq!(json["vary"], serde_json::json!(["Accept", "Origin"]));
        assert_eq!(json["server"], serde_json::json!("x"));
    }

    proptest! {
        #[test]
        fn returns_every_block_and_the_exact_body(
            codes in proptest::collection::vec(100u16..600, 0..=25),
            body in "[a-z<>/ ]{0,40}",
        ) {
            let mut raw = String::new();
            for (i, code) in codes.iter().enumerate() {
                raw.push_str(&block(*code, &[("X-Hop", i.to_string().as_str())]));
            }
            raw.push_str(&body);

            let parsed = parse_output(&raw, 25).unwrap();

            prop_assert_eq!(parsed.responses.len(), codes.len());
            for (i, (response, code)) in parsed.responses.iter().zip(&codes).enumerate() {
                prop_assert_eq!(response.status_code.clone(), code.to_string());
                let hop = i.to_string();
                prop_assert_eq!(response.headers.last_value("x-hop"), Some(hop.as_str()));
            }
            prop_assert_eq!(parsed.body, body);
        }

        #[test]
        fn one_block_past_the_limit_fails(max in 0usize..30) {
            let raw = block(302, &[("Location", "/again")]).repeat(max + 1);
            prop_assert_eq!(parse_output(&raw, max), Err(Error::TooManyRedirects { max }));
        }
    }
}
