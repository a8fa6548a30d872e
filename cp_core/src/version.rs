//! Curl version detection and comparison.
//!
//! `curl --version` prints a banner like:
//!
//! ```text
//! curl 8.7.1 (x86_64-apple-darwin23.0) libcurl/8.7.1 (SecureTransport) LibreSSL/3.3.6 zlib/1.2.12 nghttp2/1.61.0
//! Release-Date: 2024-03-27
//! Protocols: dict file ftp ftps gopher gophers http https imap imaps ...
//! Features: alt-svc AsynchDNS GSS-API HSTS HTTP2 HTTPS-proxy IPv6 Kerberos ...
//! ```
//!
//! Comparison rules:
//! - Numeric components compared numerically: `7.9.0 < 7.10.0`
//! - Missing components count as smaller: `8.7 < 8.7.1`
//! - Prerelease comes before release: `8.10.0-DEV < 8.10.0`

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static BANNER_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^curl (\d+(?:\.\d+)+(?:-[0-9A-Za-z.]+)?)").unwrap());

/// A dotted version number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    components: Vec<VersionComponent>,
    prerelease: Vec<VersionComponent>,
    original: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionComponent {
    Numeric(u64),
    Alpha(String),
}

impl VersionComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (VersionComponent::Numeric(a), VersionComponent::Numeric(b)) => a.cmp(b),
            (VersionComponent::Alpha(a), VersionComponent::Alpha(b)) => a.cmp(b),
            (VersionComponent::Numeric(_), VersionComponent::Alpha(_)) => Ordering::Less,
            (VersionComponent::Alpha(_), VersionComponent::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl Version {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let (main_part, prerelease) = match s.find('-') {
            Some(idx) => (&s[..idx], parse_components(&s[idx + 1..])),
            None => (s, vec![]),
        };

        Version {
            components: parse_components(main_part),
            prerelease,
            original: s.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// True when `self` lies in the half-open range `[low, high)`.
    pub fn is_within(&self, low: &Version, high: &Version) -> bool {
        self >= low && self < high
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let main = compare_components(&self.components, &other.components);
        if main != Ordering::Equal {
            return main;
        }

        // "8.10.0-DEV" < "8.10.0"
        match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_components(&self.prerelease, &other.prerelease),
        }
    }
}

fn compare_components(a: &[VersionComponent], b: &[VersionComponent]) -> Ordering {
    let max_len = a.len().max(b.len());
    for i in 0..max_len {
        match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => {
                let cmp = x.cmp(y);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => break,
        }
    }
    Ordering::Equal
}

fn parse_components(s: &str) -> Vec<VersionComponent> {
    let mut components = Vec::new();
    let mut current = String::new();
    let mut in_numeric = false;

    for c in s.chars() {
        if c == '.' || c == '-' || c == '+' {
            if !current.is_empty() {
                components.push(parse_component(&current));
                current.clear();
            }
            in_numeric = false;
        } else if c.is_ascii_digit() {
            if !in_numeric && !current.is_empty() {
                components.push(parse_component(&current));
                current.clear();
            }
            in_numeric = true;
            current.push(c);
        } else if c.is_alphanumeric() {
            if in_numeric && !current.is_empty() {
                components.push(parse_component(&current));
                current.clear();
            }
            in_numeric = false;
            current.push(c);
        }
    }

    if !current.is_empty() {
        components.push(parse_component(&current));
    }

    components
}

fn parse_component(s: &str) -> VersionComponent {
    match s.parse::<u64>() {
        Ok(n) => VersionComponent::Numeric(n),
        Err(_) => VersionComponent::Alpha(s.to_lowercase()),
    }
}

/// What a `curl --version` banner tells us about the binary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurlVersionInfo {
    pub version: Option<Version>,
    pub features: Vec<String>,
}

impl CurlVersionInfo {
    pub fn parse(banner: &str) -> Self {
        let version = BANNER_VERSION
            .captures(banner)
            .and_then(|c| c.get(1))
            .map(|m| Version::parse(m.as_str()));

        let features = banner
            .lines()
            .find_map(|line| line.strip_prefix("Features:"))
            .map(|rest| rest.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        CurlVersionInfo { version, features }
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(name))
    }

    pub fn supports_http2(&self) -> bool {
        self.has_feature("HTTP2")
    }
}
