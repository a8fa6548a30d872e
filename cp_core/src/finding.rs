//! Outcomes of a reachability/HTTPS audit.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// What a URL is used for; only affects wording and the homepage 404 rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Homepage,
    Stable,
    Head,
    Livecheck,
}

impl UrlKind {
    pub fn label(&self) -> &'static str {
        match self {
            UrlKind::Homepage => "homepage URL",
            UrlKind::Stable => "stable URL",
            UrlKind::Head => "head URL",
            UrlKind::Livecheck => "livecheck URL",
        }
    }
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UrlKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "homepage" => Ok(UrlKind::Homepage),
            "stable" | "url" => Ok(UrlKind::Stable),
            "head" => Ok(UrlKind::Head),
            "livecheck" => Ok(UrlKind::Livecheck),
            other => Err(format!(
                "unknown URL kind '{}' (expected homepage, stable, head or livecheck)",
                other
            )),
        }
    }
}

/// A single audit finding. Rendering it gives the diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    NotReachable {
        kind: UrlKind,
        url: String,
    },
    NotReachableStatus {
        kind: UrlKind,
        url: String,
        status: String,
    },
    /// The homepage 404s and the repository it points at does not exist.
    HomepageNotFound {
        url: String,
    },
    RedirectsToHttp {
        kind: UrlKind,
        url: String,
    },
    ShouldUseHttps {
        kind: UrlKind,
        url: String,
    },
    MayUseHttps {
        kind: UrlKind,
        url: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::NotReachable { kind, url } => {
                write!(f, "The {} {} is not reachable", kind, url)
            }
            Finding::NotReachableStatus { kind, url, status } => {
                write!(
                    f,
                    "The {} {} is not reachable (HTTP status code {})",
                    kind, url, status
                )
            }
            Finding::HomepageNotFound { .. } => write!(f, "Unable to find homepage"),
            Finding::RedirectsToHttp { kind, url } => {
                write!(f, "The {} {} redirects back to HTTP", kind, url)
            }
            Finding::ShouldUseHttps { kind, url } => {
                write!(f, "The {} {} should use HTTPS rather than HTTP", kind, url)
            }
            Finding::MayUseHttps { kind, url } => {
                write!(
                    f,
                    "The {} {} may be able to use HTTPS rather than HTTP. Please verify it in a browser.",
                    kind, url
                )
            }
        }
    }
}
