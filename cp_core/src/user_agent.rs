use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::Error;

pub const USER_AGENT_DEFAULT: &str = concat!("cprobe/", env!("CARGO_PKG_VERSION"), " (curl)");

pub const USER_AGENT_BROWSER: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";

/// The `User-Agent` sent with a request.
///
/// Presets are selected by name (`default`, `browser`, `fake`); anything else
/// must be supplied explicitly as [`UserAgent::Custom`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAgent {
    #[default]
    Default,
    Browser,
    Custom(String),
}

impl UserAgent {
    pub fn custom(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::InvalidUserAgent { value });
        }
        Ok(UserAgent::Custom(value))
    }

    pub fn header_value(&self) -> &str {
        match self {
            UserAgent::Default => USER_AGENT_DEFAULT,
            UserAgent::Browser => USER_AGENT_BROWSER,
            UserAgent::Custom(value) => value,
        }
    }
}

impl FromStr for UserAgent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(UserAgent::Default),
            "browser" | "fake" => Ok(UserAgent::Browser),
            _ => Err(Error::InvalidUserAgent {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserAgent::Default => write!(f, "default"),
            UserAgent::Browser => write!(f, "browser"),
            UserAgent::Custom(value) => write!(f, "{}", value),
        }
    }
}
