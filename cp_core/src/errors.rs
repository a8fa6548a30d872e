use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidUserAgent {
        value: String,
    },
    Timeout {
        message: String,
    },
    ExecutionFailed {
        command: String,
        exit_status: Option<i32>,
        stderr: String,
    },
    CurlUnavailable {
        message: String,
    },
    TooManyRedirects {
        max: usize,
    },
    InvalidUrl {
        url: String,
        message: String,
    },
    FileSystem {
        path: PathBuf,
        message: String,
    },
    NetworkFailure {
        message: String,
    },
}

impl Error {
    /// Errors that a caller may treat as "this attempt failed" rather than
    /// a broken invocation.
    pub fn is_attempt_failure(&self) -> bool {
        matches!(self, Error::ExecutionFailed { .. } | Error::Timeout { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidUserAgent { value } => {
                write!(
                    f,
                    "unknown user agent '{}'\n  hint: use one of 'default', 'browser' or 'fake', or pass a literal string",
                    value
                )
            }
            Error::Timeout { message } => {
                if message.is_empty() {
                    write!(f, "curl timed out")
                } else {
                    write!(f, "curl timed out: {}", message)
                }
            }
            Error::ExecutionFailed {
                command,
                exit_status,
                stderr,
            } => {
                write!(f, "failure while executing `{}`", command)?;
                match exit_status {
                    Some(code) => write!(f, " (exit status {})", code)?,
                    None => write!(f, " (terminated by signal)")?,
                }
                let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
                if let Some(line) = last {
                    write!(f, "\n  {}", line.trim())?;
                }
                Ok(())
            }
            Error::CurlUnavailable { message } => {
                write!(
                    f,
                    "unable to run curl: {}\n  hint: install curl or point CPROBE_CURL_PATH at a curl binary",
                    message
                )
            }
            Error::TooManyRedirects { max } => {
                write!(
                    f,
                    "too many redirects (max = {})\n  hint: the server may be stuck in a redirect loop",
                    max
                )
            }
            Error::InvalidUrl { url, message } => {
                write!(f, "invalid URL '{}': {}", url, message)
            }
            Error::FileSystem { path, message } => {
                write!(f, "{}: {}", path.display(), message)
            }
            Error::NetworkFailure { message } => {
                write!(
                    f,
                    "network error: {}\n  hint: check your internet connection and try again",
                    message
                )
            }
        }
    }
}

impl std::error::Error for Error {}
