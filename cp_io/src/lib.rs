pub mod audit;
pub mod context;
pub mod curl;
pub mod github;
pub mod runner;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use audit::{AuditRequest, Auditor, https_upgrade_finding};
pub use context::CurlContext;
pub use curl::{
    ContentProbe, ContentRequest, Curl, DownloadOutcome, ProbeMethod, SpecValue, spec_args,
};
pub use github::{GitHubClient, RepositoryLookup};
pub use runner::{CurlRunner, ExecResult, SystemCurlRunner, render_command};
