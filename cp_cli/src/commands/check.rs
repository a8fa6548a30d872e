//! Check command implementation.

use console::style;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;

use cp_core::{CurlConfig, Finding, UrlKind, UserAgent};
use cp_io::{AuditRequest, Auditor, Curl, GitHubClient};

use crate::display::{format_result_line, print_json, spinner};

pub struct CheckOptions {
    pub kind: UrlKind,
    pub user_agents: Vec<UserAgent>,
    pub referer: Option<String>,
    pub check_content: bool,
    pub strict: bool,
    pub json: bool,
    pub concurrency: usize,
}

impl CheckOptions {
    fn request(&self, url: &str) -> AuditRequest {
        let mut request = AuditRequest::new(url, self.kind);
        if !self.user_agents.is_empty() {
            request.user_agents = self.user_agents.clone();
        }
        request.referer = self.referer.clone();
        request.check_content = self.check_content;
        request.strict = self.strict;
        request
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub url: String,
    pub finding: Option<Finding>,
}

/// Run the check command; returns the number of findings.
pub async fn run(
    config: CurlConfig,
    urls: Vec<String>,
    options: CheckOptions,
) -> Result<usize, cp_core::Error> {
    let github = GitHubClient::new(config.github_api_token.clone());
    let auditor = Auditor::new(Curl::system(config)).with_repositories(Arc::new(github));

    let progress = (!options.json).then(|| {
        println!(
            "{} Checking {} {}...",
            style("==>").cyan().bold(),
            urls.len(),
            if urls.len() == 1 { "URL" } else { "URLs" }
        );
        spinner(format!("probing with {}", auditor.curl().context().executable().display()))
    });

    let results = audit_all(&auditor, &urls, &options).await;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let results = results?;
    let findings = results.iter().filter(|r| r.finding.is_some()).count();

    if options.json {
        print_json(&results);
        return Ok(findings);
    }

    for result in &results {
        println!("{}", format_result_line(&result.url, result.finding.as_ref()));
    }

    if findings == 0 {
        println!(
            "\n{} {} No problems found",
            style("==>").cyan().bold(),
            style("✓").green().bold()
        );
    } else {
        println!(
            "\n{} {} {} {}",
            style("==>").cyan().bold(),
            style("✗").red().bold(),
            findings,
            if findings == 1 { "problem" } else { "problems" }
        );
    }

    Ok(findings)
}

/// Audit every URL, at most `concurrency` at a time, keeping input order.
pub async fn audit_all(
    auditor: &Auditor,
    urls: &[String],
    options: &CheckOptions,
) -> Result<Vec<CheckResult>, cp_core::Error> {
    stream::iter(urls.iter().map(|url| options.request(url)))
        .map(|request| async move {
            let finding = auditor.check_http_content(&request).await?;
            Ok::<_, cp_core::Error>(CheckResult {
                url: request.url,
                finding,
            })
        })
        .buffered(options.concurrency.max(1))
        .try_collect()
        .await
}
