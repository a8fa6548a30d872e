//! Reachability and HTTPS-upgrade checks for a single URL.
//!
//! The check fetches the URL (and, for `http://` URLs, its `https://`
//! twin) in full and compares what came back:
//!
//! 1. The secure twin is tried with each user agent until one gets a
//!    2xx reply; that agent is then the only one used for the original.
//! 2. The original URL is fetched, retrying transport errors (curl exit
//!    52 and 56) up to the configured retry count.
//! 3. A non-2xx reply is a finding, unless a bot-mitigation service
//!    answered or a 404 homepage points at a GitHub repository that exists.
//! 4. With both fetches successful, matching ETag, length or body hash
//!    means the HTTPS URL serves the same thing.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use cp_core::detect::{protected_by_bot_mitigation, strip_protocols};
use cp_core::exit_code::{OPERATION_TIMEDOUT, TRANSIENT_NETWORK_ERRORS};
use cp_core::{Error, Finding, UrlKind, UserAgent};

use crate::curl::{ContentProbe, ContentRequest, Curl, SpecValue};
use crate::github::RepositoryLookup;

static GITHUB_REPOSITORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/(?P<owner>[^/]+)/(?P<repo>[^/]+)/?$").unwrap()
});

/// Body lengths within this percentage of each other are close enough to
/// suggest a manual look.
const SIMILAR_LENGTH_PERCENT: std::ops::RangeInclusive<usize> = 90..=110;

#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub url: String,
    pub kind: UrlKind,
    pub specs: Vec<(String, SpecValue)>,
    /// Tried in order; an empty list means the default agent.
    pub user_agents: Vec<UserAgent>,
    pub referer: Option<String>,
    /// Compare bodies with protocols stripped.
    pub check_content: bool,
    /// Also report bodies of similar length.
    pub strict: bool,
}

impl AuditRequest {
    pub fn new(url: impl Into<String>, kind: UrlKind) -> Self {
        Self {
            url: url.into(),
            kind,
            specs: Vec::new(),
            user_agents: vec![UserAgent::Default],
            referer: None,
            check_content: false,
            strict: false,
        }
    }
}

pub struct Auditor {
    curl: Curl,
    repositories: Option<Arc<dyn RepositoryLookup>>,
}

impl Auditor {
    pub fn new(curl: Curl) -> Self {
        Self {
            curl,
            repositories: None,
        }
    }

    /// Enable the GitHub homepage check; it also needs an API token in the
    /// configuration.
    pub fn with_repositories(mut self, repositories: Arc<dyn RepositoryLookup>) -> Self {
        self.repositories = Some(repositories);
        self
    }

    pub fn curl(&self) -> &Curl {
        &self.curl
    }

    /// Check one URL, returning at most one finding.
    pub async fn check_http_content(&self, request: &AuditRequest) -> Result<Option<Finding>, Error> {
        let url = request.url.as_str();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Ok(None);
        }

        let candidates = if request.user_agents.is_empty() {
            vec![UserAgent::Default]
        } else {
            request.user_agents.clone()
        };
        let mut user_agents = candidates.clone();

        let secure_url = match url.strip_prefix("http://") {
            Some(rest) => format!("https://{}", rest),
            None => url.to_string(),
        };

        let mut secure_details = None;
        let mut hash_needed = false;
        if secure_url != url {
            for user_agent in &candidates {
                let details = match self.fetch(request, &secure_url, user_agent, true).await {
                    Ok(details) => details,
                    Err(Error::Timeout { message }) => {
                        warn!("{} timed out: {}", secure_url, message);
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let reachable = details.is_ok();
                secure_details = Some(details);
                if reachable {
                    hash_needed = true;
                    user_agents = vec![user_agent.clone()];
                    break;
                }
            }
        }

        let details = self.fetch_with_retries(request, &user_agents, hash_needed).await?;

        let Some(status) = details.status_code.clone() else {
            return Ok(Some(Finding::NotReachable {
                kind: request.kind,
                url: request.url.clone(),
            }));
        };

        if !details.is_ok() {
            if protected_by_bot_mitigation(&details.responses) {
                debug!("{} is behind bot mitigation, not reporting {}", url, status);
                return Ok(None);
            }
            if let Some(finding) = self.unreachable_finding(request, &status).await {
                return Ok(Some(finding));
            }
        }

        if url.starts_with("https://")
            && self.curl.config().no_insecure_redirect
            && details
                .final_url
                .as_deref()
                .is_some_and(|f| !f.starts_with("https://"))
        {
            return Ok(Some(Finding::RedirectsToHttp {
                kind: request.kind,
                url: request.url.clone(),
            }));
        }

        let Some(secure_details) = secure_details else {
            return Ok(None);
        };
        Ok(https_upgrade_finding(request, &details, &secure_details))
    }

    async fn fetch(
        &self,
        request: &AuditRequest,
        url: &str,
        user_agent: &UserAgent,
        hash_needed: bool,
    ) -> Result<ContentProbe, Error> {
        let content = ContentRequest {
            url: url.to_string(),
            specs: request.specs.clone(),
            hash_needed,
            user_agent: user_agent.clone(),
            referer: request.referer.clone(),
        };
        self.curl.content_headers_and_checksum(&content).await
    }

    /// Fetch the original URL, sharing one retry budget across agents.
    async fn fetch_with_retries(
        &self,
        request: &AuditRequest,
        user_agents: &[UserAgent],
        hash_needed: bool,
    ) -> Result<ContentProbe, Error> {
        let max_attempts = self.curl.config().retries;
        let mut attempts = 0;
        let mut details = ContentProbe::unreachable(&request.url, None);

        for user_agent in user_agents {
            loop {
                details = match self.fetch(request, &request.url, user_agent, hash_needed).await {
                    Ok(details) => details,
                    Err(Error::Timeout { message }) => {
                        warn!("{} timed out: {}", request.url, message);
                        ContentProbe::unreachable(&request.url, Some(OPERATION_TIMEDOUT))
                    }
                    Err(e) => return Err(e),
                };

                let transient = details
                    .exit_status
                    .is_some_and(|code| TRANSIENT_NETWORK_ERRORS.contains(&code));
                if !transient {
                    break;
                }
                attempts += 1;
                if attempts >= max_attempts {
                    break;
                }
                debug!(attempts, "transient network error on {}, retrying", request.url);
            }

            if details.is_ok() {
                break;
            }
        }

        Ok(details)
    }

    /// The finding for a non-2xx reply, or `None` when a 404 homepage is
    /// forgiven because its GitHub repository exists.
    async fn unreachable_finding(&self, request: &AuditRequest, status: &str) -> Option<Finding> {
        let not_reachable = Finding::NotReachableStatus {
            kind: request.kind,
            url: request.url.clone(),
            status: status.to_string(),
        };

        if request.kind != UrlKind::Homepage || status != "404" {
            return Some(not_reachable);
        }
        let Some(repositories) = &self.repositories else {
            return Some(not_reachable);
        };
        if self.curl.config().github_api_token.is_none() {
            return Some(not_reachable);
        }
        let Some(caps) = GITHUB_REPOSITORY.captures(&request.url) else {
            return Some(not_reachable);
        };

        match repositories.repository_exists(&caps["owner"], &caps["repo"]).await {
            Ok(true) => None,
            Ok(false) => Some(Finding::HomepageNotFound {
                url: request.url.clone(),
            }),
            Err(e) => {
                warn!("could not look up {}: {}", request.url, e);
                Some(not_reachable)
            }
        }
    }
}

/// Compare the fetch of an `http://` URL with its `https://` twin.
pub fn https_upgrade_finding(
    request: &AuditRequest,
    details: &ContentProbe,
    secure_details: &ContentProbe,
) -> Option<Finding> {
    if !details.is_ok() || !secure_details.is_ok() {
        return None;
    }

    let etag_match = details.etag.is_some() && details.etag == secure_details.etag;
    let content_length_match =
        details.content_length.is_some() && details.content_length == secure_details.content_length;
    let file_match = details.body_hash.is_some() && details.body_hash == secure_details.body_hash;

    let https_available = request.url.starts_with("http://")
        && secure_details
            .final_url
            .as_deref()
            .is_some_and(|f| f.starts_with("https://"));

    let should_use_https = Finding::ShouldUseHttps {
        kind: request.kind,
        url: request.url.clone(),
    };
    if (etag_match || content_length_match || file_match) && https_available {
        return Some(should_use_https);
    }

    if !request.check_content {
        return None;
    }

    let (Some(http_body), Some(https_body)) = (&details.body, &secure_details.body) else {
        return None;
    };
    let http_content = strip_protocols(http_body);
    let https_content = strip_protocols(https_body);

    if http_content == https_content && https_available {
        return Some(should_use_https);
    }

    if !request.strict {
        return None;
    }

    let http_length = http_content.chars().count();
    let https_length = https_content.chars().count();
    let may_use_https = Finding::MayUseHttps {
        kind: request.kind,
        url: request.url.clone(),
    };
    if http_length == https_length {
        return Some(may_use_https);
    }
    if http_length == 0 {
        return None;
    }
    let ratio = https_length * 100 / http_length;
    SIMILAR_LENGTH_PERCENT
        .contains(&ratio)
        .then_some(may_use_https)
}
