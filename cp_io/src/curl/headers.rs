use tracing::debug;

use cp_core::exit_code::SOFT_HEADER_ERRORS;
use cp_core::{CurlOptions, Error, ParsedOutput, Version, parse_output};

use super::Curl;

/// How response headers are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMethod {
    /// `HEAD`, falling back to a `GET` whose body is discarded.
    #[default]
    Head,
    /// `POST` with the headers dumped to stdout; never retried.
    Post,
}

/// curl releases whose GET fallback needs HTTP/1.1 to get a usable reply.
const GET_HTTP1_RANGE: (&str, &str) = ("8.7", "8.10");

impl Curl {
    /// Fetch and parse the response headers for the URL in `args`.
    ///
    /// A `HEAD` that gets an error reply, or whose replies lack every name
    /// in `wanted_headers`, is retried once as a `GET`. Exit codes other
    /// than success, 8, 22 and 56 are errors.
    pub async fn headers(
        &self,
        args: &[String],
        wanted_headers: &[&str],
        method: ProbeMethod,
        options: &CurlOptions,
    ) -> Result<ParsedOutput, Error> {
        let mut base: Vec<String> = vec!["--fail".into(), "--location".into(), "--silent".into()];
        let mut attempts: Vec<Vec<String>> = vec![Vec::new()];

        match method {
            ProbeMethod::Post => base.extend(["--dump-header".into(), "-".into()]),
            ProbeMethod::Head => {
                base.push("--head".into());
                let mut get = vec!["--request".to_string(), "GET".to_string()];
                if self.get_needs_http1().await {
                    get.push("--http1.1".into());
                }
                attempts.push(get);
            }
        }

        let max_responses = self.config().max_responses;
        for (i, request_args) in attempts.iter().enumerate() {
            let mut extra = base.clone();
            extra.extend(request_args.iter().cloned());
            extra.extend(args.iter().cloned());

            let result = self.output(&extra, options, None).await?;
            let soft_failure = SOFT_HEADER_ERRORS.iter().any(|code| result.exited_with(*code));
            if !result.success() && !soft_failure {
                return Err(self.execution_error(&extra, result));
            }

            let parsed = parse_output(&result.stdout, max_responses)?;
            if i + 1 == attempts.len() {
                return Ok(parsed);
            }

            let missing_wanted = !wanted_headers.is_empty()
                && !parsed
                    .responses
                    .iter()
                    .any(|r| wanted_headers.iter().any(|name| r.headers.contains(name)));
            let client_error = parsed
                .last()
                .and_then(|r| r.status())
                .is_some_and(|code| (400..500).contains(&code));

            if !missing_wanted && !client_error {
                return Ok(parsed);
            }
            debug!(
                exit_status = result.exit_status,
                missing_wanted, client_error, "HEAD was not useful, retrying as GET"
            );
        }

        // The last attempt always returns above.
        Ok(ParsedOutput::default())
    }

    async fn get_needs_http1(&self) -> bool {
        let (low, high) = GET_HTTP1_RANGE;
        self.context()
            .version()
            .await
            .is_some_and(|v| v.is_within(&Version::parse(low), &Version::parse(high)))
    }
}
