use std::path::Path;

use tracing::{debug, warn};

use cp_core::{CurlOptions, Error, Headers};

use super::{Curl, ProbeMethod};
use crate::runner::ExecResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The existing file already has the advertised size; curl was not run.
    AlreadyComplete,
    Downloaded(ExecResult),
}

impl Curl {
    /// Download the URL in `args` to `destination`.
    ///
    /// With `try_partial`, an existing file is resumed when the server
    /// accepts ranges. A file of exactly the reported length is assumed
    /// complete; only its size is compared.
    pub async fn download(
        &self,
        args: &[String],
        destination: &Path,
        try_partial: bool,
        options: &CurlOptions,
    ) -> Result<DownloadOutcome, Error> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::FileSystem {
                    path: parent.to_path_buf(),
                    message: format!("failed to create directory: {}", e),
                })?;
        }

        let mut extra: Vec<String> = vec!["--location".into()];
        extra.extend(args.iter().cloned());

        if try_partial && let Ok(metadata) = tokio::fs::metadata(destination).await {
            let headers = self.last_response_headers(&extra, options).await?;
            let ranges_supported = headers
                .last_value("accept-ranges")
                .is_some_and(|v| v.trim() != "none");
            let content_length = headers
                .last_value("content-length")
                .and_then(|v| v.trim().parse::<u64>().ok());

            if ranges_supported {
                if content_length == Some(metadata.len()) {
                    debug!(path = %destination.display(), length = metadata.len(), "download already complete");
                    return Ok(DownloadOutcome::AlreadyComplete);
                }
                debug!(path = %destination.display(), have = metadata.len(), ?content_length, "resuming download");
                extra.splice(0..0, ["--continue-at".to_string(), "-".to_string()]);
            }
        }

        let mut full = vec![
            "--remote-time".to_string(),
            "--output".to_string(),
            destination.to_string_lossy().into_owned(),
        ];
        full.extend(extra);

        let result = self.run(&full, options, None).await?;
        Ok(DownloadOutcome::Downloaded(result))
    }

    /// Headers of the final response; empty when the probe itself failed.
    async fn last_response_headers(
        &self,
        args: &[String],
        options: &CurlOptions,
    ) -> Result<Headers, Error> {
        match self
            .headers(args, &["accept-ranges"], ProbeMethod::Head, options)
            .await
        {
            Ok(parsed) => Ok(parsed.last().map(|r| r.headers.clone()).unwrap_or_default()),
            Err(e) if e.is_attempt_failure() => {
                warn!("header probe before resuming failed: {}", e);
                Ok(Headers::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CannedCurl, TestContext, http_block};

    const URL: &str = "https://example.com/pkg-1.0.tar.gz";

    fn url_args() -> Vec<String> {
        vec![URL.to_string()]
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[tokio::test]
    async fn fresh_download_writes_file() {
        let ctx = TestContext::new().await;
        ctx.runner.on(URL, CannedCurl::ok(String::new()).with_body("tarball"));
        let dest = ctx.path("downloads/nested/pkg.tar.gz");

        let outcome = ctx
            .curl()
            .download(&url_args(), &dest, true, &CurlOptions::default())
            .await
            .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Downloaded(ref r) if r.success()));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "tarball");

        let calls = ctx.runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].iter().any(|a| a == "--remote-time"));
        assert!(calls[0].iter().any(|a| a == "--location"));
        assert!(!calls[0].iter().any(|a| a == "--continue-at"));
    }

    #[tokio::test]
    async fn complete_file_skips_download() {
        let ctx = TestContext::new().await;
        let dest = ctx.path("pkg.tar.gz");
        std::fs::write(&dest, "0123456789").unwrap();
        ctx.runner.on(
            URL,
            CannedCurl::ok(http_block(200, &[("Accept-Ranges", "bytes"), ("Content-Length", "10")])),
        );

        let outcome = ctx
            .curl()
            .download(&url_args(), &dest, true, &CurlOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::AlreadyComplete);
        let calls = ctx.runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].iter().any(|a| a == "--head"));
    }

    #[tokio::test]
    async fn partial_file_is_resumed() {
        let ctx = TestContext::new().await;
        let dest = ctx.path("pkg.tar.gz");
        std::fs::write(&dest, "01234").unwrap();
        ctx.runner
            .on(
                URL,
                CannedCurl::ok(http_block(200, &[("Accept-Ranges", "bytes"), ("Content-Length", "10")])),
            )
            .on(URL, CannedCurl::ok(String::new()).with_body("0123456789"));

        ctx.curl()
            .download(&url_args(), &dest, true, &CurlOptions::default())
            .await
            .unwrap();

        let calls = ctx.runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(has_pair(&calls[1], "--continue-at", "-"));
        assert!(has_pair(&calls[1], "--output", &dest.to_string_lossy()));
    }

    #[tokio::test]
    async fn partial_file_is_resumed_without_reported_length() {
        let ctx = TestContext::new().await;
        let dest = ctx.path("pkg.tar.gz");
        std::fs::write(&dest, "01234").unwrap();
        ctx.runner
            .on(URL, CannedCurl::ok(http_block(200, &[("Accept-Ranges", "bytes")])))
            .on(URL, CannedCurl::ok(String::new()).with_body("0123456789"));

        let outcome = ctx
            .curl()
            .download(&url_args(), &dest, true, &CurlOptions::default())
            .await
            .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Downloaded(_)));
        let calls = ctx.runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(has_pair(&calls[1], "--continue-at", "-"));
    }

    #[tokio::test]
    async fn ranges_none_downloads_from_scratch() {
        let ctx = TestContext::new().await;
        let dest = ctx.path("pkg.tar.gz");
        std::fs::write(&dest, "01234").unwrap();
        ctx.runner
            .on(
                URL,
                CannedCurl::ok(http_block(200, &[("Accept-Ranges", "none"), ("Content-Length", "10")])),
            )
            .on(URL, CannedCurl::ok(String::new()).with_body("0123456789"));

        ctx.curl()
            .download(&url_args(), &dest, true, &CurlOptions::default())
            .await
            .unwrap();

        let calls = ctx.runner.calls();
        assert!(!calls[1].iter().any(|a| a == "--continue-at"));
    }

    #[tokio::test]
    async fn without_try_partial_no_probe_is_made() {
        let ctx = TestContext::new().await;
        let dest = ctx.path("pkg.tar.gz");
        std::fs::write(&dest, "old").unwrap();
        ctx.runner.on(URL, CannedCurl::ok(String::new()).with_body("new"));

        ctx.curl()
            .download(&url_args(), &dest, false, &CurlOptions::default())
            .await
            .unwrap();

        assert_eq!(ctx.runner.calls().len(), 1);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    }

    #[tokio::test]
    async fn failed_probe_still_downloads() {
        let ctx = TestContext::new().await;
        let dest = ctx.path("pkg.tar.gz");
        std::fs::write(&dest, "01234").unwrap();
        ctx.runner
            .on(URL, CannedCurl::failure(7, "curl: (7) Failed to connect"))
            .on(URL, CannedCurl::ok(String::new()).with_body("0123456789"));

        let outcome = ctx
            .curl()
            .download(&url_args(), &dest, true, &CurlOptions::default())
            .await
            .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Downloaded(_)));
        assert!(!ctx.runner.calls()[1].iter().any(|a| a == "--continue-at"));
    }

    #[tokio::test]
    async fn failed_download_is_an_error() {
        let ctx = TestContext::new().await;
        ctx.runner.on(URL, CannedCurl::failure(22, "curl: (22) The requested URL returned error: 404"));

        let err = ctx
            .curl()
            .download(&url_args(), &ctx.path("pkg.tar.gz"), false, &CurlOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ExecutionFailed { exit_status: Some(22), .. }));
    }
}
