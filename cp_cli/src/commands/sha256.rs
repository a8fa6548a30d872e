//! Sha256 command implementation.

use console::style;

use cp_core::{CurlConfig, UserAgent};
use cp_io::{ContentRequest, Curl};

use crate::display::{format_content_length, spinner};

/// Run the sha256 command.
pub async fn run(config: CurlConfig, url: String, user_agent: UserAgent) -> Result<(), cp_core::Error> {
    let curl = Curl::system(config);
    let request = ContentRequest {
        hash_needed: true,
        user_agent,
        ..ContentRequest::new(url.clone())
    };

    let pb = spinner(format!("fetching {}", url));
    let probe = curl.content_headers_and_checksum(&request).await;
    pb.finish_and_clear();
    let probe = probe?;

    let Some(hash) = probe.body_hash.as_deref() else {
        let status = probe.status_code.as_deref().unwrap_or("none");
        let exit = probe
            .exit_status
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(cp_core::Error::NetworkFailure {
            message: format!("could not fetch {} (HTTP status {}, curl exit {})", url, status, exit),
        });
    };

    println!("{} {}", style("==>").cyan().bold(), style(&url).bold());
    if let Some(final_url) = probe.final_url.as_deref().filter(|f| *f != url) {
        println!("    final URL:      {}", final_url);
    }
    if let Some(status) = probe.status_code.as_deref() {
        println!("    status:         {}", status);
    }
    if let Some(etag) = probe.etag.as_deref() {
        println!("    etag:           {}", etag);
    }
    if let Some(length) = probe.content_length.as_deref() {
        println!("    content length: {}", format_content_length(length));
    }
    println!("    sha256:         {}", style(hash).green());

    Ok(())
}
