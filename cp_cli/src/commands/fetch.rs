//! Fetch command implementation.

use console::style;
use std::path::PathBuf;

use cp_core::{CurlConfig, CurlOptions};
use cp_io::{Curl, DownloadOutcome};

use crate::display::format_bytes;

/// Run the fetch command.
pub async fn run(
    config: CurlConfig,
    url: String,
    output: PathBuf,
    resume: bool,
) -> Result<(), cp_core::Error> {
    let curl = Curl::system(config);

    println!(
        "{} Downloading {}...",
        style("==>").cyan().bold(),
        style(&url).bold()
    );

    let outcome = curl
        .download(&[url], &output, resume, &CurlOptions::default())
        .await?;

    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    match outcome {
        DownloadOutcome::AlreadyComplete => println!(
            "{} {} Already downloaded: {} ({})",
            style("==>").cyan().bold(),
            style("✓").green().bold(),
            output.display(),
            format_bytes(size)
        ),
        DownloadOutcome::Downloaded(_) => println!(
            "{} {} Saved {} ({})",
            style("==>").cyan().bold(),
            style("✓").green().bold(),
            output.display(),
            format_bytes(size)
        ),
    }

    Ok(())
}
