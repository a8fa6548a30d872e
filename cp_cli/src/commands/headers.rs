//! Headers command implementation.

use console::style;

use cp_core::{CurlConfig, CurlOptions, UserAgent};
use cp_io::{Curl, ProbeMethod};

use crate::display::{print_json, print_responses};

/// Build the curl arguments for a header probe of `url`.
pub fn probe_args(url: String, data: Option<String>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(data) = data {
        args.push("--data".to_string());
        args.push(data);
    }
    args.push(url);
    args
}

/// Run the headers command.
pub async fn run(
    config: CurlConfig,
    url: String,
    wanted: Vec<String>,
    post: bool,
    data: Option<String>,
    user_agent: UserAgent,
    json: bool,
) -> Result<(), cp_core::Error> {
    let curl = Curl::system(config);
    let method = if post { ProbeMethod::Post } else { ProbeMethod::Head };
    let wanted: Vec<&str> = wanted.iter().map(String::as_str).collect();
    let options = CurlOptions::captured().with_user_agent(user_agent);

    let parsed = curl
        .headers(&probe_args(url.clone(), data), &wanted, method, &options)
        .await?;

    if json {
        print_json(&parsed.responses);
        return Ok(());
    }

    if parsed.responses.is_empty() {
        println!("{} No response headers from {}", style("==>").cyan().bold(), url);
        return Ok(());
    }

    print_responses(&parsed.responses);
    Ok(())
}
