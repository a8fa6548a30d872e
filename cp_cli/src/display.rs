//! Display utilities for spinners and formatting helpers.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use cp_core::{Finding, HeaderValue, ParsedResponse};

/// Create a steady spinner for long-running probes.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("    {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Format bytes into a human-readable string (e.g., "1.5 GB").
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// A `Content-Length` value for humans; unparseable values pass through.
pub fn format_content_length(value: &str) -> String {
    match value.trim().parse::<u64>() {
        Ok(bytes) => format_bytes(bytes),
        Err(_) => value.to_string(),
    }
}

/// One line per finding, or a check mark for a clean URL.
pub fn format_result_line(url: &str, finding: Option<&Finding>) -> String {
    match finding {
        Some(finding) => format!("    {} {}", style("✗").red().bold(), finding),
        None => format!("    {} {}", style("✓").green().bold(), url),
    }
}

/// Status line and headers of one response, in the order curl would print
/// them minus the original casing.
pub fn format_response_lines(response: &ParsedResponse) -> Vec<String> {
    let mut lines = Vec::with_capacity(response.headers.len() + 1);
    let status = match &response.status_text {
        Some(text) => format!("{} {}", response.status_code, text),
        None => response.status_code.clone(),
    };
    lines.push(status);

    for (name, value) in response.headers.iter() {
        match value {
            HeaderValue::Single(v) => lines.push(format!("{}: {}", name, v)),
            HeaderValue::Multiple(values) => {
                for v in values {
                    lines.push(format!("{}: {}", name, v));
                }
            }
        }
    }
    lines
}

/// Print a value as pretty JSON, exiting on serialization failure.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!(
                "{} Failed to serialize JSON: {}",
                style("error:").red().bold(),
                e
            );
            std::process::exit(1);
        }
    }
}

pub fn print_responses(responses: &[ParsedResponse]) {
    for (i, response) in responses.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let mut lines = format_response_lines(response).into_iter();
        if let Some(status) = lines.next() {
            println!("{} {}", style("==>").cyan().bold(), style(status).bold());
        }
        for line in lines {
            println!("    {}", line);
        }
    }
}
