//! cprobe CLI - Probe HTTP URLs through curl.

use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cp_core::{CurlConfig, UrlKind, UserAgent};

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "cprobe")]
#[command(about = "cprobe - Probe HTTP URLs with curl and audit them for HTTPS")]
#[command(version)]
struct Cli {
    /// curl binary to run (default: curl on PATH)
    #[arg(long, global = true, env = "CPROBE_CURL_PATH")]
    curl: Option<PathBuf>,

    /// Retries passed to curl and used for transient network errors
    #[arg(long, global = true)]
    retries: Option<u32>,

    /// Show debug logs and curl's progress meter
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Silence curl's progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Report https URLs that redirect to http
    #[arg(long, global = true)]
    no_insecure_redirect: bool,

    /// GitHub API token used to check repositories behind 404 homepages
    #[arg(long, global = true, env = "CPROBE_GITHUB_API_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that URLs are reachable and whether http URLs could use https
    Check {
        /// URLs to check
        #[arg(required = true)]
        urls: Vec<String>,

        /// What the URLs are used for (homepage, stable, head, livecheck)
        #[arg(long, default_value = "stable")]
        kind: UrlKind,

        /// User agent preset to try: default or browser (repeatable)
        #[arg(long = "user-agent")]
        user_agents: Vec<UserAgent>,

        /// Referer header to send
        #[arg(long)]
        referer: Option<String>,

        /// Compare page content between http and https
        #[arg(long)]
        check_content: bool,

        /// Also flag pages whose http and https content have similar length
        #[arg(long)]
        strict: bool,

        /// Output findings as JSON
        #[arg(long)]
        json: bool,

        /// Number of URLs checked at once
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Show response headers for a URL
    Headers {
        /// URL to probe
        url: String,

        /// Header the probe should find; retries with GET otherwise (repeatable)
        #[arg(long = "wanted")]
        wanted: Vec<String>,

        /// Send a POST instead of HEAD
        #[arg(long)]
        post: bool,

        /// Request body for --post
        #[arg(long, requires = "post")]
        data: Option<String>,

        /// User agent preset: default or browser
        #[arg(long, default_value = "default")]
        user_agent: UserAgent,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a URL to a file
    Fetch {
        /// URL to download
        url: String,

        /// Destination file
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Resume a partial download when the server allows it
        #[arg(long = "continue", short = 'C')]
        resume: bool,
    },

    /// Fetch a URL in full and print its SHA-256
    Sha256 {
        /// URL to fetch
        url: String,

        /// User agent preset: default or browser
        #[arg(long, default_value = "default")]
        user_agent: UserAgent,
    },

    /// Parse raw curl output (headers plus body) and print it as JSON
    Parse {
        /// File to read (default: stdin)
        file: Option<PathBuf>,
    },

    /// Show the curl binary in use and its capabilities
    CurlInfo,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment configuration with command-line flags applied on top.
fn build_config(cli: &Cli) -> CurlConfig {
    let mut config = CurlConfig::from_env();
    if let Some(curl) = &cli.curl {
        config.curl_path = Some(curl.clone());
    }
    if let Some(retries) = cli.retries {
        config.retries = retries;
    }
    if let Some(token) = &cli.github_token {
        config.github_api_token = Some(token.clone());
    }
    config.verbose |= cli.verbose;
    config.quiet |= cli.quiet;
    config.no_insecure_redirect |= cli.no_insecure_redirect;
    config
}

/// Run the selected command, returning the process exit status.
async fn run(cli: Cli) -> Result<i32, cp_core::Error> {
    let config = build_config(&cli);

    match cli.command {
        Commands::Check {
            urls,
            kind,
            user_agents,
            referer,
            check_content,
            strict,
            json,
            concurrency,
        } => {
            let options = commands::check::CheckOptions {
                kind,
                user_agents,
                referer,
                check_content,
                strict,
                json,
                concurrency,
            };
            let findings = commands::check::run(config, urls, options).await?;
            Ok(if findings > 0 { 1 } else { 0 })
        }

        Commands::Headers {
            url,
            wanted,
            post,
            data,
            user_agent,
            json,
        } => {
            commands::headers::run(config, url, wanted, post, data, user_agent, json).await?;
            Ok(0)
        }

        Commands::Fetch {
            url,
            output,
            resume,
        } => {
            commands::fetch::run(config, url, output, resume).await?;
            Ok(0)
        }

        Commands::Sha256 { url, user_agent } => {
            commands::sha256::run(config, url, user_agent).await?;
            Ok(0)
        }

        Commands::Parse { file } => {
            commands::parse::run(&config, file.as_deref())?;
            Ok(0)
        }

        Commands::CurlInfo => {
            commands::curl_info::run(config).await;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_flags() {
        let cli = Cli::try_parse_from([
            "cprobe",
            "check",
            "--kind",
            "homepage",
            "--user-agent",
            "browser",
            "--user-agent",
            "default",
            "--strict",
            "http://example.com",
            "http://example.org",
        ])
        .unwrap();

        match cli.command {
            Commands::Check {
                urls,
                kind,
                user_agents,
                strict,
                ..
            } => {
                assert_eq!(urls.len(), 2);
                assert_eq!(kind, UrlKind::Homepage);
                assert_eq!(user_agents, vec![UserAgent::Browser, UserAgent::Default]);
                assert!(strict);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn data_requires_post() {
        let result = Cli::try_parse_from(["cprobe", "headers", "--data", "a=1", "https://example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let result = Cli::try_parse_from(["cprobe", "check", "--kind", "mirror", "https://example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "cprobe",
            "--retries",
            "0",
            "--no-insecure-redirect",
            "--curl",
            "/usr/local/bin/curl",
            "curl-info",
        ])
        .unwrap();

        let config = build_config(&cli);
        assert_eq!(config.retries, 0);
        assert!(config.no_insecure_redirect);
        assert_eq!(config.curl_path, Some(PathBuf::from("/usr/local/bin/curl")));
    }
}
