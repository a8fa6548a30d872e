pub mod args;
pub mod config;
pub mod detect;
pub mod errors;
pub mod exit_code;
pub mod finding;
pub mod redirect;
pub mod response;
pub mod user_agent;
pub mod version;

pub use args::{CurlOptions, curl_args};
pub use config::CurlConfig;
pub use errors::Error;
pub use finding::{Finding, UrlKind};
pub use redirect::{follow_redirections, last_location};
pub use response::{
    HeaderValue, Headers, ParsedOutput, ParsedResponse, http_status_ok, parse_output,
    parse_response,
};
pub use user_agent::UserAgent;
pub use version::{CurlVersionInfo, Version};
