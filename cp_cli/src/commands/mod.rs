//! Command implementations for the cprobe CLI.
//!
//! Each submodule handles one subcommand.

pub mod check;
pub mod curl_info;
pub mod fetch;
pub mod headers;
pub mod parse;
pub mod sha256;
