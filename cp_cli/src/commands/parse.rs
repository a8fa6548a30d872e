//! Parse command implementation.

use std::io::Read;
use std::path::Path;

use cp_core::{CurlConfig, ParsedOutput, parse_output};

use crate::display::print_json;

/// Run the parse command on a file, or stdin when none is given.
pub fn run(config: &CurlConfig, file: Option<&Path>) -> Result<(), cp_core::Error> {
    let raw = read_input(file)?;
    let parsed = parse_text(config, &raw)?;
    print_json(&parsed);
    Ok(())
}

pub fn parse_text(config: &CurlConfig, raw: &[u8]) -> Result<ParsedOutput, cp_core::Error> {
    parse_output(&String::from_utf8_lossy(raw), config.max_responses)
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>, cp_core::Error> {
    match file {
        Some(path) => std::fs::read(path).map_err(|e| cp_core::Error::FileSystem {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| cp_core::Error::FileSystem {
                    path: "<stdin>".into(),
                    message: e.to_string(),
                })?;
            Ok(buf)
        }
    }
}
