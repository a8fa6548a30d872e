//! Following `Location` headers across a parsed redirect chain.

use url::Url;

use crate::Error;
use crate::response::ParsedResponse;

/// The most recent non-blank `Location`, optionally made absolute against
/// `base_url`.
pub fn last_location(responses: &[ParsedResponse], base_url: Option<&str>) -> Option<String> {
    let location = responses
        .iter()
        .rev()
        .find_map(|r| r.headers.last_value("location"))?;

    let absolute = base_url.and_then(|base| join(base, location).ok());
    Some(absolute.unwrap_or_else(|| location.to_string()))
}

/// Resolve every `Location` in order, each against the URL produced by the
/// previous hop, and return where the chain ends.
pub fn follow_redirections(responses: &[ParsedResponse], base_url: &str) -> Result<String, Error> {
    let mut current = base_url.to_string();
    for location in responses
        .iter()
        .filter_map(|r| r.headers.last_value("location"))
    {
        current = join(&current, location)?;
    }
    Ok(current)
}

fn join(base: &str, location: &str) -> Result<String, Error> {
    let base_url = Url::parse(base).map_err(|e| Error::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;
    base_url
        .join(location.trim())
        .map(String::from)
        .map_err(|e| Error::InvalidUrl {
            url: location.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Headers;

    fn response(location: Option<&str>) -> ParsedResponse {
        let mut headers = Headers::new();
        if let Some(location) = location {
            headers.insert("Location", location);
        }
        ParsedResponse {
            status_code: if location.is_some() { "302" } else { "200" }.to_string(),
            status_text: None,
            headers,
        }
    }

    #[test]
    fn last_location_prefers_newest() {
        let responses = vec![
            response(Some("https://one.example/")),
            response(None),
            response(Some("https://three.example/")),
        ];

        assert_eq!(
            last_location(&responses, None).as_deref(),
            Some("https://three.example/")
        );
    }

    #[test]
    fn last_location_skips_blank_values() {
        let responses = vec![response(Some("/first")), response(Some("  "))];
        assert_eq!(last_location(&responses, None).as_deref(), Some("/first"));
    }

    #[test]
    fn last_location_absolutizes_against_base() {
        let responses = vec![response(Some("/download/v2"))];

        assert_eq!(
            last_location(&responses, Some("https://example.com/download")).as_deref(),
            Some("https://example.com/download/v2")
        );
        assert_eq!(last_location(&responses, None).as_deref(), Some("/download/v2"));
    }

    #[test]
    fn last_location_none_without_redirects() {
        assert!(last_location(&[response(None)], None).is_none());
        assert!(last_location(&[], Some("https://a/")).is_none());
    }

    #[test]
    fn follows_relative_chain() {
        let responses = vec![response(Some("/y")), response(Some("z"))];
        assert_eq!(follow_redirections(&responses, "https://a/x").unwrap(), "https://a/z");
    }

    #[test]
    fn follow_without_locations_returns_base() {
        let responses = vec![response(None)];
        assert_eq!(
            follow_redirections(&responses, "http://example.com/").unwrap(),
            "http://example.com/"
        );
    }

    #[test]
    fn follow_switches_scheme_on_absolute_location() {
        let responses = vec![response(Some("https://example.com/")), response(None)];
        assert_eq!(
            follow_redirections(&responses, "http://example.com/").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn follow_rejects_unparseable_base() {
        let responses = vec![response(Some("/y"))];
        assert!(matches!(
            follow_redirections(&responses, "not a url"),
            Err(Error::InvalidUrl { .. })
        ));
    }
}
