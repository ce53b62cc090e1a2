//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being used in operations.

use crate::{DashboardError, DashboardResult};

/// Validates and normalises an HTTP(S) base URL.
///
/// The value is trimmed and a single trailing `/` is removed, so that API paths can be appended
/// with a leading slash.
///
/// # Errors
///
/// Returns a `DashboardError::InvalidInput` if:
/// - the value is empty,
/// - the value does not start with `http://` or `https://`,
/// - the value contains whitespace or nothing follows the scheme.
pub fn normalise_http_url(url: &str) -> DashboardResult<String> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Err(DashboardError::InvalidInput("URL cannot be empty".into()));
    }

    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| {
            DashboardError::InvalidInput("URL must start with http:// or https://".into())
        })?;

    if rest.trim_end_matches('/').is_empty() {
        return Err(DashboardError::InvalidInput("URL is missing a host".into()));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(DashboardError::InvalidInput(
            "URL cannot contain whitespace".into(),
        ));
    }

    Ok(trimmed.strip_suffix('/').unwrap_or(trimmed).to_string())
}

/// Validates an identifier that is embedded verbatim into upstream query strings.
///
/// DHIS2 identifiers are short alphanumeric codes; anything else would corrupt the
/// comma-separated lists and `id:in:[...]` filters built by the client.
pub fn validate_identifier(id: &str) -> DashboardResult<()> {
    const MAX_IDENTIFIER_LEN: usize = 64;

    if id.is_empty() || id.len() > MAX_IDENTIFIER_LEN {
        return Err(DashboardError::InvalidInput(format!(
            "identifier must be 1-{MAX_IDENTIFIER_LEN} characters"
        )));
    }

    let ok = id
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));

    if !ok {
        return Err(DashboardError::InvalidInput(format!(
            "identifier {id:?} contains invalid characters (only alphanumeric, '-', '_' allowed)"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_http_url_strips_trailing_slash() {
        assert_eq!(
            normalise_http_url(" https://play.dhis2.org/demo/ ").unwrap(),
            "https://play.dhis2.org/demo"
        );
        assert_eq!(
            normalise_http_url("http://localhost:8080").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_normalise_http_url_rejects_missing_scheme() {
        let err = normalise_http_url("play.dhis2.org").expect_err("scheme is required");
        assert_eq!(
            err.to_string(),
            "invalid input: URL must start with http:// or https://"
        );
    }

    #[test]
    fn test_normalise_http_url_rejects_empty_and_hostless() {
        assert!(normalise_http_url("   ").is_err());
        assert!(normalise_http_url("https://").is_err());
        assert!(normalise_http_url("https:///").is_err());
        assert!(normalise_http_url("https://bad host").is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("kLmN8oPqR3s").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a,b").is_err());
        assert!(validate_identifier("x]").is_err());
    }
}
