//! Domain input normalization.
//!
//! Clients may submit a bare hostname, a hostname with whitespace around it,
//! or a full URL. [`normalize`] reduces all of these to the canonical
//! lowercase hostname that scan jobs are keyed on.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::CoreError;

/// Letters/digits/hyphens per label (1-63 chars, no leading or trailing
/// hyphen), at least two labels, alphabetic TLD of two or more characters.
const HOSTNAME_PATTERN: &str =
    r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$";

static HOSTNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOSTNAME_PATTERN).expect("valid regex"));

/// Scheme prepended to scheme-less input so the URL parser sees an authority.
const DEFAULT_SCHEME: &str = "http://";

/// Normalize raw user input into a canonical lowercase hostname.
///
/// Fails with [`CoreError::InvalidDomain`] when no host can be extracted or
/// the host does not satisfy the hostname grammar.
pub fn normalize(input: &str) -> Result<String, CoreError> {
    let trimmed = input.trim();
    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{trimmed}")
    };

    // The URL parser IDNA-encodes and percent-decodes the host, and reads
    // `\` as a path separator. Only plain ASCII authorities are accepted.
    let authority = authority(&candidate[scheme_len(&candidate)..]);
    if authority
        .chars()
        .any(|c| !c.is_ascii() || c == '%' || c == '\\')
    {
        return Err(CoreError::InvalidDomain(format!(
            "Invalid domain name: {authority}"
        )));
    }

    let url = Url::parse(&candidate)
        .map_err(|e| CoreError::InvalidDomain(format!("Invalid URL format: {candidate} ({e})")))?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            CoreError::InvalidDomain(format!("Cannot extract host from URL: {candidate}"))
        })?;

    if !HOSTNAME_RE.is_match(host) {
        return Err(CoreError::InvalidDomain(format!(
            "Invalid domain name: {host}"
        )));
    }

    Ok(host.to_ascii_lowercase())
}

/// Byte length of the leading `http://` or `https://`.
fn scheme_len(url: &str) -> usize {
    url.find("://").map_or(0, |i| i + 3)
}

/// Everything up to the first `/`, `?` or `#`.
fn authority(rest: &str) -> &str {
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

fn has_http_scheme(input: &str) -> bool {
    let lower = input.get(..8).unwrap_or(input).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
