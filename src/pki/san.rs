//! Parsing of subject-alternative-name inputs.

use std::net::IpAddr;

use url::Url;

use crate::error::{Error, Result};

/// Splits comma-separated entries and drops blanks.
fn entries(values: &[String]) -> impl Iterator<Item = &str> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Parses every entry as an IPv4 or IPv6 address.
pub fn parse_and_validate_ips(values: &[String]) -> Result<Vec<IpAddr>> {
    entries(values)
        .map(|raw| {
            raw.parse::<IpAddr>()
                .map_err(|_| Error::Validation(format!("invalid IP address '{}'", raw)))
        })
        .collect()
}

/// Parses every entry as an absolute URL; relative references are rejected.
pub fn parse_and_validate_uris(values: &[String]) -> Result<Vec<String>> {
    entries(values)
        .map(|raw| {
            Url::parse(raw)
                .map(|_| raw.to_string())
                .map_err(|e| Error::Validation(format!("invalid URI '{}': {}", raw, e)))
        })
        .collect()
}
