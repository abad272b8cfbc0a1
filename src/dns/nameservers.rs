// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Nameserver discovery (C1): parses the host resolver configuration file
//! into an ordered list of nameserver endpoints.

use crate::errors::NameserverError;

/// Parse a resolver configuration file (default `/etc/resolv.conf`) into an
/// ordered sequence of nameserver host/IP strings.
///
/// Parsing rules: skip blank lines and lines beginning with
/// `#`; accept a line iff its first whitespace-separated token equals the
/// literal `nameserver`; the remaining tokens, concatenated with internal
/// whitespace removed, form the endpoint. Order of discovery is preserved.
/// Returns an empty sequence (not an error) when no matching lines exist.
///
/// # Errors
///
/// Returns [`NameserverError::ConfigUnreadable`] when `path` cannot be opened.
pub fn discover_nameservers(path: &str) -> Result<Vec<String>, NameserverError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| NameserverError::ConfigUnreadable {
            path: path.to_string(),
            source: source.to_string(),
        })?;

    Ok(parse_nameservers(&contents))
}

fn parse_nameservers(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            if tokens.next() != Some("nameserver") {
                return None;
            }
            let endpoint: String = tokens.collect();
            if endpoint.is_empty() {
                None
            } else {
                Some(endpoint)
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "nameservers_tests.rs"]
mod nameservers_tests;
