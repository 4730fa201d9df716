// src/auth/challenge.rs

//! Parsing of `WWW-Authenticate` challenges.

use http::header::{HeaderMap, WWW_AUTHENTICATE};

use crate::error::{self, Result};

const NTLM_PREFIX: &str = "ntlm ";

/// The authentication schemes a server advertised, lower-cased.
///
/// Order of first appearance is kept for logging; lookups are by membership.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SchemeSet(Vec<String>);

impl SchemeSet {
    /// Collect the schemes from every `WWW-Authenticate` header.
    ///
    /// Each header value is split on commas outside quoted strings. Pieces that are a bare
    /// `name=value` are parameters of the previous challenge and are skipped;
    /// for the rest the first word is the scheme name.
    pub(crate) fn from_headers(headers: &HeaderMap) -> SchemeSet {
        let mut schemes = SchemeSet::default();

        for value in headers.get_all(WWW_AUTHENTICATE) {
            let Ok(value) = value.to_str() else {
                continue;
            };

            for part in split_challenge_list(value) {
                if is_auth_param(part) {
                    continue;
                }
                if let Some(scheme) = part.split_whitespace().next() {
                    schemes.insert(scheme.to_ascii_lowercase());
                }
            }
        }

        schemes
    }

    fn insert(&mut self, scheme: String) {
        if !self.0.contains(&scheme) {
            self.0.push(scheme);
        }
    }

    pub(crate) fn contains(&self, scheme: &str) -> bool {
        self.0.iter().any(|s| s == scheme)
    }
}

/// Split a `WWW-Authenticate` value on the commas that separate challenges
/// and parameters, leaving commas inside `"quoted, strings"` alone.
fn split_challenge_list(value: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (idx, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);

    parts.into_iter().map(str::trim)
}

/// `realm="x"`, `charset=UTF-8`: a name directly followed by `=` and a value.
fn is_auth_param(part: &str) -> bool {
    match part.find(|c: char| c == '=' || c.is_whitespace()) {
        Some(idx) if idx > 0 && part[idx..].starts_with('=') => part.len() > idx + 1,
        _ => false,
    }
}

/// Locate the server's NTLM challenge token (still base64 encoded).
pub(crate) fn ntlm_token(headers: &HeaderMap) -> Result<&str> {
    let mut values = headers.get_all(WWW_AUTHENTICATE).iter().peekable();
    if values.peek().is_none() {
        return Err(error::malformed_challenge(
            "www-authenticate header missing",
        ));
    }

    values
        .filter_map(|value| value.to_str().ok())
        .flat_map(split_challenge_list)
        .find_map(|part| {
            let prefix = part.get(..NTLM_PREFIX.len())?;
            if prefix.eq_ignore_ascii_case(NTLM_PREFIX) {
                Some(part[NTLM_PREFIX.len()..].trim())
            } else {
                None
            }
        })
        .ok_or_else(|| error::malformed_challenge("NTLM part missing in www-authenticate"))
}
