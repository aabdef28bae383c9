/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

//! Tolerant URL tokenization and host/path canonicalization (spec.md
//! §4.B). The entrypoint accepts a byte slice that may or may not start
//! with a scheme and tolerates the junk real-world messages surround URLs
//! with: angle brackets, trailing punctuation, backslash-as-slash, mixed
//! case, and doubled-up slashes after the scheme.

pub mod extract;
pub mod host;
pub mod path;

use std::borrow::Cow;
use std::fmt;

use crate::flags::UrlFlags;
use host::canonicalize_host;
pub use path::canonicalize_path;

/// Reasons a candidate failed to parse as a URL. Exposed so callers and
/// tests can assert on *why* a parse failed, not just that it did
/// (SPEC_FULL.md §4.B — an ambient diagnostic affordance, not part of the
/// pass/fail contract itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlError {
    EmbeddedWhitespace,
    EmptyHost,
    NegativePort,
    BracketedNonIp,
    LeadingJunk,
    UnmatchedBracket,
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            UrlError::EmbeddedWhitespace => "embedded whitespace in scheme or authority",
            UrlError::EmptyHost => "empty host",
            UrlError::NegativePort => "negative port",
            UrlError::BracketedNonIp => "bracketed host is not a valid IP literal",
            UrlError::LeadingJunk => "leading junk before host",
            UrlError::UnmatchedBracket => "unmatched bracket",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for UrlError {}

/// A parsed and canonicalized URL (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Url<'x> {
    pub host: Cow<'x, str>,
    pub user: Option<Cow<'x, str>>,
    pub password: Option<Cow<'x, str>>,
    pub port: Option<u16>,
    pub path: Cow<'x, str>,
    pub query: Option<Cow<'x, str>>,
    pub fragment: Option<Cow<'x, str>>,
    pub tld: Option<Cow<'x, str>>,
    pub flags: UrlFlags,
}

/// Parses `input` as a URL, tolerating the junk described above. This is
/// the `bytes -> Url | Error` entrypoint of spec.md §6; the `'static`
/// lifetime reflects that every field ends up owned once host
/// canonicalization (which always allocates) has run.
pub fn parse_url(input: &str) -> Result<Url<'static>, UrlError> {
    let mut s = input;

    let had_angle = s.starts_with('<');
    if had_angle {
        s = &s[1..];
    }
    s = s.trim_start();

    if let Some(idx) = s.find('>') {
        if !had_angle {
            return Err(UrlError::UnmatchedBracket);
        }
        s = &s[..idx];
    }

    let s = s.trim_end_matches(|c: char| c == '.' || c == ',' || c.is_control());

    // Whitespace terminates the candidate: callers may hand us a raw
    // substring of free text rather than a pre-delimited token.
    let s = match s.find(char::is_whitespace) {
        Some(idx) => &s[..idx],
        None => s,
    };

    if s.is_empty() {
        return Err(UrlError::EmptyHost);
    }

    let (scheme, rest) = match find_scheme(s) {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, s),
    };

    let mut flags = UrlFlags::empty();
    if scheme.is_some() {
        flags |= UrlFlags::SCHEME;
    }

    if let Some(scheme) = &scheme {
        if scheme.eq_ignore_ascii_case("mailto") {
            return parse_mailto(rest, flags);
        }
    }

    // Tolerate extra slashes (and backslashes, already normalized to
    // slashes by `find_scheme`) right after the scheme.
    let rest = rest.trim_start_matches('/');

    parse_authority_form(rest, flags)
}

fn find_scheme(s: &str) -> Option<(String, Cow<'_, str>)> {
    let colon = s.find(':')?;
    let candidate = &s[..colon];
    if candidate.is_empty() || candidate.len() > 16 {
        return None;
    }
    if candidate.chars().any(char::is_whitespace) {
        return None;
    }
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        return None;
    }

    let rest = &s[colon + 1..];
    let normalized = if rest.contains('\\') {
        Cow::Owned(rest.replace('\\', "/"))
    } else {
        Cow::Borrowed(rest)
    };
    Some((candidate.to_ascii_lowercase(), normalized))
}

fn parse_mailto(rest: &str, mut flags: UrlFlags) -> Result<Url<'static>, UrlError> {
    let rest = rest.trim_start_matches('/');
    if rest.chars().any(char::is_whitespace) {
        return Err(UrlError::EmbeddedWhitespace);
    }
    let at = rest.rfind('@').ok_or(UrlError::EmptyHost)?;
    let (user, host_raw) = (&rest[..at], &rest[at + 1..]);
    if user.is_empty() {
        return Err(UrlError::EmptyHost);
    }
    let host = canonicalize_host(host_raw)?;
    if host_raw != host {
        flags |= UrlFlags::OBFUSCATED;
    }

    Ok(Url {
        host: Cow::Owned(host),
        user: Some(Cow::Owned(user.to_string())),
        password: None,
        port: None,
        path: Cow::Borrowed(""),
        query: None,
        fragment: None,
        tld: None,
        flags,
    })
}

fn parse_authority_form(rest: &str, mut flags: UrlFlags) -> Result<Url<'static>, UrlError> {
    // Split off fragment, then query, then path, leaving the authority.
    let (before_fragment, fragment) = match rest.find('#') {
        Some(idx) => (&rest[..idx], Some(rest[idx + 1..].to_string())),
        None => (rest, None),
    };
    let (before_query, query) = match before_fragment.find('?') {
        Some(idx) => (
            &before_fragment[..idx],
            Some(before_fragment[idx + 1..].to_string()),
        ),
        None => (before_fragment, None),
    };

    let (authority, path_part) = split_authority(before_query);

    if authority.chars().any(char::is_whitespace) {
        return Err(UrlError::EmbeddedWhitespace);
    }
    if authority.starts_with(',') {
        return Err(UrlError::LeadingJunk);
    }

    let (userinfo, host_port) = match authority.rfind('@') {
        Some(idx) => (Some(&authority[..idx]), &authority[idx + 1..]),
        None => (None, authority),
    };

    if userinfo.is_some() && host_port.is_empty() {
        return Err(UrlError::EmptyHost);
    }

    let (user, password) = match userinfo {
        Some(info) => match info.find(':') {
            Some(idx) => (
                Some(info[..idx].to_string()),
                Some(info[idx + 1..].to_string()),
            ),
            None => (Some(info.to_string()), None),
        },
        None => (None, None),
    };

    let (host_raw, port) = split_host_port(host_port)?;
    if host_raw.is_empty() {
        return Err(UrlError::EmptyHost);
    }

    let host = canonicalize_host(host_raw)?;
    if host_raw != host {
        flags |= UrlFlags::OBFUSCATED;
    }

    let path = canonicalize_path(path_part);

    Ok(Url {
        host: Cow::Owned(host),
        user: user.map(Cow::Owned),
        password: password.map(Cow::Owned),
        port,
        path: Cow::Owned(path),
        query: query.map(Cow::Owned),
        fragment: fragment.map(Cow::Owned),
        tld: None,
        flags,
    })
}

/// Splits `s` into an authority component and the remaining path,
/// respecting a bracketed IPv6 literal's embedded `/`-free span.
fn split_authority(s: &str) -> (&str, &str) {
    if s.starts_with('[') {
        return match s.find(']') {
            Some(close) => {
                let after_bracket = &s[close + 1..];
                let port_len = after_bracket.find('/').unwrap_or(after_bracket.len());
                let end = close + 1 + port_len;
                (&s[..end], &s[end..])
            }
            None => (s, ""),
        };
    }

    match s.find('/') {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

fn split_host_port(s: &str) -> Result<(&str, Option<u16>), UrlError> {
    if s.starts_with('[') {
        return match s.find(']') {
            Some(close) => {
                let host = &s[..=close];
                let after = &s[close + 1..];
                let port = parse_port(after)?;
                Ok((host, port))
            }
            None => Err(UrlError::UnmatchedBracket),
        };
    }

    match s.rfind(':') {
        Some(idx) if s[idx + 1..].chars().all(|c| c.is_ascii_digit() || c == '-') => {
            let port = parse_port(&s[idx..])?;
            Ok((&s[..idx], port))
        }
        _ => Ok((s, None)),
    }
}

fn parse_port(s: &str) -> Result<Option<u16>, UrlError> {
    let s = s.trim_start_matches(':');
    if s.is_empty() {
        return Ok(None);
    }
    if let Some(rest) = s.strip_prefix('-') {
        let _ = rest;
        return Err(UrlError::NegativePort);
    }
    Ok(s.parse::<u16>().ok())
}
