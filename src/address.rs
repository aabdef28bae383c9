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

//! Address-list extraction for `From`/`To`/`Cc`/`Bcc` (spec.md §4.I step 8).
//! The teacher's own `fields::address` module is a heavy character
//! tokenizer tied to its `Addr`/`Group`/`HeaderValue` types; since this
//! core's data model only asks for a flat address list per header, parsing
//! here is a simpler top-level-aware splitter: respect quotes, angle
//! brackets, and comments when finding the commas that separate mailboxes,
//! recurse into `Group: member, member;` bodies, and discard the group
//! name once its members are flattened in.

use crate::header::decode_encoded_words;

/// One parsed mailbox (spec.md §4.I step 8: "From into a separate list").
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    pub name: Option<String>,
    pub address: String,
}

/// Parses an RFC 5322 address-list header value into a flat sequence of
/// mailboxes, flattening any `Group: member, member;` bodies and discarding
/// the group display name.
pub fn parse_address_list(value: &str) -> Vec<Address> {
    let mut out = Vec::new();
    for entry in split_top_level(value, &[',', ';']) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        if let Some(colon) = find_top_level(entry, ':') {
            let before_angle = find_top_level(entry, '<').map(|i| i > colon).unwrap_or(true);
            let before_at = find_top_level(entry, '@').map(|i| i > colon).unwrap_or(true);
            if before_angle && before_at {
                out.extend(parse_address_list(&entry[colon + 1..]));
                continue;
            }
        }

        if let Some(addr) = parse_single_address(entry) {
            out.push(addr);
        }
    }
    out
}

fn parse_single_address(entry: &str) -> Option<Address> {
    let entry = strip_comments(entry);
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }

    if let Some(open) = entry.find('<') {
        let close = entry[open..].find('>').map(|i| open + i);
        let name = strip_quotes(entry[..open].trim());
        let addr = match close {
            Some(close) => entry[open + 1..close].trim(),
            None => entry[open + 1..].trim(),
        };
        if addr.is_empty() {
            return None;
        }
        let name = if name.is_empty() {
            None
        } else {
            Some(decode_encoded_words(name.to_string()))
        };
        return Some(Address {
            name,
            address: addr.to_string(),
        });
    }

    Some(Address {
        name: None,
        address: entry.to_string(),
    })
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Removes parenthesized `(comment)` spans at the top nesting level,
/// collapsing each to a single space.
fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0u32;
    let mut in_quotes = false;
    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                out.push(c);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(' ');
                }
            }
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}

/// Splits `s` on any of `separators` that appear outside quotes, angle
/// brackets, and parenthesized comments.
fn split_top_level<'a>(s: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut depth_angle = 0i32;
    let mut depth_paren = 0i32;
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth_angle += 1,
            '>' if !in_quotes && depth_angle > 0 => depth_angle -= 1,
            '(' if !in_quotes => depth_paren += 1,
            ')' if !in_quotes && depth_paren > 0 => depth_paren -= 1,
            c if !in_quotes
                && depth_angle == 0
                && depth_paren == 0
                && separators.contains(&c) =>
            {
                out.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

fn find_top_level(s: &str, needle: char) -> Option<usize> {
    let mut depth_angle = 0i32;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth_angle += 1,
            '>' if !in_quotes && depth_angle > 0 => depth_angle -= 1,
            c if !in_quotes && depth_angle == 0 && c == needle => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address() {
        let list = parse_address_list("jane@example.com");
        assert_eq!(list, vec![Address { name: None, address: "jane@example.com".into() }]);
    }

    #[test]
    fn named_address() {
        let list = parse_address_list("\"James Smythe\" <james@vandelay.com>");
        assert_eq!(
            list,
            vec![Address {
                name: Some("James Smythe".into()),
                address: "james@vandelay.com".into()
            }]
        );
    }

    #[test]
    fn comma_separated_list() {
        let list = parse_address_list("a@example.com, b@example.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].address, "a@example.com");
        assert_eq!(list[1].address, "b@example.com");
    }

    #[test]
    fn group_is_flattened_and_name_dropped() {
        let list = parse_address_list("Friends: jane@example.com, john@example.com;");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].address, "jane@example.com");
        assert_eq!(list[1].address, "john@example.com");
    }

    #[test]
    fn comment_after_address_is_ignored() {
        let list = parse_address_list("art@vandelay.com (Vandelay Industries)");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].address, "art@vandelay.com");
    }

    #[test]
    fn encoded_word_name_is_decoded() {
        let list = parse_address_list("=?UTF-8?Q?John_Sm=C3=AEth?= <john@example.com>");
        assert_eq!(list[0].name.as_deref(), Some("John Smîth"));
    }
}
