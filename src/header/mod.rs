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

//! RFC 5322 header folding/unfolding and RFC 2047 encoded-word decoding
//! (spec.md §4.C). Unlike the teacher's `RfcHeader`-keyed dispatch table,
//! records are kept under a plain lowercased name — the data model calls
//! for a name → ordered-records map, not a fixed header enum.

use std::collections::HashMap;

use crate::decode::{decode_base64, decode_charset, decode_quoted_printable};

/// One parsed header line (after unfolding).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderRecord {
    pub name: String,
    pub name_lower: String,
    pub raw_value: Vec<u8>,
    pub value: String,
    pub order: usize,
}

/// A name-indexed, insertion-ordered collection of header records
/// (spec.md §3: "a mapping from lowercased header name to insertion-ordered
/// sequence of header records").
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers {
    records: Vec<HeaderRecord>,
    by_name: HashMap<String, Vec<usize>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, record: HeaderRecord) {
        let idx = self.records.len();
        self.by_name
            .entry(record.name_lower.clone())
            .or_default()
            .push(idx);
        self.records.push(record);
    }

    /// All records for `field`, in header order (spec.md §4.C).
    pub fn by_name(&self, field: &str) -> Vec<&HeaderRecord> {
        let key = field.to_ascii_lowercase();
        self.by_name
            .get(&key)
            .map(|indices| indices.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Same as `by_name` but additionally requires the original casing to
    /// match exactly (spec.md §4.C: "a strong variant that additionally
    /// filters for exact-case match").
    pub fn by_name_strong<'a>(&'a self, field: &str) -> Vec<&'a HeaderRecord> {
        self.by_name(field)
            .into_iter()
            .filter(|r| r.name == field)
            .collect()
    }

    /// Convenience: the decoded value of the first record for `field`.
    pub fn first_value(&self, field: &str) -> Option<&str> {
        self.by_name(field).first().map(|r| r.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses headers starting at `input[0]` up to (and consuming) the blank
/// line that ends the header block. Returns the parsed headers and the
/// byte offset of the first body byte. Folded continuation lines (those
/// starting with a space or tab) are unfolded into the preceding value,
/// the fold itself collapsing to a single space (RFC 5322 §2.2.3).
pub fn parse_headers(input: &[u8]) -> (Headers, usize) {
    let mut headers = Headers::new();
    let mut order = 0;
    let mut pos = 0;
    let mut current: Option<(String, Vec<u8>)> = None;

    loop {
        if pos >= input.len() {
            break;
        }
        let line_start = pos;
        let line_end = find_byte(input, pos, b'\n').map(|i| i + 1).unwrap_or(input.len());
        let line = strip_eol(&input[line_start..line_end]);

        if line.is_empty() {
            pos = line_end;
            break;
        }

        if matches!(line.first(), Some(b' ') | Some(b'\t')) {
            if let Some((_, value)) = current.as_mut() {
                value.push(b' ');
                value.extend_from_slice(trim_start_ws(line));
            }
            pos = line_end;
            continue;
        }

        if let Some((name, raw_value)) = current.take() {
            push_header(&mut headers, name, raw_value, &mut order);
        }

        match find_byte(line, 0, b':') {
            Some(colon) => {
                let name = String::from_utf8_lossy(&line[..colon]).trim().to_string();
                let value_part = trim_start_ws(&line[colon + 1..]).to_vec();
                current = Some((name, value_part));
                pos = line_end;
            }
            None => {
                // Not a valid header field: stop here, leaving `pos` at
                // the start of this line so it's treated as body
                // (best-effort, spec.md §1).
                pos = line_start;
                break;
            }
        }
    }

    if let Some((name, raw_value)) = current.take() {
        push_header(&mut headers, name, raw_value, &mut order);
    }

    (headers, pos)
}

fn push_header(headers: &mut Headers, name: String, raw_value: Vec<u8>, order: &mut usize) {
    let name_lower = name.to_ascii_lowercase();
    let value = decode_encoded_words(String::from_utf8_lossy(&raw_value).into_owned());
    headers.push(HeaderRecord {
        name,
        name_lower,
        raw_value,
        value,
        order: *order,
    });
    *order += 1;
}

fn find_byte(input: &[u8], from: usize, needle: u8) -> Option<usize> {
    input[from..].iter().position(|&b| b == needle).map(|i| i + from)
}

fn strip_eol(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    if end > 0 && line[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && line[end - 1] == b'\r' {
        end -= 1;
    }
    &line[..end]
}

fn trim_start_ws(line: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < line.len() && matches!(line[start], b' ' | b'\t') {
        start += 1;
    }
    &line[start..]
}

/// Decodes every RFC 2047 encoded-word in `value`, passing through any
/// surrounding plain text unchanged. Whitespace that separates two adjacent
/// encoded-words is suppressed, per RFC 2047 §6.2.
pub fn decode_encoded_words(value: String) -> String {
    if !value.contains("=?") {
        return value;
    }

    let mut out = String::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut i = 0;
    let mut last_was_encoded = false;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"=?") {
            if let Some((decoded, consumed)) = try_decode_word(&value[i..]) {
                out.push_str(&decoded);
                i += consumed;
                last_was_encoded = true;
                continue;
            }
        }
        if bytes[i] == b' ' || bytes[i] == b'\t' {
            let mut j = i;
            while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
                j += 1;
            }
            let next_is_encoded = value[j..].starts_with("=?") && try_decode_word(&value[j..]).is_some();
            if !(last_was_encoded && next_is_encoded) {
                out.push_str(&value[i..j]);
            }
            i = j;
            last_was_encoded = false;
            continue;
        }
        let ch_len = value[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        out.push_str(&value[i..i + ch_len]);
        i += ch_len;
        last_was_encoded = false;
    }

    out
}

/// Attempts to decode one `=?charset?B/Q?text?=` token starting at the
/// beginning of `s`. Returns the decoded text and the number of bytes
/// consumed from `s`, or `None` if `s` doesn't start with a well-formed
/// encoded-word.
fn try_decode_word(s: &str) -> Option<(String, usize)> {
    let rest = s.strip_prefix("=?")?;
    let charset_end = rest.find('?')?;
    let charset = &rest[..charset_end];
    let rest = &rest[charset_end + 1..];

    let mut chars = rest.chars();
    let encoding = chars.next()?;
    if chars.next()? != '?' {
        return None;
    }
    let rest = &rest[2..];

    let text_end = rest.find("?=")?;
    let encoded_text = &rest[..text_end];
    let total_len = s.len() - rest.len() + text_end + 2;

    let decoded_bytes = match encoding.to_ascii_uppercase() {
        'B' => decode_base64(encoded_text.as_bytes()),
        'Q' => decode_quoted_printable(&q_word_unescape(encoded_text)),
        _ => return None,
    };

    let (text, _) = decode_charset(charset, &decoded_bytes);
    Some((text, total_len))
}

/// RFC 2047 Q-encoding is quoted-printable with one twist: `_` stands for
/// a literal space instead of being passed through.
fn q_word_unescape(s: &str) -> Vec<u8> {
    s.bytes().map(|b| if b == b'_' { b' ' } else { b }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_headers() {
        let input = b"Subject: hello\r\nFrom: a@b.com\r\n\r\nbody";
        let (headers, body_start) = parse_headers(input);
        assert_eq!(headers.first_value("Subject"), Some("hello"));
        assert_eq!(headers.first_value("from"), Some("a@b.com"));
        assert_eq!(&input[body_start..], b"body");
    }

    #[test]
    fn folded_continuation_is_unfolded() {
        let input = b"Subject: hello\r\n world\r\n\r\n";
        let (headers, _) = parse_headers(input);
        assert_eq!(headers.first_value("Subject"), Some("hello world"));
    }

    #[test]
    fn order_is_preserved() {
        let input = b"A: 1\r\nB: 2\r\nA: 3\r\n\r\n";
        let (headers, _) = parse_headers(input);
        let a_records = headers.by_name("a");
        assert_eq!(a_records.len(), 2);
        assert!(a_records[0].order < a_records[1].order);
    }

    #[test]
    fn strong_lookup_filters_exact_case() {
        let input = b"X-Foo: 1\r\nx-foo: 2\r\n\r\n";
        let (headers, _) = parse_headers(input);
        assert_eq!(headers.by_name_strong("X-Foo").len(), 1);
        assert_eq!(headers.by_name("x-foo").len(), 2);
    }

    #[test]
    fn decodes_base64_encoded_word() {
        let decoded = decode_encoded_words("=?UTF-8?B?aGVsbG8=?=".to_string());
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn decodes_quoted_printable_encoded_word_with_underscore_space() {
        let decoded = decode_encoded_words("=?UTF-8?Q?hello_world?=".to_string());
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn suppresses_whitespace_between_adjacent_encoded_words() {
        let decoded =
            decode_encoded_words("=?UTF-8?Q?hello?= =?UTF-8?Q?_world?=".to_string());
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        let decoded = decode_encoded_words("just plain text".to_string());
        assert_eq!(decoded, "just plain text");
    }
}
