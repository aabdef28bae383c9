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

//! Recursive-descent MIME structure parsing (spec.md §4.D). Boundary
//! scanning is grounded in the teacher's `parsers::mime` module
//! (`seek_next_part_offset`/`mime_part`/`skip_crlf`), rewritten to operate
//! directly on byte-slice offsets rather than the teacher's
//! checkpoint/restore stream cursor.

pub mod content_type;

use crate::config::{Config, MAX_MIME_DEPTH};
use crate::digest::Digest;
use crate::flags::MimePartFlags;
use crate::header::{parse_headers, Headers};
use content_type::{parse_content_type, ContentType};

/// One node of the MIME part tree (spec.md §3).
///
/// `digest` starts zeroed; the orchestrator fills it in once it has decoded
/// the part's content-transfer-encoding (spec.md §4.D: "computed over
/// decoded data", which this structural pass hasn't produced yet).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MimePart {
    pub raw_start: usize,
    pub raw_end: usize,
    pub parsed_start: usize,
    pub parsed_end: usize,
    pub content_type: ContentType,
    pub content_disposition: Option<ContentType>,
    pub headers: Headers,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub digest: Digest,
    pub flags: MimePartFlags,
}

impl MimePart {
    pub fn body<'a>(&self, message: &'a [u8]) -> &'a [u8] {
        &message[self.parsed_start..self.parsed_end]
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parses `message` as a MIME tree rooted at `root_content_type`, returning
/// the flattened parts vector in depth-first pre-order (spec.md §5:
/// "part traversal is depth-first pre-order over the MIME tree"). Index 0
/// is always the root part.
pub fn parse_mime(message: &[u8], config: &Config) -> Vec<MimePart> {
    let mut parts = Vec::new();
    let (root_headers, body_start) = parse_headers(message);
    let root_content_type = root_headers
        .first_value("Content-Type")
        .map(parse_content_type)
        .unwrap_or_else(|| parse_content_type("text/plain; charset=us-ascii"));
    let root_disposition = root_headers
        .first_value("Content-Disposition")
        .map(parse_content_type);

    parse_part(
        message,
        0,
        body_start,
        message.len(),
        root_headers,
        root_content_type,
        root_disposition,
        None,
        None,
        0,
        config,
        &mut parts,
    );

    parts
}

#[allow(clippy::too_many_arguments)]
fn parse_part(
    message: &[u8],
    raw_start: usize,
    parsed_start: usize,
    raw_end: usize,
    headers: Headers,
    content_type: ContentType,
    content_disposition: Option<ContentType>,
    boundary: Option<Vec<u8>>,
    parent: Option<usize>,
    depth: usize,
    config: &Config,
    parts: &mut Vec<MimePart>,
) -> usize {
    let index = parts.len();
    let mut flags = MimePartFlags::empty();

    if content_type.is_text() {
        flags |= MimePartFlags::TEXT;
    }
    if content_disposition
        .as_ref()
        .map(|d| d.c_type.eq_ignore_ascii_case("attachment"))
        .unwrap_or(false)
    {
        flags |= MimePartFlags::ATTACHMENT;
    }

    parts.push(MimePart {
        raw_start,
        raw_end,
        parsed_start,
        parsed_end: raw_end,
        content_type: content_type.clone(),
        content_disposition,
        headers,
        parent,
        children: Vec::new(),
        digest: [0u8; 16],
        flags,
    });

    if content_type.is_multipart() && depth < MAX_MIME_DEPTH {
        if let Some(inner_boundary) = content_type.attribute("boundary") {
            let inner_boundary = inner_boundary.as_bytes().to_vec();
            let mut pos = parsed_start;
            let mut children = Vec::new();

            pos = match seek_next_part_offset(message, pos, &inner_boundary) {
                Some(marker_start) => marker_start + 2 + inner_boundary.len(),
                None => {
                    parts[index].flags |= MimePartFlags::BROKEN;
                    parts[index].parsed_end = raw_end;
                    let _ = boundary;
                    return index;
                }
            };

            loop {
                if is_multipart_end(message, &mut pos) {
                    break;
                }
                skip_line_end(message, &mut pos);
                let headers_start = pos;
                let (content_end, body_end, is_end, next_pos) =
                    scan_one_part(message, headers_start, &inner_boundary);

                let (part_headers, body_start) =
                    parse_headers(&message[headers_start..content_end]);
                let part_headers_abs_body_start = headers_start + body_start;
                let part_content_type = part_headers
                    .first_value("Content-Type")
                    .map(parse_content_type)
                    .unwrap_or_else(|| parse_content_type("text/plain; charset=us-ascii"));
                let part_disposition = part_headers
                    .first_value("Content-Disposition")
                    .map(parse_content_type);

                let child_index = parse_part(
                    message,
                    pos,
                    part_headers_abs_body_start,
                    body_end,
                    part_headers,
                    part_content_type,
                    part_disposition,
                    Some(inner_boundary.clone()),
                    Some(index),
                    depth + 1,
                    config,
                    parts,
                );
                children.push(child_index);

                if !is_end {
                    parts[index].flags |= MimePartFlags::TRUNCATED;
                    break;
                }
                pos = next_pos;
            }

            parts[index].children = children;
            parts[index].parsed_end = pos;
        } else {
            // multipart/* with no boundary parameter: malformed, treat the
            // rest of the bytes as this part's own body (spec.md §4.D).
            parts[index].flags |= MimePartFlags::BROKEN;
        }
    } else if content_type.is_multipart() {
        // Nesting depth exceeded: attach the excess as an opaque leaf
        // rather than dropping it (spec.md §4.D, §7 ResourceLimit).
        parts[index].flags |= MimePartFlags::BROKEN;
    }

    index
}

/// Scans forward from `pos` for the next boundary line, returning
/// `(content_end, body_end, found_boundary, pos_after_marker_text)`. The
/// caller feeds `pos_after_marker_text` back through `is_multipart_end` /
/// `skip_line_end` exactly like the position just after the boundary that
/// opened the first part, so every boundary (first and subsequent) is
/// handled by the same loop body.
fn scan_one_part(message: &[u8], pos: usize, boundary: &[u8]) -> (usize, usize, bool, usize) {
    match seek_next_part_offset(message, pos, boundary) {
        Some(marker_start) => {
            let content_end = trim_trailing_eol(message, pos, marker_start);
            let next_pos = marker_start + 2 + boundary.len();
            (content_end, content_end, true, next_pos)
        }
        None => (message.len(), message.len(), false, message.len()),
    }
}

/// Finds the offset where the next `--boundary` marker begins, mirroring
/// the teacher's `MessageStream::seek_next_part_offset`: the boundary must
/// appear at the start of a line.
fn seek_next_part_offset(message: &[u8], from: usize, boundary: &[u8]) -> Option<usize> {
    let marker = {
        let mut m = Vec::with_capacity(boundary.len() + 2);
        m.extend_from_slice(b"--");
        m.extend_from_slice(boundary);
        m
    };

    let mut last_ch = b'\n';
    let mut i = from;
    while i < message.len() {
        if last_ch == b'\n' && message[i..].starts_with(&marker) {
            return Some(i);
        }
        last_ch = message[i];
        i += 1;
    }

    None
}

/// Trims the single trailing line terminator immediately before
/// `marker_start`, so the returned content range excludes the CRLF that
/// precedes the boundary line, but never trims past `floor`.
fn trim_trailing_eol(message: &[u8], floor: usize, marker_start: usize) -> usize {
    let mut end = marker_start;
    if end > floor && message[end - 1] == b'\n' {
        end -= 1;
        if end > floor && message[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

/// After a boundary line, checks whether it was the terminal `--boundary--`
/// delimiter, advancing `pos` past the trailing `--` if so.
fn is_multipart_end(message: &[u8], pos: &mut usize) -> bool {
    if message[*pos..].starts_with(b"--") {
        *pos += 2;
        true
    } else {
        false
    }
}

/// Advances `pos` past the line terminator following a boundary marker, to
/// the first byte of the next part's header block.
fn skip_line_end(message: &[u8], pos: &mut usize) {
    while *pos < message.len() && message[*pos] != b'\n' {
        *pos += 1;
    }
    if *pos < message.len() {
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn single_leaf_part() {
        let msg = b"Content-Type: text/plain\r\n\r\nhello world";
        let config = Config::default();
        let parts = parse_mime(msg, &config);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_leaf());
        assert!(parts[0].flags.contains(MimePartFlags::TEXT));
    }

    #[test]
    fn multipart_alternative_two_children() {
        let msg = b"Content-Type: multipart/alternative; boundary=\"B\"\r\n\r\n--B\r\nContent-Type: text/plain\r\n\r\nhello\r\n--B\r\nContent-Type: text/html\r\n\r\n<p>hi</p>\r\n--B--\r\n";
        let config = Config::default();
        let parts = parse_mime(msg, &config);
        assert_eq!(parts[0].children.len(), 2);
        assert!(parts[0].content_type.is_multipart());
        assert_eq!(parts[parts[0].children[0]].content_type.c_subtype.as_deref(), Some("plain"));
        assert_eq!(parts[parts[0].children[1]].content_type.c_subtype.as_deref(), Some("html"));
    }

    #[test]
    fn missing_boundary_is_broken_not_dropped() {
        let msg = b"Content-Type: multipart/mixed\r\n\r\nsome bytes here";
        let config = Config::default();
        let parts = parse_mime(msg, &config);
        assert!(parts[0].flags.contains(MimePartFlags::BROKEN));
    }
}
