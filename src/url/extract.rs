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

//! Scans free text for URL-shaped words (spec.md §4.F: URL exceptions feed
//! the same merge as newline exceptions; §4.I step 9: "extract URLs from
//! every `Subject` header"). Candidate words are whitespace-delimited;
//! [`super::parse_url`] already tolerates the angle-bracket and
//! trailing-punctuation junk real messages wrap URLs in, so the only job
//! here is recognizing which words are worth handing to it.

use super::{parse_url, Url};
use crate::text::{ExceptionKind, ProcessException};

const SCHEMES: [&str; 4] = ["http://", "https://", "ftp://", "mailto:"];

fn looks_like_url(word: &str) -> bool {
    let trimmed = word.trim_start_matches('<');
    SCHEMES.iter().any(|s| trimmed.starts_with(s)) || trimmed.starts_with("www.")
}

fn split_words(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

/// Scans `text` for URL-shaped words, returning each successfully parsed
/// URL alongside a `Url`-kind process exception covering the matched word
/// (spec.md §4.F, §4.G: exceptions are skipped by the tokenizer).
pub fn scan_text_for_urls(text: &str) -> Vec<(ProcessException, Url<'static>)> {
    let mut out = Vec::new();
    for (pos, word) in split_words(text) {
        if !looks_like_url(word) {
            continue;
        }
        if let Ok(url) = parse_url(word) {
            out.push((
                ProcessException {
                    pos,
                    len: word.len(),
                    kind: ExceptionKind::Url,
                },
                url,
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_url_in_sentence() {
        let found = scan_text_for_urls("see http://example.com/path for details");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.host, "example.com");
        assert_eq!(found[0].0.pos, 4);
    }

    #[test]
    fn finds_multiple_urls() {
        let found = scan_text_for_urls("http://a.com and https://b.com");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].1.host, "a.com");
        assert_eq!(found[1].1.host, "b.com");
    }

    #[test]
    fn plain_text_has_no_urls() {
        let found = scan_text_for_urls("no links in this sentence at all");
        assert!(found.is_empty());
    }

    #[test]
    fn recognizes_bare_www_prefix() {
        let found = scan_text_for_urls("visit www.example.com today");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.host, "www.example.com");
    }
}
