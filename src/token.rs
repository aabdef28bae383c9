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

//! Word segmentation and per-token hashing (spec.md §4.G). The hash is a
//! small FNV-1a variant keyed by a fixed seed, implemented locally rather
//! than pulled from an external hashing crate — the teacher reserves
//! external dependencies for structural concerns (serialization, error
//! derive, charset tables) and hand-rolls hot-path numeric primitives.

use crate::config::StemmerOracle;
use crate::text::ProcessException;

/// Reserved sentinel marking an exception boundary; never tokenized or
/// hashed (spec.md §4.G, GLOSSARY).
pub const EXCEPTION_SENTINEL: &str = "!!EX!!";

const HASH_SEED: u64 = 0xdeadbabe;
const FNV_PRIME: u64 = 0x100000001b3;

/// Hashes a single normalized token with a 64-bit non-cryptographic
/// function keyed by the literal seed `0xdeadbabe` (spec.md §4.G).
pub fn hash_token(token: &str) -> u64 {
    let mut state = HASH_SEED;
    for b in token.as_bytes() {
        state ^= *b as u64;
        state = state.wrapping_mul(FNV_PRIME);
    }
    state
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '-'
}

/// Result of tokenizing one stripped-content buffer.
pub struct Tokens {
    pub words: Vec<String>,
    pub hashes: Vec<u64>,
}

/// Walks `content`, skipping over `exceptions` (already sorted ascending
/// by position, per spec.md §4.F), splitting the remaining text into
/// maximal runs of alphanumeric-plus-`'`/`-` characters. Each token is
/// lowercased (Unicode-aware if `is_utf`, byte-wise ASCII otherwise),
/// optionally stemmed via `stemmer` when `language` is non-empty, and
/// hashed. Each exception splices in the literal sentinel `!!EX!!` as a
/// word marking the gap, so downstream bigram-style consumers of `words`
/// don't silently bridge across a stripped URL or newline; the sentinel
/// is never pushed to `hashes` (spec.md §4.G).
pub fn tokenize(
    content: &str,
    exceptions: &[ProcessException],
    is_utf: bool,
    language: &str,
    stemmer: &dyn StemmerOracle,
) -> Tokens {
    let mut words = Vec::new();
    let mut hashes = Vec::new();

    let mut exc_idx = 0;
    let mut i = 0;

    while i < content.len() {
        if exc_idx < exceptions.len() && exceptions[exc_idx].pos == i {
            let exc = exceptions[exc_idx];
            words.push(EXCEPTION_SENTINEL.to_string());
            i += exc.len.min(content.len() - i);
            exc_idx += 1;
            continue;
        }

        let ch = content[i..].chars().next().unwrap();
        if !is_token_char(ch) {
            i += ch.len_utf8();
            continue;
        }

        let start = i;
        while i < content.len() {
            if exc_idx < exceptions.len() && exceptions[exc_idx].pos == i {
                break;
            }
            match content[i..].chars().next() {
                Some(c) if is_token_char(c) => i += c.len_utf8(),
                _ => break,
            }
        }

        let raw = &content[start..i];
        if raw.is_empty() {
            continue;
        }

        let lowered = if is_utf {
            raw.to_lowercase()
        } else {
            raw.to_ascii_lowercase()
        };

        let normalized = if !language.is_empty() {
            stemmer
                .stem(language, &lowered)
                .map(|s| s.into_owned())
                .unwrap_or(lowered)
        } else {
            lowered
        };

        if normalized == EXCEPTION_SENTINEL {
            continue;
        }

        hashes.push(hash_token(&normalized));
        words.push(normalized);
    }

    // A stripped newline at the very end of `content` records its
    // exception at `content.len()`, one past the loop's range.
    if exc_idx < exceptions.len() && exceptions[exc_idx].pos == content.len() {
        words.push(EXCEPTION_SENTINEL.to_string());
    }

    Tokens { words, hashes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NullOracle;
    use crate::text::ExceptionKind;

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        let tokens = tokenize("hello, world! foo-bar", &[], true, "", &NullOracle);
        assert_eq!(tokens.words, vec!["hello", "world", "foo-bar"]);
    }

    #[test]
    fn hash_count_matches_nonempty_token_count() {
        let tokens = tokenize("one two three", &[], true, "", &NullOracle);
        assert_eq!(tokens.words.len(), tokens.hashes.len());
        assert_eq!(tokens.hashes.len(), 3);
    }

    #[test]
    fn skips_exception_spans_and_splices_sentinel() {
        let content = "see http://example.com here";
        let url_start = content.find("http").unwrap();
        let url_len = "http://example.com".len();
        let exceptions = vec![ProcessException {
            pos: url_start,
            len: url_len,
            kind: ExceptionKind::Url,
        }];
        let tokens = tokenize(content, &exceptions, true, "", &NullOracle);
        assert_eq!(tokens.words, vec!["see", EXCEPTION_SENTINEL, "here"]);
        assert_eq!(tokens.hashes.len(), 2);
        assert!(!tokens.hashes.contains(&hash_token(EXCEPTION_SENTINEL)));
    }

    #[test]
    fn literal_bangs_around_sentinel_text_are_punctuation() {
        // `!` isn't a token char, so literal "!!EX!!" in content can never
        // collide with the injected sentinel; it degrades to the ordinary
        // word "ex" and gets hashed like any other token.
        let tokens = tokenize("!!EX!! real", &[], true, "", &NullOracle);
        assert_eq!(tokens.words, vec!["ex", "real"]);
        assert_eq!(tokens.hashes, vec![hash_token("ex"), hash_token("real")]);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_token("hello"), hash_token("hello"));
        assert_ne!(hash_token("hello"), hash_token("world"));
    }

    #[test]
    fn lowercases_unicode_aware_when_utf() {
        let tokens = tokenize("HÉLLO", &[], true, "", &NullOracle);
        assert_eq!(tokens.words, vec!["héllo"]);
    }
}
