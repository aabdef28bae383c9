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

//! Newline stripping, HTML-aware text extraction, and Unicode script
//! detection (spec.md §4.F). No HTML tree crate ships in the teacher's
//! dependency stack for this corpus, so tag stripping here is a small
//! hand-rolled state machine rather than a full tree builder; it tracks
//! only what downstream tokenization needs (text content, with
//! preformatted-context newlines preserved as spaces).

pub mod html;

/// The kind of a spliced-out region, in merge priority order (highest
/// first) per spec.md §4.F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExceptionKind {
    Newline = 0,
    Generated = 1,
    Url = 2,
}

/// A region of stripped content that tokenization must skip (spec.md
/// GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessException {
    pub pos: usize,
    pub len: usize,
    pub kind: ExceptionKind,
}

/// Result of stripping line terminators from decoded part text.
pub struct StrippedContent {
    pub bytes: Vec<u8>,
    pub newline_offsets: Vec<usize>,
    pub line_count: usize,
}

/// Removes `\r`, `\n`, and `\r\n` line terminators from `input`, recording
/// the position (in stripped-content coordinates) at which each removed
/// terminator occurred. When `preserve_as_space` is true (HTML
/// preformatted context), a terminator contributes a single space byte to
/// the stripped output instead of disappearing entirely, while still being
/// recorded as a newline position (spec.md §4.F).
pub fn strip_newlines(input: &[u8], preserve_as_space: bool) -> StrippedContent {
    let mut bytes = Vec::with_capacity(input.len());
    let mut newline_offsets = Vec::new();
    let mut line_count = 1;
    let mut i = 0;

    while i < input.len() {
        match input[i] {
            b'\r' => {
                if preserve_as_space {
                    bytes.push(b' ');
                }
                newline_offsets.push(bytes.len());
                line_count += 1;
                i += 1;
                if input.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {
                if preserve_as_space {
                    bytes.push(b' ');
                }
                newline_offsets.push(bytes.len());
                line_count += 1;
                i += 1;
            }
            b => {
                bytes.push(b);
                i += 1;
            }
        }
    }

    StrippedContent {
        bytes,
        newline_offsets,
        line_count,
    }
}

/// Builds the newline-kind exceptions for a stripped part (length 0 each,
/// per spec.md §4.F).
pub fn newline_exceptions(offsets: &[usize]) -> Vec<ProcessException> {
    offsets
        .iter()
        .map(|&pos| ProcessException {
            pos,
            len: 0,
            kind: ExceptionKind::Newline,
        })
        .collect()
}

/// Merges process exceptions from every source, sorting ascending by
/// position and, for equal positions, keeping only the highest-priority
/// kind (`Url > Generated > Newline`), per spec.md §4.F and §8.
pub fn merge_exceptions(mut exceptions: Vec<ProcessException>) -> Vec<ProcessException> {
    exceptions.sort_by(|a, b| a.pos.cmp(&b.pos).then(b.kind.cmp(&a.kind)));
    exceptions.dedup_by(|a, b| {
        if a.pos == b.pos {
            // `a` is the later element in sort order (lower-or-equal
            // priority than `b`, since we sorted kind descending); keep
            // `b`, the higher-priority one already in the output.
            true
        } else {
            false
        }
    });
    exceptions
}

/// A Unicode script bucket relevant to language tagging (spec.md §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Script {
    Latin,
    Cyrillic,
    Arabic,
    Han,
    Greek,
    Hebrew,
    Common,
    Other,
}

fn script_of(c: char) -> Script {
    match c {
        'A'..='Z' | 'a'..='z' | '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}' => Script::Latin,
        '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}' => Script::Cyrillic,
        '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' => Script::Arabic,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' => Script::Han,
        '\u{0370}'..='\u{03FF}' => Script::Greek,
        '\u{0590}'..='\u{05FF}' => Script::Hebrew,
        '0'..='9' => Script::Common,
        _ => Script::Other,
    }
}

/// Maps a detected script to an ISO language code, per the fixed table in
/// spec.md §4.F. Common/Inherited (and anything undetected) fall back to
/// English.
fn script_language(script: Script) -> &'static str {
    match script {
        Script::Cyrillic => "ru",
        Script::Latin => "en",
        Script::Arabic => "ar",
        Script::Han => "han",
        Script::Greek => "el",
        Script::Hebrew => "he",
        Script::Common | Script::Other => "en",
    }
}

/// Examines the first 32 alphabetic code points of `text`, tallies script
/// occurrences, and returns the majority script plus its language code.
/// Ties are resolved by the table order above (spec.md §4.F); if no
/// alphabetic code point is found, `(Script::Common, "en")` is returned.
pub fn detect_script(text: &str) -> (Script, &'static str) {
    const TABLE_ORDER: [Script; 5] = [
        Script::Cyrillic,
        Script::Latin,
        Script::Arabic,
        Script::Han,
        Script::Greek,
    ];

    let mut tally = [0u32; 5];
    let mut seen = 0;

    for c in text.chars() {
        if !c.is_alphabetic() {
            continue;
        }
        let script = script_of(c);
        if let Some(idx) = TABLE_ORDER.iter().position(|s| *s == script) {
            tally[idx] += 1;
        }
        seen += 1;
        if seen >= 32 {
            break;
        }
    }

    // `max_by_key` would keep the *last* of equally-maximal entries; ties
    // must resolve to the earliest entry in `TABLE_ORDER` instead, so walk
    // the table in order and only displace the leader on a strictly
    // greater count.
    let mut best: Option<(usize, u32)> = None;
    for (idx, &count) in tally.iter().enumerate() {
        if count > 0 && best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((idx, count));
        }
    }

    match best {
        Some((idx, _)) => {
            let script = TABLE_ORDER[idx];
            (script, script_language(script))
        }
        None => (Script::Common, "en"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_crlf_and_records_offsets() {
        let stripped = strip_newlines(b"foo\r\nbar\n", false);
        assert_eq!(stripped.bytes, b"foobar");
        assert_eq!(stripped.newline_offsets, vec![3, 6]);
        assert_eq!(stripped.line_count, 3);
    }

    #[test]
    fn preserves_as_space_in_preformatted_context() {
        let stripped = strip_newlines(b"foo\nbar", true);
        assert_eq!(stripped.bytes, b"foo bar");
    }

    #[test]
    fn length_invariant_holds_for_single_byte_terminators() {
        let input = b"a\nb\nc";
        let stripped = strip_newlines(input, false);
        assert_eq!(
            stripped.bytes.len() + stripped.newline_offsets.len(),
            input.len()
        );
    }

    #[test]
    fn merge_prioritizes_url_over_newline_at_same_position() {
        let exceptions = vec![
            ProcessException { pos: 5, len: 0, kind: ExceptionKind::Newline },
            ProcessException { pos: 5, len: 3, kind: ExceptionKind::Url },
            ProcessException { pos: 1, len: 0, kind: ExceptionKind::Newline },
        ];
        let merged = merge_exceptions(exceptions);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].pos, 1);
        assert_eq!(merged[1].pos, 5);
        assert_eq!(merged[1].kind, ExceptionKind::Url);
    }

    #[test]
    fn merge_is_sorted_ascending() {
        let exceptions = vec![
            ProcessException { pos: 9, len: 0, kind: ExceptionKind::Newline },
            ProcessException { pos: 2, len: 0, kind: ExceptionKind::Newline },
            ProcessException { pos: 5, len: 0, kind: ExceptionKind::Newline },
        ];
        let merged = merge_exceptions(exceptions);
        let positions: Vec<usize> = merged.iter().map(|e| e.pos).collect();
        assert_eq!(positions, vec![2, 5, 9]);
    }

    #[test]
    fn detects_cyrillic_script() {
        let (script, lang) = detect_script("Привет мир");
        assert_eq!(script, Script::Cyrillic);
        assert_eq!(lang, "ru");
    }

    #[test]
    fn detects_latin_script() {
        let (script, lang) = detect_script("hello world");
        assert_eq!(script, Script::Latin);
        assert_eq!(lang, "en");
    }

    #[test]
    fn falls_back_to_english_with_no_alphabetic_chars() {
        let (script, lang) = detect_script("12345 !!!");
        assert_eq!(script, Script::Common);
        assert_eq!(lang, "en");
    }

    #[test]
    fn breaks_ties_by_earliest_table_order() {
        // One Cyrillic letter, one Latin letter: equal tallies, Cyrillic
        // comes first in TABLE_ORDER and must win.
        let (script, lang) = detect_script("Аa");
        assert_eq!(script, Script::Cyrillic);
        assert_eq!(lang, "ru");
    }
}
