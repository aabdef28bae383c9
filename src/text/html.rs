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

//! Minimal HTML-aware text extraction (spec.md §4.F). Strips tags and
//! decodes the handful of named/numeric entities that show up in spam
//! corpora, tracking whether the cursor is inside a `<pre>` element so the
//! caller can preserve its newlines as spaces rather than stripping them.

#[derive(PartialEq, Eq)]
enum State {
    Text,
    TagName,
    InTag,
    Comment,
}

/// Extracted plain text plus a parallel flag per output byte marking
/// whether it originated inside a `<pre>` element.
pub struct ExtractedText {
    pub text: String,
    pub in_preformatted: Vec<bool>,
}

/// Strips HTML markup from `input`, decoding entities and dropping
/// `<script>`/`<style>` contents entirely (never useful tokenizer input).
pub fn extract_text(input: &str) -> ExtractedText {
    let mut out = String::with_capacity(input.len());
    let mut in_pre = Vec::with_capacity(input.len());
    let mut state = State::Text;
    let mut tag_name = String::new();
    let mut pre_depth: u32 = 0;
    let mut skip_depth: u32 = 0;
    let mut current_tag_closing = false;

    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match state {
            State::Text => {
                if c == '<' {
                    if chars[i..].iter().collect::<String>().starts_with("<!--") {
                        state = State::Comment;
                        i += 4;
                        continue;
                    }
                    state = State::TagName;
                    tag_name.clear();
                    current_tag_closing = false;
                    i += 1;
                    if chars.get(i) == Some(&'/') {
                        current_tag_closing = true;
                        i += 1;
                    }
                    continue;
                }
                if c == '&' {
                    if let Some((decoded, consumed)) = decode_entity(&chars[i..]) {
                        if skip_depth == 0 {
                            out.push_str(&decoded);
                            for _ in decoded.chars() {
                                in_pre.push(pre_depth > 0);
                            }
                        }
                        i += consumed;
                        continue;
                    }
                }
                if skip_depth == 0 {
                    out.push(c);
                    in_pre.push(pre_depth > 0);
                }
                i += 1;
            }
            State::TagName => {
                if c.is_ascii_alphanumeric() || c == '-' {
                    tag_name.push(c);
                    i += 1;
                } else {
                    state = State::InTag;
                }
            }
            State::InTag => {
                if c == '>' {
                    let name = tag_name.to_ascii_lowercase();
                    apply_tag(&name, current_tag_closing, &mut pre_depth, &mut skip_depth);
                    state = State::Text;
                }
                i += 1;
            }
            State::Comment => {
                if chars[i..].iter().collect::<String>().starts_with("-->") {
                    state = State::Text;
                    i += 3;
                } else {
                    i += 1;
                }
            }
        }
    }

    ExtractedText {
        text: out,
        in_preformatted: in_pre,
    }
}

fn apply_tag(name: &str, closing: bool, pre_depth: &mut u32, skip_depth: &mut u32) {
    match name {
        "pre" => {
            if closing {
                *pre_depth = pre_depth.saturating_sub(1);
            } else {
                *pre_depth += 1;
            }
        }
        "script" | "style" => {
            if closing {
                *skip_depth = skip_depth.saturating_sub(1);
            } else {
                *skip_depth += 1;
            }
        }
        "br" if !closing => {
            // Treated as ordinary text boundary; no special handling
            // needed since callers already split on their own newlines.
        }
        _ => {}
    }
}

fn decode_entity(rest: &[char]) -> Option<(String, usize)> {
    let end = rest.iter().take(10).position(|&c| c == ';')?;
    let body: String = rest[1..end].iter().collect();
    let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        char::from_u32(u32::from_str_radix(hex, 16).ok()?)?
    } else if let Some(dec) = body.strip_prefix('#') {
        char::from_u32(dec.parse().ok()?)?
    } else {
        match body.as_str() {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{00A0}',
            _ => return None,
        }
    };
    Some((decoded.to_string(), end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_tags() {
        let out = extract_text("<p>hello <b>world</b></p>");
        assert_eq!(out.text, "hello world");
    }

    #[test]
    fn decodes_named_entities() {
        let out = extract_text("Tom &amp; Jerry &lt;3&gt;");
        assert_eq!(out.text, "Tom & Jerry <3>");
    }

    #[test]
    fn decodes_numeric_entity() {
        let out = extract_text("&#65;&#x42;");
        assert_eq!(out.text, "AB");
    }

    #[test]
    fn drops_script_and_style_contents() {
        let out = extract_text("a<script>alert(1)</script>b<style>.c{}</style>d");
        assert_eq!(out.text, "abd");
    }

    #[test]
    fn tracks_preformatted_context() {
        let out = extract_text("x<pre>y</pre>z");
        let y_index = out.text.find('y').unwrap();
        assert!(out.in_preformatted[y_index]);
        let x_index = out.text.find('x').unwrap();
        assert!(!out.in_preformatted[x_index]);
    }

    #[test]
    fn strips_html_comments() {
        let out = extract_text("a<!-- comment -->b");
        assert_eq!(out.text, "ab");
    }
}
