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

//! The orchestrator (spec.md §4.I): the one entrypoint that drives every
//! other component over a raw message and produces a [`Task`].

use std::collections::HashMap;
use std::net::IpAddr;

use crate::address::{self, Address};
use crate::config::{Config, ContentTypeOracle, StemmerOracle, TldLookup};
use crate::decode::{self, Encoding};
use crate::digest::{Digest, StreamHasher};
use crate::error::{Error, Result};
use crate::flags::{MimePartFlags, ReceivedFlags, TaskFlags, TextPartFlags};
use crate::header::Headers;
use crate::mailbox::mbox::skip_envelope_line;
use crate::mime::{self, content_type::parse_content_type, MimePart};
use crate::received::{self, ReceivedHeader};
use crate::similarity;
use crate::text::{self, ProcessException, Script, StrippedContent};
use crate::token;
use crate::url::{self, Url};

/// The GTUBE anti-UBE test pattern (spec.md §4.I step 6, GLOSSARY).
const GTUBE_PATTERN: &str =
    "XJS*C4JDBQADN1.NSBN3*2IDNEN*GTUBE-STANDARD-ANTI-UBE-TEST-EMAIL*C.34X";
/// Only text parts at or under this size are scanned for the GTUBE pattern.
const GTUBE_MAX_SCAN: usize = 4096;

/// A disposition the orchestrator may attach to a task before downstream
/// rules run (spec.md §4.I step 6 is the only producer today).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    #[default]
    None,
    Reject,
}

/// A pre-result verdict (spec.md §3 `Task`: "a pre-result verdict").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Verdict {
    pub action: Action,
    pub message: Option<String>,
}

/// Back-reference to the owning [`MimePart`] plus everything the text
/// normalization pipeline produced for it (spec.md §3 `TextPart`). The
/// teacher's data model keeps an HTML parse tree alongside the extracted
/// text; this core's hand-rolled extractor (spec.md §4.F) never builds one,
/// so only the flattened plain-text view survives here.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextPart {
    pub mime_part: usize,
    pub raw_start: usize,
    pub raw_end: usize,
    pub decoded_start: usize,
    pub decoded_end: usize,
    pub content: String,
    pub newline_offsets: Vec<usize>,
    pub exceptions: Vec<ProcessException>,
    pub script: Script,
    pub language: &'static str,
    pub tokens: Vec<String>,
    pub hashes: Vec<u64>,
    pub flags: TextPartFlags,
}

/// The root entity scoped to one message (spec.md §3 `Task`).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Task {
    pub raw: Vec<u8>,
    pub message_id: String,
    pub queue_id: Option<String>,
    pub subject: Option<String>,
    pub envelope_from: Option<String>,
    pub delivered_to: Option<String>,
    pub recipients: Vec<Address>,
    pub from: Vec<Address>,
    pub source_ip: Option<IpAddr>,
    pub headers: Headers,
    pub mime_parts: Vec<MimePart>,
    pub text_parts: Vec<TextPart>,
    pub received: Vec<ReceivedHeader>,
    pub urls: Vec<Url<'static>>,
    pub digest: Digest,
    pub verdict: Verdict,
    pub flags: TaskFlags,
    pub scratch: HashMap<String, String>,
    /// Raw Levenshtein distance between the two alternative text parts'
    /// token-hash sequences, when exactly two exist (spec.md §4.H, §4.I
    /// step 10).
    pub parts_distance: Option<u32>,
    /// `parts_distance / total_words`, the calibrated normalized ratio.
    pub parts_ratio: Option<f64>,
    /// Combined token count of both alternative text parts.
    pub total_words: Option<usize>,
}

impl Task {
    /// Parses `raw` into a [`Task`], driving every component in spec.md
    /// §4.I's order. `client_ip` is the observed connecting peer's address,
    /// if the caller has one (step 7); `queue_id` is the MTA-assigned queue
    /// identifier, if any — like `client_ip` it arrives out-of-band
    /// alongside the message bytes rather than being derivable from them
    /// (spec.md §3: "derived ... queue-id"); `H` is the caller-supplied
    /// digest stream hasher (spec.md §1: cryptographic hash construction is
    /// an external collaborator).
    pub fn parse<H: StreamHasher>(
        raw: &[u8],
        config: &Config,
        content_type_oracle: &dyn ContentTypeOracle,
        stemmer: &dyn StemmerOracle,
        tld_lookup: &dyn TldLookup,
        client_ip: Option<IpAddr>,
        queue_id: Option<&str>,
    ) -> Result<Task> {
        // Step 1: mbox envelope line.
        let body_offset = skip_envelope_line(raw);
        let message = &raw[body_offset..];

        // Step 2: MIME structure, with raw-input fallback.
        let mut mime_parts = if message.is_empty() {
            if config.allow_raw_input {
                let sniffed = content_type_oracle
                    .sniff(message)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                log::debug!("empty message after envelope skip, falling back to raw sniff as {sniffed}");
                vec![synth_part(&sniffed)]
            } else {
                log::warn!("empty message after envelope skip and raw input is forbidden");
                return Err(Error::ConfigForbidsRaw);
            }
        } else {
            mime::parse_mime(message, config)
        };

        for (idx, part) in mime_parts.iter().enumerate() {
            if part.flags.contains(MimePartFlags::BROKEN) {
                log::debug!("mime part {idx} is broken, continuing with the bytes it has");
            }
            if part.flags.contains(MimePartFlags::TRUNCATED) {
                log::debug!("mime part {idx} is truncated mid-boundary");
            }
        }

        let headers = mime_parts[0].headers.clone();

        // Step 3: message-id.
        let message_id = headers
            .first_value("Message-ID")
            .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "undef".to_string());

        // Step 4: subject.
        let subject = headers.first_value("Subject").map(|s| s.to_string());

        // Steps 5 & 6: per-part text normalization, GTUBE scan, and (as
        // part of MIME structure digesting, spec.md §4.D) per-part digest
        // computation — every part is decoded once and its decoded bytes
        // feed both the digest and, for text parts, the normalizer.
        let mut text_parts = Vec::new();
        let mut urls = Vec::new();
        let mut task_flags = TaskFlags::empty();
        let mut verdict = Verdict::default();
        let mut scratch = HashMap::new();

        for idx in 0..mime_parts.len() {
            let cte_label = mime_parts[idx]
                .headers
                .first_value("Content-Transfer-Encoding")
                .unwrap_or("7bit")
                .to_string();
            let encoding = Encoding::from_label(&cte_label).unwrap_or_else(|| {
                log::debug!("unsupported content-transfer-encoding {cte_label:?}, treating part {idx} as 8bit");
                Encoding::EightBit
            });
            let body = mime_parts[idx].body(message).to_vec();
            let decoded = decode::decode_transfer_encoding(encoding, &body);

            let mut part_hasher = H::default();
            part_hasher.update(&decoded);
            mime_parts[idx].digest = part_hasher.finish();

            let content_type = mime_parts[idx].content_type.clone();
            let part_flags = mime_parts[idx].flags;
            let is_attachment = part_flags.contains(MimePartFlags::ATTACHMENT);

            if !content_type.is_text() || (is_attachment && !config.check_text_attachments) {
                continue;
            }

            let charset = content_type.attribute("charset").unwrap_or("us-ascii").to_string();
            let (decoded_text, is_utf) = decode::decode_charset(&charset, &decoded);

            if decoded_text.len() <= GTUBE_MAX_SCAN && decoded_text.contains(GTUBE_PATTERN) {
                log::info!("gtube pattern matched in part {idx}, rejecting task");
                task_flags |= TaskFlags::SKIP | TaskFlags::GTUBE;
                verdict = Verdict {
                    action: Action::Reject,
                    message: Some("Gtube pattern".to_string()),
                };
                scratch.insert("GTUBE".to_string(), "1".to_string());
            }

            let is_html = content_type.c_subtype.as_deref() == Some("html");
            let (content_str, newline_offsets, mut exceptions) = if is_html {
                let extracted = text::html::extract_text(&decoded_text);
                let stripped = strip_with_preformatted(&extracted.text, &extracted.in_preformatted);
                (
                    String::from_utf8(stripped.bytes).unwrap_or_default(),
                    stripped.newline_offsets,
                    text::newline_exceptions(&stripped.newline_offsets),
                )
            } else {
                let stripped = text::strip_newlines(decoded_text.as_bytes(), false);
                (
                    String::from_utf8(stripped.bytes).unwrap_or_default(),
                    stripped.newline_offsets,
                    text::newline_exceptions(&stripped.newline_offsets),
                )
            };

            let url_hits = url::extract::scan_text_for_urls(&content_str);
            for (exc, _) in &url_hits {
                exceptions.push(*exc);
            }
            let merged = text::merge_exceptions(exceptions);

            let (script, language) = text::detect_script(&content_str);
            let tokens = token::tokenize(&content_str, &merged, is_utf, language, stemmer);

            let mut flags = TextPartFlags::empty();
            if is_utf {
                flags |= TextPartFlags::UTF;
            }
            if is_html {
                flags |= TextPartFlags::HTML;
            }
            if is_attachment {
                flags |= TextPartFlags::ATTACHMENT;
            }
            if content_str.trim().is_empty() {
                flags |= TextPartFlags::EMPTY;
            }
            let balanced = if is_html {
                decoded_text.matches('<').count() == decoded_text.matches('>').count()
            } else {
                true
            };
            if balanced {
                flags |= TextPartFlags::BALANCED;
            }

            for (_, found) in url_hits {
                urls.push(found);
            }

            text_parts.push(TextPart {
                mime_part: idx,
                raw_start: mime_parts[idx].raw_start,
                raw_end: mime_parts[idx].raw_end,
                decoded_start: mime_parts[idx].parsed_start,
                decoded_end: mime_parts[idx].parsed_end,
                content: content_str,
                newline_offsets,
                exceptions: merged,
                script,
                language,
                tokens: tokens.words,
                hashes: tokens.hashes,
                flags,
            });
        }

        // Step 7: Received chain.
        let mut received = Vec::new();
        let mut source_ip = client_ip;
        if !config.ignore_received {
            for record in headers.by_name("Received") {
                received.push(received::parse_received(&record.value));
            }

            if let Some(ip) = client_ip {
                let mismatch = received
                    .first()
                    .map(|r| r.real_ip != Some(ip))
                    .unwrap_or(true);
                if mismatch {
                    let mut synthetic = ReceivedHeader::default();
                    synthetic.real_ip = Some(ip);
                    synthetic.flags |= ReceivedFlags::SYNTHETIC;
                    received.insert(0, synthetic);
                }
            } else if let Some(first) = received.first() {
                source_ip = first.real_ip;
            }
        }

        // Step 8: envelope-from, Delivered-To, recipient/sender assembly.
        let envelope_from = headers.first_value("Return-Path").map(|v| {
            v.trim().trim_start_matches('<').trim_end_matches('>').to_string()
        });
        let delivered_to = headers.first_value("Delivered-To").map(|s| s.to_string());

        let mut recipients = Vec::new();
        for field in ["To", "Cc", "Bcc"] {
            for record in headers.by_name(field) {
                recipients.extend(address::parse_address_list(&record.value));
            }
        }
        let mut from = Vec::new();
        for record in headers.by_name("From") {
            from.extend(address::parse_address_list(&record.value));
        }

        // Step 9: URLs from every Subject header.
        for record in headers.by_name("Subject") {
            for (_, found) in url::extract::scan_text_for_urls(&record.value) {
                urls.push(found);
            }
        }
        for url in &mut urls {
            if url.tld.is_none() {
                if let Some(suffix) = tld_lookup.registrable_suffix(&leak_host(&url.host)) {
                    url.tld = Some(std::borrow::Cow::Owned(suffix.to_string()));
                }
            }
        }

        // Step 10: two-part similarity under a shared multipart/alternative
        // parent.
        let mut parts_distance = None;
        let mut parts_ratio = None;
        let mut total_words = None;
        let mut by_parent: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
        for (ti, tp) in text_parts.iter().enumerate() {
            by_parent.entry(mime_parts[tp.mime_part].parent).or_default().push(ti);
        }
        for (parent, idxs) in &by_parent {
            if idxs.len() != 2 {
                continue;
            }
            let Some(parent_idx) = parent else { continue };
            let parent_part = &mime_parts[*parent_idx];
            if !parent_part.content_type.is_multipart()
                || parent_part.content_type.c_subtype.as_deref() != Some("alternative")
            {
                continue;
            }
            let a = &text_parts[idxs[0]];
            let b = &text_parts[idxs[1]];
            // Open question (spec.md §9): preserved as-is — a part
            // sanitized to empty short-circuits similarity even though it
            // still technically exists.
            if a.flags.contains(TextPartFlags::EMPTY) || b.flags.contains(TextPartFlags::EMPTY) {
                continue;
            }
            if let Some(sim) = similarity::compute_similarity(&a.hashes, &b.hashes) {
                parts_distance = Some(sim.distance);
                parts_ratio = Some(sim.ratio);
                total_words = Some(a.hashes.len() + b.hashes.len());
            }
        }

        // Step 11: task-scope digest accumulation.
        let mut task_hasher = H::default();
        for part in &mime_parts {
            task_hasher.update(&part.digest);
        }
        let digest = task_hasher.finish();

        Ok(Task {
            raw: raw.to_vec(),
            message_id,
            queue_id: queue_id.map(|s| s.to_string()),
            subject,
            envelope_from,
            delivered_to,
            recipients,
            from,
            source_ip,
            headers,
            mime_parts,
            text_parts,
            received,
            urls,
            digest,
            verdict,
            flags: task_flags,
            scratch,
            parts_distance,
            parts_ratio,
            total_words,
        })
    }
}

fn synth_part(content_type_str: &str) -> MimePart {
    let content_type = parse_content_type(content_type_str);
    let mut flags = MimePartFlags::empty();
    if content_type.is_text() {
        flags |= MimePartFlags::TEXT;
    }
    MimePart {
        raw_start: 0,
        raw_end: 0,
        parsed_start: 0,
        parsed_end: 0,
        content_type,
        content_disposition: None,
        headers: Headers::new(),
        parent: None,
        children: Vec::new(),
        digest: [0u8; 16],
        flags,
    }
}

/// `TldLookup` takes a borrowed host and returns a borrowed suffix; since
/// `Url::tld` must outlive this call, copy the suffix out immediately
/// rather than holding the borrow. This helper exists only to give the
/// borrow checker a value with the right shape to pass in.
fn leak_host(host: &str) -> String {
    host.to_string()
}

fn strip_with_preformatted(text: &str, in_pre: &[bool]) -> StrippedContent {
    let mut bytes = Vec::with_capacity(text.len());
    let mut newline_offsets = Vec::new();
    let mut line_count = 1;

    for (i, ch) in text.chars().enumerate() {
        if ch == '\r' || ch == '\n' {
            let preserve = in_pre.get(i).copied().unwrap_or(false);
            if preserve {
                bytes.push(b' ');
            }
            newline_offsets.push(bytes.len());
            line_count += 1;
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
    }

    StrippedContent {
        bytes,
        newline_offsets,
        line_count,
    }
}
