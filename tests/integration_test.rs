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

//! End-to-end scenarios driving the full `Task::parse` pipeline, one raw
//! message in, one `Task` out. Per-component behavior (URL canonicalization
//! edge cases, header folding, MIME boundary scanning, ...) already has
//! dedicated coverage in each module's own `#[cfg(test)]` block; this suite
//! only exercises paths that cross several components at once.

use msgcore::config::{Config, NullOracle};
use msgcore::digest::FnvDigestHasher;
use msgcore::flags::{TaskFlags, TextPartFlags};
use msgcore::task::{Action, Task};
use msgcore::url::parse_url;

fn parse(raw: &[u8]) -> Task {
    let config = Config::default();
    Task::parse::<FnvDigestHasher>(raw, &config, &NullOracle, &NullOracle, &NullOracle, None, None)
        .unwrap()
}

#[test]
fn bare_host_url() {
    let url = parse_url("test.com").unwrap();
    assert_eq!(url.host, "test.com");
    assert!(url.user.is_none());
}

#[test]
fn mailto_url() {
    let url = parse_url("mailto:A.User@example.com text").unwrap();
    assert_eq!(url.host, "example.com");
    assert_eq!(url.user.as_deref(), Some("A.User"));
}

#[test]
fn idn_url_is_lowercased() {
    let url = parse_url("http://Тест.Рф:18 text").unwrap();
    assert_eq!(url.host, "тест.рф");
}

#[test]
fn ipv6_embedded_ipv4_with_fragment() {
    let url = parse_url("http:/\\[::eeee:192.168.0.1]/#test").unwrap();
    assert_eq!(url.host, "::eeee:c0a8:1");
    assert_eq!(url.fragment.as_deref(), Some("test"));
}

#[test]
fn percent_encoded_ipv4_host() {
    let url = parse_url("http:\\\\%30%78%63%30%2e%30%32%35%30.01").unwrap();
    assert_eq!(url.host, "192.168.0.1");
}

#[test]
fn bracketed_dns_name_is_rejected() {
    assert!(parse_url("http://[www.google.com]/").is_err());
}

#[test]
fn two_alternative_text_parts_yield_calibrated_similarity() {
    let raw = b"Content-Type: multipart/alternative; boundary=\"B\"\r\n\r\n\
--B\r\nContent-Type: text/plain\r\n\r\nhello world foo\r\n\
--B\r\nContent-Type: text/plain\r\n\r\nhello world bar\r\n--B--\r\n";
    let task = parse(raw);
    assert_eq!(task.total_words, Some(6));
    assert_eq!(task.parts_distance, Some(2));
    assert!((task.parts_ratio.unwrap() - (2.0 / 6.0)).abs() < 1e-9);
}

#[test]
fn gtube_pattern_rejects_the_task() {
    let raw = format!(
        "Content-Type: text/plain\r\n\r\n{}",
        "XJS*C4JDBQADN1.NSBN3*2IDNEN*GTUBE-STANDARD-ANTI-UBE-TEST-EMAIL*C.34X"
    );
    let task = parse(raw.as_bytes());
    assert!(task.flags.contains(TaskFlags::GTUBE));
    assert!(task.flags.contains(TaskFlags::SKIP));
    assert_eq!(task.verdict.action, Action::Reject);
}

#[test]
fn full_message_pipeline() {
    let input = br#"From Art Vandelay Sat Jan  3 01:05:34 1996
From: "Art Vandelay" <art@vandelay.com> (Vandelay Industries)
To: "Colleagues": "James Smythe" <james@vandelay.com>; Friends:
    jane@example.com, =?UTF-8?Q?John_Sm=C3=AEth?= <john@example.com>;
Return-Path: <art@vandelay.com>
Received: from mail.example.com ([192.0.2.1]) by mx.vandelay.com with ESMTP; Sat, 20 Nov 2021 14:22:01 -0800
Subject: Why not both importing AND exporting? Check http://example.com/deal
Content-Type: multipart/mixed; boundary="festivus"

--festivus
Content-Type: text/html; charset="us-ascii"
Content-Transfer-Encoding: base64

PGh0bWw+PHA+SSB3YXMgdGhpbmtpbmcgYWJvdXQgcXVpdHRpbmcgdGhlICZsZHF1bztle
HBvcnRpbmcmcmRxdW87IHRvIGZvY3VzIGp1c3Qgb24gdGhlICZsZHF1bztpbXBvcnRpbm
cmcmRxdW87LDwvcD48cD5idXQgdGhlbiBJIHRob3VnaHQsIHdoeSBub3QgZG8gYm90aD8
gJiN4MjYzQTs8L3A+PC9odG1sPg==
--festivus--
"#;

    let task = parse(input);

    assert_eq!(
        task.subject.as_deref(),
        Some("Why not both importing AND exporting? Check http://example.com/deal")
    );
    assert_eq!(task.envelope_from.as_deref(), Some("art@vandelay.com"));
    assert_eq!(task.from.len(), 1);
    assert_eq!(task.from[0].address, "art@vandelay.com");

    assert_eq!(task.recipients.len(), 3);
    assert_eq!(task.recipients[0].address, "james@vandelay.com");
    assert_eq!(task.recipients[1].address, "jane@example.com");
    assert_eq!(task.recipients[2].name.as_deref(), Some("John Smîth"));

    assert_eq!(task.received.len(), 1);
    assert_eq!(
        task.received[0].real_ip,
        Some("192.0.2.1".parse().unwrap())
    );

    assert_eq!(task.mime_parts.len(), 2);
    assert_eq!(task.text_parts.len(), 1);
    assert!(task.text_parts[0].flags.contains(TextPartFlags::HTML));
    assert!(task.text_parts[0].content.contains("importing"));

    assert_eq!(task.urls.len(), 1);
    assert_eq!(task.urls[0].host, "example.com");

    assert_eq!(task.verdict.action, Action::None);
    assert!(!task.flags.contains(TaskFlags::GTUBE));
}

#[test]
fn raw_fallback_rejected_without_permission() {
    let config = Config {
        allow_raw_input: false,
        ..Config::default()
    };
    let result =
        Task::parse::<FnvDigestHasher>(b"", &config, &NullOracle, &NullOracle, &NullOracle, None, None);
    assert!(result.is_err());
}

#[test]
fn digest_is_stable_across_identical_parses() {
    let raw = b"Subject: hi\r\n\r\nrepeatable body\r\n";
    let a = parse(raw);
    let b = parse(raw);
    assert_eq!(a.digest, b.digest);
    assert_eq!(a.message_id, b.message_id);
}
