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

//! Mbox envelope handling (spec.md §4.I step 1). The teacher's original
//! `MessageIterator` walked a whole mbox file message-by-message; this
//! core only ever sees one message at a time, so the piece it actually
//! needs is `skip_envelope_line`, which detects and skips a single
//! leading `From `-quoted envelope line. The full mailbox iterator is
//! kept alongside it (generalized to not depend on the crate's removed
//! RFC5322 `DateTime` type) since a caller feeding this core from a real
//! mbox file still needs to split it into individual messages first.

use std::io::{BufRead, BufReader, Read};

/// If `input` begins with an mbox `From `-quoted envelope line (optionally
/// after leading whitespace), returns the byte offset of the first byte
/// following that line and any further leading whitespace. Otherwise
/// returns 0.
pub fn skip_envelope_line(input: &[u8]) -> usize {
    let trimmed_start = input
        .iter()
        .position(|&b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());

    let rest = &input[trimmed_start..];
    if !rest.starts_with(b"From ") {
        return 0;
    }

    let line_end = match rest.iter().position(|&b| b == b'\n') {
        Some(idx) => trimmed_start + idx + 1,
        None => return 0,
    };

    let mut pos = line_end;
    while pos < input.len() && input[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Parses an Mbox mailbox from a `Read` stream, returning each message's
/// raw bytes and `From ` envelope sender.
pub struct MessageIterator<T: Read> {
    reader: BufReader<T>,
    message: Option<Message>,
}

/// Mbox message contents and envelope sender.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message {
    from: String,
    contents: Vec<u8>,
}

#[derive(Debug)]
pub struct ParseError {}

impl<T> MessageIterator<T>
where
    T: Read,
{
    pub fn new(reader: T) -> MessageIterator<T> {
        MessageIterator {
            reader: BufReader::new(reader),
            message: None,
        }
    }
}

impl<T> Iterator for MessageIterator<T>
where
    T: Read,
{
    type Item = Result<Message, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut message_line = Vec::with_capacity(80);

        loop {
            match self.reader.read_until(b'\n', &mut message_line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(_) => return Some(Err(ParseError {})),
            }

            let is_from = message_line
                .get(..5)
                .map(|line| line == b"From ")
                .unwrap_or(false);

            if let Some(message) = &mut self.message {
                if !is_from {
                    if message_line[0] != b'>' {
                        message.contents.append(&mut message_line);
                    } else if message_line
                        .iter()
                        .skip_while(|&&ch| ch == b'>')
                        .take(5)
                        .copied()
                        .collect::<Vec<u8>>()
                        == b"From "
                    {
                        message.contents.extend_from_slice(&message_line[1..]);
                        message_line.clear();
                    } else {
                        message.contents.append(&mut message_line);
                    }
                } else {
                    let finished = self.message.take().map(Ok);
                    self.message =
                        Message::new(std::str::from_utf8(&message_line).unwrap_or("")).into();
                    return finished;
                }
            } else {
                if is_from {
                    self.message =
                        Message::new(std::str::from_utf8(&message_line).unwrap_or("")).into();
                }
                message_line.clear();
            }
        }

        self.message.take().map(Ok)
    }
}

impl Message {
    fn new(hdr: &str) -> Self {
        let from = hdr
            .strip_prefix("From ")
            .and_then(|hdr| hdr.split_once(' '))
            .map(|(from, _date)| from.trim().to_string())
            .unwrap_or_default();

        Self {
            from,
            contents: Vec::with_capacity(1024),
        }
    }

    /// Returns the message sender address from the envelope line.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Returns the message contents.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Unwraps the message contents.
    pub fn unwrap_contents(self) -> Vec<u8> {
        self.contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_leading_from_line() {
        let input = b"From god@heaven.af.mil Sat Jan  3 01:05:34 1996\nSubject: hi\n\nbody";
        let offset = skip_envelope_line(input);
        assert_eq!(&input[offset..], b"Subject: hi\n\nbody");
    }

    #[test]
    fn no_envelope_line_skips_nothing() {
        let input = b"Subject: hi\n\nbody";
        assert_eq!(skip_envelope_line(input), 0);
    }

    #[test]
    fn skips_whitespace_after_envelope_line() {
        let input = b"From a@b.com Mon Jan 1 00:00:00 2020\n\n\nSubject: hi\n";
        let offset = skip_envelope_line(input);
        assert_eq!(&input[offset..], b"Subject: hi\n");
    }

    #[test]
    fn parse_mbox_messages() {
        let message = br#"From god@heaven.af.mil Sat Jan  3 01:05:34 1996
Message 1

From cras@irccrew.org  Tue Jul 23 19:39:23 2002
Message 2
>From hello
"#;

        let parser = MessageIterator::new(&message[..]);
        let messages: Vec<Message> = parser.map(|m| m.unwrap()).collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].from(), "god@heaven.af.mil");
        assert_eq!(messages[0].contents(), b"Message 1\n\n");
        assert_eq!(messages[1].from(), "cras@irccrew.org");
        assert_eq!(messages[1].contents(), b"Message 2\nFrom hello\n");
    }
}
