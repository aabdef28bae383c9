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

//! # msgcore
//!
//! A best-effort RFC 5322/MIME message parser built around a single
//! normalized [`Task`](task::Task): given a raw message, `Task::parse`
//! produces its MIME part tree, decoded and tokenized text parts, parsed
//! `Received` chain, envelope/address data, extracted URLs, and a
//! deduplication digest, in one orchestrated pass (see [`task`]).
//!
//! In keeping with Postel's law, every stage is best-effort: malformed
//! input degrades gracefully (a truncated MIME tree, a flagged-but-kept
//! part, a fallback `"undef"` message-id) rather than aborting the whole
//! parse. The only hard failure is [`error::Error::ConfigForbidsRaw`] —
//! structurally unparseable input with raw fallback disabled.
//!
//! ## Usage example
//!
//! ```
//! use msgcore::config::{Config, NullOracle};
//! use msgcore::digest::FnvDigestHasher;
//! use msgcore::task::Task;
//!
//! let input = b"From: Art Vandelay <art@vandelay.com>\r\n\
//! To: jane@example.com\r\n\
//! Subject: Re: quitting the import business\r\n\
//! Content-Type: text/plain\r\n\r\n\
//! See you at the office.\r\n";
//!
//! let config = Config::default();
//! let task = Task::parse::<FnvDigestHasher>(
//!     input,
//!     &config,
//!     &NullOracle,
//!     &NullOracle,
//!     &NullOracle,
//!     None,
//!     None,
//! )
//! .unwrap();
//!
//! assert_eq!(task.subject.as_deref(), Some("Re: quitting the import business"));
//! assert_eq!(task.from[0].address, "art@vandelay.com");
//! ```

pub mod address;
pub mod arena;
pub mod config;
pub mod decode;
pub mod digest;
pub mod error;
pub mod flags;
pub mod header;
pub mod mailbox;
pub mod mime;
pub mod received;
pub mod similarity;
pub mod task;
pub mod text;
pub mod token;
pub mod url;

pub use address::Address;
pub use config::Config;
pub use error::{Error, Result};
pub use mime::MimePart;
pub use received::ReceivedHeader;
pub use task::{Action, Task, TextPart, Verdict};
pub use url::Url;
