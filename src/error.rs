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

use thiserror::Error;

/// The core's error taxonomy (spec.md §7).
///
/// Every variant but [`Error::ConfigForbidsRaw`] is recoverable: the affected
/// part is flagged and parsing continues. Only `ConfigForbidsRaw` is ever
/// surfaced as an `Err` from [`crate::task::Task::parse`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed input at byte {offset}: {reason}")]
    MalformedInput {
        offset: usize,
        reason: &'static str,
    },

    #[error("truncated input at byte {offset}")]
    Truncation { offset: usize },

    #[error("unsupported encoding {name:?} at byte {offset}")]
    UnsupportedEncoding { offset: usize, name: String },

    #[error("resource limit exceeded at byte {offset}: {reason}")]
    ResourceLimit {
        offset: usize,
        reason: &'static str,
    },

    #[error("MIME parse failed and configuration forbids raw input")]
    ConfigForbidsRaw,
}

pub type Result<T> = std::result::Result<T, Error>;
