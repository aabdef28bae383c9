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

//! Small fixed-size flag sets, used instead of pulling in a bitflags
//! dependency for a handful of closed, single-byte flag sets.

macro_rules! bitflags_u8 {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $bit:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(u8);

        impl $name {
            $($(#[$vmeta])* pub const $variant: $name = $name(1 << $bit);)+

            #[inline]
            pub const fn empty() -> Self {
                $name(0)
            }

            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            #[inline]
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            #[inline]
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }
    };
}

bitflags_u8!(
    /// Per-URL flags (spec.md §3 `Url`).
    UrlFlags {
        /// A scheme was present in the source text (as opposed to a bare
        /// `user@host` or schemeless host).
        SCHEME = 0,
        /// Host canonicalization needed more than a trivial lowercase (IDN
        /// folding, numeric-host decoding, percent-decoding).
        OBFUSCATED = 1,
        /// Reserved for downstream rule engines; never set by this core.
        PHISHED = 2,
    }
);

bitflags_u8!(
    /// Per-part flags (spec.md §3 `MimePart`).
    MimePartFlags {
        TEXT = 0,
        ATTACHMENT = 1,
        BROKEN = 2,
        TRUNCATED = 3,
    }
);

bitflags_u8!(
    /// Per-text-part flags (spec.md §3 `TextPart`).
    TextPartFlags {
        UTF = 0,
        HTML = 1,
        BALANCED = 2,
        EMPTY = 3,
        ATTACHMENT = 4,
    }
);

bitflags_u8!(
    /// Task-scope flags (spec.md §4.I step 6).
    TaskFlags {
        SKIP = 0,
        GTUBE = 1,
    }
);

bitflags_u8!(
    /// Per-`Received`-header flags (spec.md §4.I step 7).
    ReceivedFlags {
        /// Set on the synthetic entry prepended from the observed client IP.
        SYNTHETIC = 0,
    }
);
