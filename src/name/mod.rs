// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of data structures related to domain names.

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

mod error;
mod wire;
pub use error::Error;
pub use wire::{decode_name, encode_name};

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
pub const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
pub const MAX_LABEL_LEN: usize = 63;

/// The maximum number of compression pointers followed while decoding
/// a single name.
pub const MAX_POINTER_HOPS: usize = 20;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A domain name.
///
/// A `Name` stores the uncompressed on-the-wire representation defined
/// in [RFC 1035 § 3.1]: a sequence of length-prefixed labels ending in
/// the null (root) label. Every `Name` is valid by construction: no
/// label exceeds 63 octets, only the last label is null, and the whole
/// representation fits in 255 octets.
///
/// `Name`s are obtained
///
/// * from a sequence of labels with [`Name::from_labels`] (which is
///   [`encode_name`]);
/// * from a possibly compressed name inside a DNS message with
///   [`Name::try_from_compressed`] (which is [`decode_name`]); or
/// * from text through the [`FromStr`] implementation.
///
/// Equality is octet-for-octet, so that a decoded name can be compared
/// exactly with the one that was encoded. Use
/// [`Name::eq_ignore_ascii_case`] for the case-insensitive comparison
/// DNS uses when matching names.
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Name {
    wire_repr: Box<[u8]>,
}

#[allow(clippy::len_without_is_empty)] // See is_root instead.
impl Name {
    /// Returns the name of the DNS root, `.`.
    pub fn root() -> Self {
        Self {
            wire_repr: Box::new([0u8]),
        }
    }

    /// Builds a `Name` from its non-null labels, in order from the
    /// leftmost label. The root label is appended automatically. This
    /// fails if a label is empty or longer than 63 octets, or if the
    /// name would be longer than 255 octets on the wire.
    pub fn from_labels<'a, I>(labels: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        encode_name(labels)
    }

    /// Decodes a possibly compressed name starting at index `start` of
    /// `octets`, which should hold the entire DNS message so that
    /// pointer offsets resolve. Returns the name and the index just
    /// past the octets that the name occupies at `start`.
    pub fn try_from_compressed(octets: &[u8], start: usize) -> Result<(Self, usize), Error> {
        decode_name(octets, start)
    }

    /// Wraps an already-validated on-the-wire representation.
    fn from_wire_unchecked(wire_repr: Box<[u8]>) -> Self {
        debug_assert!(wire_repr.len() <= MAX_WIRE_LEN);
        debug_assert_eq!(wire_repr.last(), Some(&0));
        Self { wire_repr }
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.wire_repr.len() == 1
    }

    /// Returns the number of non-null labels in the `Name`. The root
    /// has zero.
    pub fn len(&self) -> usize {
        self.labels().count()
    }

    /// Returns an iterator over the non-null labels of this `Name`,
    /// leftmost first.
    pub fn labels(&self) -> Labels {
        Labels {
            remaining: &self.wire_repr,
        }
    }

    /// Returns the uncompressed on-the-wire representation of the
    /// `Name`, including the terminating null label.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire_repr
    }

    /// Compares two names the way the DNS does, ignoring ASCII case
    /// (RFC 4343).
    pub fn eq_ignore_ascii_case(&self, other: &Name) -> bool {
        self.wire_repr.eq_ignore_ascii_case(&other.wire_repr)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels() {
            for octet in label {
                match *octet {
                    b'.' => f.write_str("\\.")?,
                    b'\\' => f.write_str("\\\\")?,
                    o if o.is_ascii_graphic() => write!(f, "{}", o as char)?,
                    o => write!(f, "\\{:03}", o)?,
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the non-null labels of a [`Name`], created by
/// [`Name::labels`].
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.remaining.first()? as usize;
        if len == 0 {
            self.remaining = &[];
            None
        } else {
            let label = &self.remaining[1..1 + len];
            self.remaining = &self.remaining[1 + len..];
            Some(label)
        }
    }
}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Parses a dotted domain name such as `F.ISI.ARPA` or `example.com.`.
/// The trailing dot is optional, and `.` alone is the root. The string
/// must be ASCII; the escape sequences of [RFC 4343 § 2.1] (`\.`, `\\`,
/// and `\DDD`) are supported.
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if s == "." {
            return Ok(Self::root());
        } else if !s.is_ascii() {
            return Err(Error::StrNotAscii);
        }

        let mut labels: Vec<Vec<u8>> = Vec::new();
        let mut current = Vec::new();
        let mut remaining = s.as_bytes();
        while let Some(&octet) = remaining.first() {
            match octet {
                b'\\' => {
                    let (value, consumed) = parse_escape(&remaining[1..])?;
                    current.push(value);
                    remaining = &remaining[consumed + 1..];
                }
                b'.' => {
                    if current.is_empty() {
                        return Err(Error::NullNonTerminal);
                    }
                    labels.push(std::mem::take(&mut current));
                    remaining = &remaining[1..];
                }
                _ => {
                    current.push(octet);
                    remaining = &remaining[1..];
                }
            }
            if current.len() > MAX_LABEL_LEN {
                return Err(Error::LabelTooLong);
            }
        }
        if !current.is_empty() {
            labels.push(current);
        }

        encode_name(labels.iter().map(Vec::as_slice))
    }
}

/// Parses an escape sequence. We expect `remaining` to start with the
/// octet immediately *after* the backslash that introduces it.
fn parse_escape(remaining: &[u8]) -> Result<(u8, usize), Error> {
    match remaining {
        [] => Err(Error::InvalidEscape),
        [d0, d1, d2, ..]
            if d0.is_ascii_digit() && d1.is_ascii_digit() && d2.is_ascii_digit() =>
        {
            let value =
                100 * (d0 - b'0') as usize + 10 * (d1 - b'0') as usize + (d2 - b'0') as usize;
            u8::try_from(value)
                .map(|v| (v, 3))
                .or(Err(Error::InvalidEscape))
        }
        [d0, ..] if d0.is_ascii_digit() => Err(Error::InvalidEscape),
        [other, ..] => Ok((*other, 1)),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
