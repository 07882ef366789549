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

//! Implementation of the [`Reader`] type to read on-the-wire DNS
//! messages.

use std::fmt;

use super::constants::*;
use super::header::{decode_header, Header};
use super::{Answer, Question};
use crate::name::{self, decode_name};
use crate::rr::Type;

////////////////////////////////////////////////////////////////////////
// READER                                                             //
////////////////////////////////////////////////////////////////////////

/// A "frame" around a buffer containing a DNS message that enables
/// reading the message data.
///
/// A `Reader` is constructed using its [`TryFrom`] implementation. Any
/// underlying buffer for a reader must contain at least a full DNS
/// message header of 12 octets; otherwise the construction will fail.
/// The header is decoded up front and is available through
/// [`Reader::header`].
///
/// Questions and answers are read using a cursor, which is initially
/// set to the first octet after the DNS header. The read methods must
/// be called sequentially to read any questions, and then any records,
/// in the order they appear in the message. Compression pointers are
/// resolved against the whole buffer, so the buffer must hold the
/// entire message, header included.
#[derive(Debug, Eq, PartialEq)]
pub struct Reader<'a> {
    octets: &'a [u8],
    cursor: usize,
    header: Header,
}

impl<'a> Reader<'a> {
    /// Returns the message's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Reads a [`Question`] starting at the current cursor.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_question(&mut self) -> Result<Question> {
        let (qname, qname_end) = decode_name(self.octets, self.cursor)?;
        let qtype = read_u16(self.octets, qname_end)?.into();
        let qclass = read_u16(self.octets, qname_end + 2)?.into();
        self.cursor = qname_end + QUESTION_FIXED_SIZE;
        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }

    /// Reads exactly `count` [`Question`]s starting at the current
    /// cursor, failing if any of them cannot be read.
    pub fn read_questions(&mut self, count: u16) -> Result<Vec<Question>> {
        (0..count).map(|_| self.read_question()).collect()
    }

    /// Reads a resource record at the current cursor.
    ///
    /// RDATA of the RFC 1035 types that embed domain names (e.g. NS,
    /// CNAME, MX, and SOA) is returned with those names uncompressed,
    /// so that the [`Answer`] stands on its own outside of this
    /// message. All other RDATA is returned as-is.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_answer(&mut self) -> Result<Answer> {
        let (owner, owner_end) = decode_name(self.octets, self.cursor)?;
        let rr_type = read_u16(self.octets, owner_end)?.into();
        let class = read_u16(self.octets, owner_end + 2)?.into();
        let ttl = read_u32(self.octets, owner_end + 4)?.into();
        let rdlength = read_u16(self.octets, owner_end + 8)?;
        let rdata_start = owner_end + RR_FIXED_SIZE;
        let rdata_end = rdata_start + rdlength as usize;
        if rdata_end > self.octets.len() {
            return Err(Error::RdataOverrun);
        }
        let rdata = expand_rdata(rr_type, self.octets, rdata_start, rdata_end)?;
        let answer =
            Answer::new(owner, rr_type, class, ttl, rdata).map_err(|_| Error::InvalidRdata)?;
        self.cursor = rdata_end;
        Ok(answer)
    }

    /// Reads exactly `count` resource records starting at the current
    /// cursor, failing if any of them cannot be read.
    pub fn read_answers(&mut self, count: u16) -> Result<Vec<Answer>> {
        (0..count).map(|_| self.read_answer()).collect()
    }

    /// Returns whether the `Reader`'s cursor has reached the end of the
    /// message.
    pub fn at_eom(&self) -> bool {
        self.cursor >= self.octets.len()
    }
}

impl<'a> TryFrom<&'a [u8]> for Reader<'a> {
    type Error = Error;

    fn try_from(octets: &'a [u8]) -> Result<Self> {
        let header = decode_header(octets)?;
        Ok(Self {
            octets,
            cursor: HEADER_SIZE,
            header,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// RDATA EXPANSION                                                    //
////////////////////////////////////////////////////////////////////////

/// Copies the RDATA at `octets[start..end]`, replacing any compressed
/// domain names it holds with their uncompressed forms.
fn expand_rdata(rr_type: Type, octets: &[u8], start: usize, end: usize) -> Result<Vec<u8>> {
    // (octets before the names, number of names, octets after them)
    let (prefix, names, suffix) = match rr_type {
        Type::NS | Type::MD | Type::MF | Type::CNAME | Type::MB | Type::MG | Type::MR
        | Type::PTR => (0, 1, 0),
        Type::MINFO => (0, 2, 0),
        Type::MX => (2, 1, 0),
        Type::SOA => (0, 2, 20),
        _ => return Ok(octets[start..end].to_vec()),
    };

    if end - start < prefix {
        return Err(Error::InvalidRdata);
    }
    let mut expanded = octets[start..start + prefix].to_vec();
    let mut cursor = start + prefix;
    for _ in 0..names {
        let (name, next) = decode_name(octets, cursor)?;
        if next > end {
            return Err(Error::InvalidRdata);
        }
        expanded.extend_from_slice(name.wire_repr());
        cursor = next;
    }
    if end - cursor != suffix {
        return Err(Error::InvalidRdata);
    }
    expanded.extend_from_slice(&octets[cursor..end]);
    Ok(expanded)
}

////////////////////////////////////////////////////////////////////////
// HELPERS FOR READING MULTI-BYTE INTEGERS                            //
////////////////////////////////////////////////////////////////////////

/// Reads a network-byte-order `u16` at `octets[index..]`.
fn read_u16(octets: &[u8], index: usize) -> Result<u16> {
    match octets.get(index..index + 2) {
        Some(&[a, b]) => Ok(u16::from_be_bytes([a, b])),
        _ => Err(Error::UnexpectedEomInField),
    }
}

/// Reads a network-byte-order `u32` at `octets[index..]`.
fn read_u32(octets: &[u8], index: usize) -> Result<u32> {
    match octets.get(index..index + 4) {
        Some(&[a, b, c, d]) => Ok(u32::from_be_bytes([a, b, c, d])),
        _ => Err(Error::UnexpectedEomInField),
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a message is malformed: its header,
/// a [`Question`], or a resource record could not be read.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    HeaderTooShort,
    UnexpectedEomInField,
    RdataOverrun,
    InvalidName(name::Error),
    InvalidRdata,
}

impl From<name::Error> for Error {
    fn from(err: name::Error) -> Self {
        Self::InvalidName(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::HeaderTooShort => f.write_str("header too short"),
            Self::UnexpectedEomInField => f.write_str("unexpected end of message in field"),
            Self::RdataOverrun => f.write_str("RDLENGTH extends past the end of the message"),
            Self::InvalidName(err) => write!(f, "invalid domain name: {}", err),
            Self::InvalidRdata => f.write_str("invalid RDATA"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            _ => None,
        }
    }
}

/// The type returned by fallible [`Reader`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
