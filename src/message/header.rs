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

//! Implementation of the fixed 12-octet DNS message header.

use super::constants::*;
use super::reader::{Error, Result};
use super::{Opcode, Rcode};

////////////////////////////////////////////////////////////////////////
// FLAGS                                                              //
////////////////////////////////////////////////////////////////////////

/// The 16-bit flags word of the DNS message header.
///
/// On the wire, from the most significant bit: QR, OPCODE (four bits),
/// AA, TC, RD, RA, Z (three reserved bits), and RCODE (four bits). The
/// Z bits are carried as read so that a decoded header re-encodes to
/// the same octets; they are zero in anything this crate builds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Flags {
    pub qr: bool,
    pub opcode: Opcode,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: Rcode,
}

/// Packs [`Flags`] into the 16-bit wire representation.
pub fn encode_flags(flags: Flags) -> u16 {
    let mut bits = 0;
    if flags.qr {
        bits |= QR_MASK;
    }
    bits |= (u8::from(flags.opcode) as u16) << OPCODE_SHIFT;
    if flags.aa {
        bits |= AA_MASK;
    }
    if flags.tc {
        bits |= TC_MASK;
    }
    if flags.rd {
        bits |= RD_MASK;
    }
    if flags.ra {
        bits |= RA_MASK;
    }
    bits |= ((flags.z as u16) << Z_SHIFT) & Z_MASK;
    bits | u8::from(flags.rcode) as u16
}

/// Unpacks the 16-bit wire representation of the flags word.
pub fn decode_flags(bits: u16) -> Flags {
    Flags {
        qr: bits & QR_MASK != 0,
        opcode: Opcode::from_nibble(((bits & OPCODE_MASK) >> OPCODE_SHIFT) as u8),
        aa: bits & AA_MASK != 0,
        tc: bits & TC_MASK != 0,
        rd: bits & RD_MASK != 0,
        ra: bits & RA_MASK != 0,
        z: ((bits & Z_MASK) >> Z_SHIFT) as u8,
        rcode: Rcode::from_nibble((bits & RCODE_MASK) as u8),
    }
}

impl From<u16> for Flags {
    fn from(bits: u16) -> Self {
        decode_flags(bits)
    }
}

impl From<Flags> for u16 {
    fn from(flags: Flags) -> Self {
        encode_flags(flags)
    }
}

////////////////////////////////////////////////////////////////////////
// HEADER                                                             //
////////////////////////////////////////////////////////////////////////

/// The DNS message header ([RFC 1035 § 4.1.1]).
///
/// The section counts are whatever was read or assigned; they are only
/// guaranteed to describe the message when produced by
/// [`Message::sync_counts`](super::Message::sync_counts) or
/// [`Message::encode`](super::Message::encode).
///
/// [RFC 1035 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

/// Serializes a [`Header`] into its 12-octet wire form. All fields are
/// big-endian, in the order ID, flags, QDCOUNT, ANCOUNT, NSCOUNT,
/// ARCOUNT.
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    let mut octets = [0; HEADER_SIZE];
    let fields = [
        (ID_START, header.id),
        (FLAGS_START, encode_flags(header.flags)),
        (QDCOUNT_START, header.qdcount),
        (ANCOUNT_START, header.ancount),
        (NSCOUNT_START, header.nscount),
        (ARCOUNT_START, header.arcount),
    ];
    for (start, value) in fields {
        octets[start..start + 2].copy_from_slice(&value.to_be_bytes());
    }
    octets
}

/// Reads a [`Header`] from the first 12 octets of `octets`. Fails with
/// [`Error::HeaderTooShort`] if fewer are available; anything after
/// the header is ignored.
pub fn decode_header(octets: &[u8]) -> Result<Header> {
    if octets.len() < HEADER_SIZE {
        return Err(Error::HeaderTooShort);
    }
    let field = |start: usize| u16::from_be_bytes([octets[start], octets[start + 1]]);
    Ok(Header {
        id: field(ID_START),
        flags: decode_flags(field(FLAGS_START)),
        qdcount: field(QDCOUNT_START),
        ancount: field(ANCOUNT_START),
        nscount: field(NSCOUNT_START),
        arcount: field(ARCOUNT_START),
    })
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_survive_every_bit_pattern() {
        for bits in 0..=u16::MAX {
            let flags = decode_flags(bits);
            assert_eq!(encode_flags(flags), bits);
            assert_eq!(decode_flags(encode_flags(flags)), flags);
        }
    }

    #[test]
    fn qr_is_bit_15_and_rcode_is_bits_0_to_3() {
        let qr_only = Flags {
            qr: true,
            ..Default::default()
        };
        assert_eq!(encode_flags(qr_only), 0x8000);

        let notimp = Flags {
            rcode: Rcode::NotImp,
            ..Default::default()
        };
        assert_eq!(encode_flags(notimp), 0x0004);
        assert_eq!(decode_flags(0x000f).rcode, Rcode::Unassigned(15));
    }

    #[test]
    fn single_flags_land_in_the_right_place() {
        let flags = decode_flags(0x0100);
        assert!(flags.rd);
        assert!(!flags.qr && !flags.aa && !flags.tc && !flags.ra);
        assert_eq!(flags.opcode, Opcode::Query);

        assert_eq!(decode_flags(0x1000).opcode, Opcode::Status);
        assert_eq!(decode_flags(0x2800).opcode, Opcode::Update);
        assert!(decode_flags(0x0400).aa);
        assert!(decode_flags(0x0200).tc);
        assert!(decode_flags(0x0080).ra);
        assert_eq!(decode_flags(0x0070).z, 7);
    }

    #[test]
    fn encode_header_works() {
        let header = Header {
            id: 0x1234,
            flags: decode_flags(0x0100),
            qdcount: 1,
            ancount: 2,
            nscount: 3,
            arcount: 4,
        };
        assert_eq!(
            &encode_header(&header),
            b"\x12\x34\x01\x00\x00\x01\x00\x02\x00\x03\x00\x04"
        );
        assert_eq!(decode_header(&encode_header(&header)), Ok(header));
    }

    #[test]
    fn decode_header_ignores_trailing_data() {
        let header =
            decode_header(b"\xab\xcd\x81\x80\x00\x01\x00\x01\x00\x00\x00\x00junk").unwrap();
        assert_eq!(header.id, 0xabcd);
        assert!(header.flags.qr && header.flags.rd && header.flags.ra);
        assert_eq!((header.qdcount, header.ancount), (1, 1));
    }

    #[test]
    fn decode_header_rejects_short_input() {
        for size in 0..HEADER_SIZE {
            let buf = vec![0; size];
            assert_eq!(decode_header(&buf), Err(Error::HeaderTooShort));
        }
    }
}
