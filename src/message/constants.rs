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

//! Constants related to DNS messages.

pub const HEADER_SIZE: usize = 12;

// Byte ranges of the big-endian header fields.
pub const ID_START: usize = 0;
pub const FLAGS_START: usize = 2;
pub const QDCOUNT_START: usize = 4;
pub const ANCOUNT_START: usize = 6;
pub const NSCOUNT_START: usize = 8;
pub const ARCOUNT_START: usize = 10;

// Bit layout of the 16-bit flags word, MSB first: QR, OPCODE (4), AA,
// TC, RD, RA, Z (3), RCODE (4).
pub const QR_MASK: u16 = 0x8000;
pub const OPCODE_MASK: u16 = 0x7800;
pub const OPCODE_SHIFT: u32 = 11;
pub const AA_MASK: u16 = 0x0400;
pub const TC_MASK: u16 = 0x0200;
pub const RD_MASK: u16 = 0x0100;
pub const RA_MASK: u16 = 0x0080;
pub const Z_MASK: u16 = 0x0070;
pub const Z_SHIFT: u32 = 4;
pub const RCODE_MASK: u16 = 0x000f;

/// Fixed part of an answer RR after its owner: TYPE, CLASS, TTL, and
/// RDLENGTH.
pub const RR_FIXED_SIZE: usize = 10;

/// Fixed part of a question after its QNAME: QTYPE and QCLASS.
pub const QUESTION_FIXED_SIZE: usize = 4;

/// The maximum size of a DNS message carried over UDP without EDNS.
pub const UDP_PAYLOAD_LIMIT: usize = 512;
