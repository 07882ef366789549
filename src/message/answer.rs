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

//! Implementation of the [`Answer`] type for answer-section records.

use std::fmt;
use std::net::Ipv4Addr;

use crate::class::Class;
use crate::name::Name;
use crate::rr::{Ttl, Type};

/// A resource record of the answer section.
///
/// The RDATA is kept as opaque octets, and the RDLENGTH field is not
/// stored at all: it is always derived from the RDATA, so the two can
/// never disagree. Construction through [`Answer::new`] is checked to
/// make sure the RDATA fits in the 16-bit RDLENGTH field.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Answer {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    rdata: Box<[u8]>,
}

impl Answer {
    /// Creates a new `Answer`. Fails if `rdata` is longer than 65,535
    /// octets.
    pub fn new(
        owner: Name,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: impl Into<Box<[u8]>>,
    ) -> Result<Self, RdataTooLongError> {
        let rdata = rdata.into();
        if rdata.len() > u16::MAX as usize {
            Err(RdataTooLongError)
        } else {
            Ok(Self {
                owner,
                rr_type,
                class,
                ttl,
                rdata,
            })
        }
    }

    /// Creates an A record pointing `owner` at `address`.
    pub fn a(owner: Name, class: Class, ttl: Ttl, address: Ipv4Addr) -> Self {
        Self {
            owner,
            rr_type: Type::A,
            class,
            ttl,
            rdata: Box::new(address.octets()),
        }
    }

    /// Returns the record's RDATA.
    pub fn rdata(&self) -> &[u8] {
        &self.rdata
    }

    /// Returns the length of the record's RDATA, as it would be
    /// written in the RDLENGTH field.
    pub fn rdlength(&self) -> u16 {
        // Checked at construction.
        self.rdata.len() as u16
    }

    /// If this is an A record with a well-formed four-octet RDATA,
    /// returns the address it holds.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        if self.rr_type != Type::A {
            return None;
        }
        let octets: [u8; 4] = self.rdata[..].try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} ",
            self.owner,
            u32::from(self.ttl),
            self.class,
            self.rr_type
        )?;
        match self.ipv4() {
            Some(address) => write!(f, "{}", address),
            None => {
                // RFC 3597 § 5 generic RDATA.
                write!(f, "\\# {}", self.rdata.len())?;
                if !self.rdata.is_empty() {
                    f.write_str(" ")?;
                    for octet in self.rdata.iter() {
                        write!(f, "{:02x}", octet)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// An error signaling that RDATA is too long for the RDLENGTH field.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RdataTooLongError;

impl fmt::Display for RdataTooLongError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("RDATA is too long")
    }
}

impl std::error::Error for RdataTooLongError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_records_round_trip_their_address() {
        let address = Ipv4Addr::new(192, 0, 2, 1);
        let answer = Answer::a(
            "example.com.".parse().unwrap(),
            Class::IN,
            Ttl::from(60),
            address,
        );
        assert_eq!(answer.rdlength(), 4);
        assert_eq!(answer.rdata(), &[192, 0, 2, 1]);
        assert_eq!(answer.ipv4(), Some(address));
        assert_eq!(answer.to_string(), "example.com. 60 IN A 192.0.2.1");
    }

    #[test]
    fn ipv4_requires_a_four_octet_a_record() {
        let owner: Name = "example.com.".parse().unwrap();
        let short = Answer::new(owner.clone(), Type::A, Class::IN, Ttl::from(1), vec![1, 2]);
        assert_eq!(short.unwrap().ipv4(), None);
        let txt = Answer::new(owner, Type::TXT, Class::IN, Ttl::from(1), vec![3, 1, 2, 3]);
        let txt = txt.unwrap();
        assert_eq!(txt.ipv4(), None);
        assert_eq!(txt.to_string(), "example.com. 1 IN TXT \\# 4 03010203");
    }

    #[test]
    fn new_rejects_oversized_rdata() {
        let owner = Name::root();
        let max = vec![0; u16::MAX as usize];
        let answer = Answer::new(owner.clone(), Type::NULL, Class::IN, Ttl::from(0), max);
        assert_eq!(answer.unwrap().rdlength(), u16::MAX);
        let over = vec![0; u16::MAX as usize + 1];
        assert_eq!(
            Answer::new(owner, Type::NULL, Class::IN, Ttl::from(0), over),
            Err(RdataTooLongError),
        );
    }
}
