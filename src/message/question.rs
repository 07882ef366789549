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

//! Implementation of types relating to DNS questions.

use std::fmt;
use std::str::FromStr;

use crate::class::Class;
use crate::name::Name;
use crate::rr::Type;

////////////////////////////////////////////////////////////////////////
// QUESTIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// An entry of the question section ([RFC 1035 § 4.1.2]): the QNAME
/// being asked about, the [QTYPE](Qtype) of records wanted, and the
/// [QCLASS](Qclass) to search.
///
/// RFC 1035 allows several questions per message even though hardly
/// anyone sends more than one. The forwarding resolver handles the
/// general case by asking its upstream one question at a time.
///
/// [RFC 1035 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    pub qname: Name,
    pub qtype: Qtype,
    pub qclass: Qclass,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.qname, self.qclass, self.qtype)
    }
}

////////////////////////////////////////////////////////////////////////
// QTYPES                                                             //
////////////////////////////////////////////////////////////////////////

/// The QTYPE of a DNS [question](Question).
///
/// QTYPEs are a superset of [`Type`]s that adds query-only values such
/// as [`AXFR`](Qtype::AXFR) and [`*`](Qtype::ANY). Like [`Type`], this
/// wraps the 16-bit wire value.
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qtype(u16);

impl Qtype {
    // RFC 1995
    pub const IXFR: Self = Self(251);

    // RFC 1035
    pub const AXFR: Self = Self(252);
    pub const MAILB: Self = Self(253);
    pub const MAILA: Self = Self(254);
    pub const ANY: Self = Self(255);
}

impl From<u16> for Qtype {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qtype> for u16 {
    fn from(qtype: Qtype) -> Self {
        qtype.0
    }
}

impl From<Type> for Qtype {
    fn from(rr_type: Type) -> Self {
        Self(rr_type.into())
    }
}

impl fmt::Display for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::IXFR => f.write_str("IXFR"),
            Self::AXFR => f.write_str("AXFR"),
            Self::MAILB => f.write_str("MAILB"),
            Self::MAILA => f.write_str("MAILA"),
            Self::ANY => f.write_str("*"),
            _ => Type::from(*self).fmt(f),
        }
    }
}

impl fmt::Debug for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Qtype {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        const SPECIAL: [(&str, Qtype); 6] = [
            ("IXFR", Qtype::IXFR),
            ("AXFR", Qtype::AXFR),
            ("MAILB", Qtype::MAILB),
            ("MAILA", Qtype::MAILA),
            ("ANY", Qtype::ANY),
            ("*", Qtype::ANY),
        ];
        SPECIAL
            .iter()
            .find(|(mnemonic, _)| text.eq_ignore_ascii_case(mnemonic))
            .map(|(_, qtype)| Ok(*qtype))
            .unwrap_or_else(|| Type::from_str(text).map(Into::into))
    }
}

////////////////////////////////////////////////////////////////////////
// QCLASSES                                                           //
////////////////////////////////////////////////////////////////////////

/// The QCLASS of a DNS [question](Question): a [`Class`] or one of the
/// query-only values [`NONE`](Qclass::NONE) and [`*`](Qclass::ANY).
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qclass(u16);

impl Qclass {
    // RFC 2136
    pub const NONE: Self = Self(254);

    // RFC 1035
    pub const ANY: Self = Self(255);
}

impl From<u16> for Qclass {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qclass> for u16 {
    fn from(qclass: Qclass) -> Self {
        qclass.0
    }
}

impl From<Class> for Qclass {
    fn from(class: Class) -> Self {
        Self(class.into())
    }
}

impl fmt::Display for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("NONE"),
            Self::ANY => f.write_str("*"),
            _ => Class::from(*self).fmt(f),
        }
    }
}

impl fmt::Debug for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Qclass {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.eq_ignore_ascii_case("NONE") {
            Ok(Self::NONE)
        } else if text.eq_ignore_ascii_case("ANY") || text == "*" {
            Ok(Self::ANY)
        } else {
            Class::from_str(text).map(Into::into)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qtype_falls_back_to_type() {
        assert_eq!("any".parse::<Qtype>(), Ok(Qtype::ANY));
        assert_eq!("*".parse::<Qtype>(), Ok(Qtype::ANY));
        assert_eq!("A".parse::<Qtype>(), Ok(Qtype::from(Type::A)));
        assert_eq!(Qtype::from(Type::MX).to_string(), "MX");
        assert_eq!(Qtype::AXFR.to_string(), "AXFR");
    }

    #[test]
    fn qclass_falls_back_to_class() {
        assert_eq!("none".parse::<Qclass>(), Ok(Qclass::NONE));
        assert_eq!("IN".parse::<Qclass>(), Ok(Qclass::from(Class::IN)));
        assert_eq!(Qclass::ANY.to_string(), "*");
    }

    #[test]
    fn question_displays_like_a_zone_file_line() {
        let question = Question {
            qname: "F.ISI.ARPA".parse().unwrap(),
            qtype: Type::A.into(),
            qclass: Class::IN.into(),
        };
        assert_eq!(question.to_string(), "F.ISI.ARPA. IN A");
    }
}
