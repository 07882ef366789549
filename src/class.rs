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

//! Implementation of the [`Class`] type for DNS classes.

use crate::message::Qclass;
use crate::util::code_mnemonics;

/// The CLASS of a DNS resource record.
///
/// On the wire a class is an unsigned 16-bit integer; this type wraps
/// it so that it prints and parses with the usual mnemonics. Only
/// [`IN`](Class::IN) matters in practice, and it is the class used by
/// the placeholder records the local resolver produces.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Class(u16);

impl Class {
    // RFC 1035. CS is no longer listed by the IANA.
    pub const IN: Self = Self(1);
    pub const CH: Self = Self(3);
    pub const HS: Self = Self(4);
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Class> for u16 {
    fn from(class: Class) -> Self {
        class.0
    }
}

impl From<Qclass> for Class {
    fn from(qclass: Qclass) -> Self {
        Self(qclass.into())
    }
}

code_mnemonics!(Class, "CLASS", "class", [IN, CH, HS]);

#[cfg(test)]
mod tests {
    use super::Class;

    #[test]
    fn unknown_classes_use_generic_form() {
        assert_eq!(Class::from(0xff00).to_string(), "CLASS65280");
        assert_eq!(Class::IN.to_string(), "IN");
    }

    #[test]
    fn parses_mnemonics_and_generic_form() {
        assert_eq!("in".parse::<Class>(), Ok(Class::IN));
        assert_eq!("CLASS1".parse::<Class>(), Ok(Class::IN));
        assert_eq!(u16::from("CLASS65280".parse::<Class>().unwrap()), 65280);
        assert!("CLASS65536".parse::<Class>().is_err());
        assert!("XX".parse::<Class>().is_err());
    }
}
