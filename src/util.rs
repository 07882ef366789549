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

//! Crate-private utilities.

/// Parses the RFC 3597 § 5 generic form of a 16-bit code (e.g.
/// `TYPE65280` or `CLASS3`). Returns [`None`] if `text` does not start
/// with `prefix` (compared case-insensitively).
pub fn parse_generic_code(text: &str, prefix: &str) -> Option<Result<u16, ()>> {
    let head = text.get(0..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(text[prefix.len()..].parse::<u16>().or(Err(())))
    } else {
        None
    }
}

/// Defines the textual mnemonics of a newtype over a 16-bit wire code.
///
/// This implements [`Display`](std::fmt::Display),
/// [`Debug`](std::fmt::Debug), and [`FromStr`](std::str::FromStr) for
/// `$code`, using the listed constants and falling back to the RFC 3597
/// generic form `$prefix<number>` for everything else.
macro_rules! code_mnemonics {
    ($code:ident, $prefix:literal, $what:literal, [$($constant:ident),* $(,)?] $(,)?) => {
        impl ::std::fmt::Display for $code {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                match *self {
                    $(Self::$constant => f.write_str(stringify!($constant)),)*
                    Self(value) => write!(f, concat!($prefix, "{}"), value),
                }
            }
        }

        impl ::std::fmt::Debug for $code {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{self}")
            }
        }

        impl ::std::str::FromStr for $code {
            type Err = &'static str;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                $(
                    if text.eq_ignore_ascii_case(stringify!($constant)) {
                        return Ok(Self::$constant);
                    }
                )*
                match $crate::util::parse_generic_code(text, $prefix) {
                    Some(Ok(value)) => Ok(Self(value)),
                    Some(Err(())) => Err(concat!(
                        $what,
                        " value is not a valid unsigned 16-bit integer"
                    )),
                    None => Err(concat!("unknown ", $what)),
                }
            }
        }
    };
}

pub(crate) use code_mnemonics;
