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

//! Implementation of the [`Writer`] type to write on-the-wire DNS
//! messages.

use std::fmt;

use super::constants::*;
use super::header::{encode_header, Header};
use super::{Answer, Question};

////////////////////////////////////////////////////////////////////////
// WRITER                                                             //
////////////////////////////////////////////////////////////////////////

/// A builder that serializes a DNS message into an owned buffer.
///
/// A `Writer` is constructed with [`Writer::new`] from the [`Header`]
/// to emit. Questions and answer records are then appended with
/// [`Writer::add_question`] and [`Writer::add_answer`], and
/// [`Writer::finish`] returns the finished message.
///
/// Questions and resource records are written sequentially, so the
/// above methods must be used in the proper order (questions, then
/// answers). Attempts to add a question after an answer fail with
/// [`Error::OutOfOrder`].
///
/// The QDCOUNT and ANCOUNT fields are never taken from the header
/// given to [`Writer::new`]; they are counted as questions and answers
/// are added. NSCOUNT and ARCOUNT are written as given. Names are
/// always written uncompressed, and no size limit is enforced: the
/// caller decides what to do with a message too large for its
/// transport.
#[derive(Debug)]
pub struct Writer {
    octets: Vec<u8>,
    header: Header,
    section: Section,
}

/// The section of a DNS message that a [`Writer`] is writing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Section {
    Question,
    Answer,
}

impl Writer {
    /// Creates a new `Writer` for a message with the given header.
    pub fn new(header: &Header) -> Self {
        Self {
            octets: vec![0; HEADER_SIZE],
            header: Header {
                qdcount: 0,
                ancount: 0,
                ..*header
            },
            section: Section::Question,
        }
    }

    /// Returns the current number of questions in the message.
    pub fn qdcount(&self) -> u16 {
        self.header.qdcount
    }

    /// Returns the current number of answer RRs in the message.
    pub fn ancount(&self) -> u16 {
        self.header.ancount
    }

    /// Adds a question to message. This must be used before any
    /// resource records are added.
    pub fn add_question(&mut self, question: &Question) -> Result<()> {
        if self.section != Section::Question {
            Err(Error::OutOfOrder)
        } else if let Some(new_qdcount) = self.header.qdcount.checked_add(1) {
            write_question(&mut self.octets, question);
            self.header.qdcount = new_qdcount;
            Ok(())
        } else {
            Err(Error::CountOverflow)
        }
    }

    /// Adds a resource record to the answer section of the message.
    pub fn add_answer(&mut self, answer: &Answer) -> Result<()> {
        if let Some(new_ancount) = self.header.ancount.checked_add(1) {
            write_answer(&mut self.octets, answer);
            self.header.ancount = new_ancount;
            self.section = Section::Answer;
            Ok(())
        } else {
            Err(Error::CountOverflow)
        }
    }

    /// Writes the header and returns the finished message.
    pub fn finish(mut self) -> Vec<u8> {
        self.octets[..HEADER_SIZE].copy_from_slice(&encode_header(&self.header));
        self.octets
    }
}

////////////////////////////////////////////////////////////////////////
// STANDALONE ENCODING                                                //
////////////////////////////////////////////////////////////////////////

/// Encodes a question as QNAME, QTYPE, and QCLASS.
pub fn encode_question(question: &Question) -> Vec<u8> {
    let mut octets = Vec::new();
    write_question(&mut octets, question);
    octets
}

/// Encodes an answer record as owner, TYPE, CLASS, TTL, RDLENGTH, and
/// RDATA.
pub fn encode_answer(answer: &Answer) -> Vec<u8> {
    let mut octets = Vec::new();
    write_answer(&mut octets, answer);
    octets
}

/// Encodes a whole message: the header, each question in order, and
/// then each answer in order. QDCOUNT and ANCOUNT are computed from
/// `questions` and `answers`; see [`Writer`].
pub fn encode_message(
    header: &Header,
    questions: &[Question],
    answers: &[Answer],
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(header);
    for question in questions {
        writer.add_question(question)?;
    }
    for answer in answers {
        writer.add_answer(answer)?;
    }
    Ok(writer.finish())
}

fn write_question(octets: &mut Vec<u8>, question: &Question) {
    octets.extend_from_slice(question.qname.wire_repr());
    octets.extend_from_slice(&u16::from(question.qtype).to_be_bytes());
    octets.extend_from_slice(&u16::from(question.qclass).to_be_bytes());
}

fn write_answer(octets: &mut Vec<u8>, answer: &Answer) {
    octets.extend_from_slice(answer.owner.wire_repr());
    octets.extend_from_slice(&u16::from(answer.rr_type).to_be_bytes());
    octets.extend_from_slice(&u16::from(answer.class).to_be_bytes());
    octets.extend_from_slice(&u32::from(answer.ttl).to_be_bytes());
    octets.extend_from_slice(&answer.rdlength().to_be_bytes());
    octets.extend_from_slice(answer.rdata());
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a [`Writer`] operation could not be
/// performed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// Adding the question or resource record would overflow the
    /// corresponding 16-bit counter in the DNS header.
    CountOverflow,

    /// An attempt was made to add a question after an answer record.
    OutOfOrder,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::CountOverflow => f.write_str("record count would overflow"),
            Self::OutOfOrder => f.write_str("question or record serialized out of order"),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible [`Writer`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::super::Flags;
    use super::*;
    use crate::class::Class;
    use crate::rr::{Ttl, Type};

    fn question(qname: &str) -> Question {
        Question {
            qname: qname.parse().unwrap(),
            qtype: Type::A.into(),
            qclass: Class::IN.into(),
        }
    }

    #[test]
    fn encode_question_works() {
        assert_eq!(
            encode_question(&question("F.ISI.ARPA")),
            b"\x01F\x03ISI\x04ARPA\x00\x00\x01\x00\x01",
        );
    }

    #[test]
    fn encode_answer_works() {
        let answer = Answer::a(
            "a.".parse().unwrap(),
            Class::IN,
            Ttl::from(60),
            Ipv4Addr::new(8, 8, 8, 8),
        );
        assert_eq!(
            encode_answer(&answer),
            b"\x01a\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x04\x08\x08\x08\x08",
        );
    }

    #[test]
    fn encode_message_counts_sections() {
        // The header claims nonsense counts; they are replaced.
        let header = Header {
            id: 0xbeef,
            flags: Flags {
                rd: true,
                ..Default::default()
            },
            qdcount: 7,
            ancount: 7,
            nscount: 0,
            arcount: 0,
        };
        let questions = [question("a."), question("b.")];
        let octets = encode_message(&header, &questions, &[]).unwrap();
        assert_eq!(
            octets,
            b"\xbe\xef\x01\x00\x00\x02\x00\x00\x00\x00\x00\x00\
              \x01a\x00\x00\x01\x00\x01\
              \x01b\x00\x00\x01\x00\x01",
        );
    }

    #[test]
    fn questions_must_come_before_answers() {
        let mut writer = Writer::new(&Header::default());
        let answer = Answer::a(
            "a.".parse().unwrap(),
            Class::IN,
            Ttl::from(60),
            Ipv4Addr::LOCALHOST,
        );
        writer.add_answer(&answer).unwrap();
        assert_eq!(writer.add_question(&question("a.")), Err(Error::OutOfOrder));
        assert_eq!(writer.qdcount(), 0);
        assert_eq!(writer.ancount(), 1);
    }

    #[test]
    fn count_overflow_is_detected() {
        let mut writer = Writer::new(&Header::default());
        let question = question(".");
        for _ in 0..u16::MAX {
            writer.add_question(&question).unwrap();
        }
        assert_eq!(writer.add_question(&question), Err(Error::CountOverflow));
        assert_eq!(writer.finish().len(), HEADER_SIZE + 5 * u16::MAX as usize);
    }
}
