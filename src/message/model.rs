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

//! Implementation of the [`Message`] type, an owned DNS message.

use super::reader::{self, Reader};
use super::writer::{self, encode_message};
use super::{Answer, Header, Question};

/// An owned DNS message: a header, a question section, and an answer
/// section.
///
/// Authority and additional records are never stored. A decoded
/// message keeps the NSCOUNT and ARCOUNT it arrived with, but its
/// authority and additional sections are not parsed.
///
/// The QDCOUNT and ANCOUNT fields of [`Message::header`] are not
/// trusted while encoding: [`Message::encode`] always computes them
/// from [`Message::questions`] and [`Message::answers`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
}

impl Message {
    /// Decodes a message from its wire form, reading the header and
    /// then exactly QDCOUNT questions and ANCOUNT answer records.
    pub fn decode(octets: &[u8]) -> reader::Result<Self> {
        let mut reader = Reader::try_from(octets)?;
        let header = *reader.header();
        let questions = reader.read_questions(header.qdcount)?;
        let answers = reader.read_answers(header.ancount)?;
        Ok(Self {
            header,
            questions,
            answers,
        })
    }

    /// Returns the header with QDCOUNT and ANCOUNT set to the actual
    /// section lengths. Fails if either does not fit in 16 bits.
    pub fn synced_header(&self) -> writer::Result<Header> {
        let qdcount = self
            .questions
            .len()
            .try_into()
            .or(Err(writer::Error::CountOverflow))?;
        let ancount = self
            .answers
            .len()
            .try_into()
            .or(Err(writer::Error::CountOverflow))?;
        Ok(Header {
            qdcount,
            ancount,
            ..self.header
        })
    }

    /// Sets QDCOUNT and ANCOUNT to the actual section lengths.
    pub fn sync_counts(&mut self) -> writer::Result<()> {
        self.header = self.synced_header()?;
        Ok(())
    }

    /// Encodes the message into its wire form, with QDCOUNT and
    /// ANCOUNT computed from the sections.
    pub fn encode(&self) -> writer::Result<Vec<u8>> {
        encode_message(&self.synced_header()?, &self.questions, &self.answers)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::super::{Flags, Opcode, Rcode};
    use super::*;
    use crate::class::Class;
    use crate::rr::{Ttl, Type};

    /// A standard query for F.ISI.ARPA. IN A with RD set, written by
    /// hand from RFC 1035 § 4.1.
    const F_ISI_ARPA_QUERY: &[u8] = b"\x4a\x21\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
          \x01F\x03ISI\x04ARPA\x00\x00\x01\x00\x01";

    #[test]
    fn uncompressed_messages_survive_decode_and_encode() {
        let message = Message::decode(F_ISI_ARPA_QUERY).unwrap();
        assert_eq!(message.header.id, 0x4a21);
        assert!(message.header.flags.rd);
        assert_eq!(message.questions.len(), 1);
        assert_eq!(message.questions[0].qname.to_string(), "F.ISI.ARPA.");
        assert!(message.answers.is_empty());
        assert_eq!(message.encode().unwrap(), F_ISI_ARPA_QUERY);
    }

    #[test]
    fn compressed_names_are_written_out_in_full() {
        let compressed = b"\x12\x34\x01\x00\x00\x02\x00\x00\x00\x00\x00\x00\
              \x01F\x03ISI\x04ARPA\x00\x00\x01\x00\x01\
              \x03FOO\xc0\x0c\x00\x01\x00\x01";
        let message = Message::decode(compressed).unwrap();
        assert_eq!(
            message.encode().unwrap(),
            b"\x12\x34\x01\x00\x00\x02\x00\x00\x00\x00\x00\x00\
              \x01F\x03ISI\x04ARPA\x00\x00\x01\x00\x01\
              \x03FOO\x01F\x03ISI\x04ARPA\x00\x00\x01\x00\x01",
        );
    }

    #[test]
    fn decode_propagates_malformed_bodies() {
        assert_eq!(
            Message::decode(b"\x00\x01"),
            Err(reader::Error::HeaderTooShort)
        );
        // ANCOUNT claims an answer that is not there.
        let missing_answer = b"\x00\x01\x81\x00\x00\x00\x00\x01\x00\x00\x00\x00";
        assert!(Message::decode(missing_answer).is_err());
    }

    #[test]
    fn encode_ignores_stale_counts() {
        let mut message = Message {
            header: Header {
                id: 1,
                flags: Flags {
                    qr: true,
                    opcode: Opcode::Query,
                    rcode: Rcode::NoError,
                    ..Default::default()
                },
                qdcount: 3,
                ancount: 0,
                nscount: 0,
                arcount: 0,
            },
            questions: vec![Question {
                qname: "example.com.".parse().unwrap(),
                qtype: Type::A.into(),
                qclass: Class::IN.into(),
            }],
            answers: vec![Answer::a(
                "example.com.".parse().unwrap(),
                Class::IN,
                Ttl::from(60),
                Ipv4Addr::new(8, 8, 8, 8),
            )],
        };

        let octets = message.encode().unwrap();
        let decoded = Message::decode(&octets).unwrap();
        assert_eq!(decoded.header.qdcount, 1);
        assert_eq!(decoded.header.ancount, 1);
        assert_eq!(decoded.answers, message.answers);

        message.sync_counts().unwrap();
        assert_eq!(message, decoded);
    }
}
