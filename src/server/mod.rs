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

//! The per-message processing logic of the forwarding server.
//!
//! The [`Server`] structure is the heart of this module; see its
//! documentation for details.

use log::{debug, warn};

use crate::message::{encode_header, Flags, Header, Message, Rcode};
use crate::resolver::Resolver;

////////////////////////////////////////////////////////////////////////
// SERVER PUBLIC API AND CORE MESSAGE-HANDLING LOGIC                  //
////////////////////////////////////////////////////////////////////////

/// A forwarding DNS server, abstracted from any underlying network I/O.
///
/// The [`Server`] structure receives, parses, and responds to DNS
/// messages through the [`Server::handle_message`] method. An I/O loop
/// (see [`crate::io`]) is responsible for receiving these messages from
/// the network and sending back the responses that the [`Server`]
/// produces. The responses themselves come from the server's
/// [`Resolver`].
pub struct Server {
    resolver: Resolver,
}

impl Server {
    /// Creates a new `Server` that answers queries with `resolver`.
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    /// Returns the server's resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Handles a received DNS message. This is the API through which
    /// I/O loops submit messages.
    ///
    /// A [`Response`] is returned, signifying whether a response is to
    /// be sent and, if so, what it is. Messages that do not contain a
    /// full DNS header, as well as messages that are themselves
    /// responses, are ignored. Queries that cannot be parsed get a
    /// FORMERR response, and queries that cannot be resolved get a
    /// SERVFAIL response.
    pub fn handle_message(&self, received: &[u8]) -> Response {
        // Ignore messages that do not contain a full DNS header, and
        // messages that are responses.
        let header = match crate::message::decode_header(received) {
            Ok(header) => header,
            Err(_) => {
                debug!("Ignoring {}-octet datagram", received.len());
                return Response::None;
            }
        };
        if header.flags.qr {
            debug!("Ignoring response {:#06x}", header.id);
            return Response::None;
        }

        let query = match Message::decode(received) {
            Ok(query) => query,
            Err(e) => {
                warn!("Malformed query {:#06x}: {}", header.id, e);
                return Response::Single(encode_header(&format_error_header(&header)).to_vec());
            }
        };
        debug!(
            "Query {:#06x}: opcode {:?}, {} question(s)",
            header.id,
            header.flags.opcode,
            query.questions.len(),
        );

        let response = match self.resolver.resolve(&query) {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to resolve query {:#06x}: {}", header.id, e);
                server_failure(&query)
            }
        };
        match response.encode() {
            Ok(octets) => Response::Single(octets),
            Err(e) => {
                warn!("Failed to encode response to {:#06x}: {}", header.id, e);
                encode_or_drop(&server_failure(&query))
            }
        }
    }
}

/// Encodes `response`, or gives up on responding if even that fails.
fn encode_or_drop(response: &Message) -> Response {
    match response.encode() {
        Ok(octets) => Response::Single(octets),
        Err(e) => {
            warn!("Dropping response to {:#06x}: {}", response.header.id, e);
            Response::None
        }
    }
}

/// The header of a FORMERR response to a query with the given header.
///
/// The response has no sections, since the query's could not be read.
/// RD is only defined for opcode QUERY, so it is only copied then.
fn format_error_header(received: &Header) -> Header {
    Header {
        id: received.id,
        flags: Flags {
            qr: true,
            opcode: received.flags.opcode,
            rd: received.flags.opcode.is_query() && received.flags.rd,
            rcode: Rcode::FormErr,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A SERVFAIL response to `query`, carrying its questions and no
/// answers.
fn server_failure(query: &Message) -> Message {
    Message {
        header: Header {
            flags: Flags {
                qr: true,
                rcode: Rcode::ServFail,
                ..query.header.flags
            },
            nscount: 0,
            arcount: 0,
            ..query.header
        },
        questions: query.questions.clone(),
        answers: Vec::new(),
    }
}

////////////////////////////////////////////////////////////////////////
// RESPONSES                                                          //
////////////////////////////////////////////////////////////////////////

/// The result of [`Server::handle_message`]: whether to send a
/// response and, if so, the encoded response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    Single(Vec<u8>),
    None,
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::class::Class;
    use crate::message::Answer;
    use crate::resolver::{ForwardingStrategy, StaticRecordProvider, TransportError};
    use crate::rr::Ttl;

    /// A query for F.ISI.ARPA. IN A with RD set.
    const QUERY: &[u8] = b"\x4a\x21\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
          \x01F\x03ISI\x04ARPA\x00\x00\x01\x00\x01";

    fn local_server() -> Server {
        Server::new(Resolver::local(StaticRecordProvider::new(
            Ipv4Addr::new(192, 0, 2, 53),
            Ttl::from(60),
        )))
    }

    fn unwrap_response(response: Response) -> Message {
        match response {
            Response::Single(octets) => Message::decode(&octets).unwrap(),
            Response::None => panic!("no response"),
        }
    }

    #[test]
    fn answers_queries() {
        let response = unwrap_response(local_server().handle_message(QUERY));
        assert_eq!(response.header.id, 0x4a21);
        assert!(response.header.flags.qr);
        assert!(response.header.flags.rd);
        assert_eq!(response.header.flags.rcode, Rcode::NoError);
        assert_eq!(response.questions.len(), 1);
        assert_eq!(response.answers.len(), 1);
        assert_eq!(
            response.answers[0].ipv4(),
            Some(Ipv4Addr::new(192, 0, 2, 53))
        );
    }

    #[test]
    fn ignores_short_datagrams_and_responses() {
        let server = local_server();
        for len in 0..12 {
            assert_eq!(server.handle_message(&QUERY[..len]), Response::None);
        }
        let mut response = QUERY.to_vec();
        response[2] |= 0x80;
        assert_eq!(server.handle_message(&response), Response::None);
    }

    #[test]
    fn malformed_queries_get_formerr() {
        // The question is cut off in the middle of QTYPE.
        let truncated = &QUERY[..QUERY.len() - 3];
        let response = unwrap_response(local_server().handle_message(truncated));
        assert_eq!(response.header.id, 0x4a21);
        assert!(response.header.flags.qr);
        assert!(response.header.flags.rd);
        assert_eq!(response.header.flags.rcode, Rcode::FormErr);
        assert!(response.questions.is_empty());
        assert!(response.answers.is_empty());
    }

    #[test]
    fn resolution_failures_get_servfail() {
        let server = Server::new(Resolver::upstream(
            |_: &[u8]| -> Result<Vec<u8>, TransportError> { Err(TransportError::TimedOut) },
            ForwardingStrategy::Sequential,
        ));
        let response = unwrap_response(server.handle_message(QUERY));
        assert_eq!(response.header.id, 0x4a21);
        assert!(response.header.flags.qr);
        assert_eq!(response.header.flags.rcode, Rcode::ServFail);
        assert_eq!(response.header.qdcount, 1);
        assert_eq!(response.questions[0].qname.to_string(), "F.ISI.ARPA.");
        assert!(response.answers.is_empty());
    }

    #[test]
    fn oversized_answer_sections_get_servfail() {
        // Two replies of 40,000 answers each are fine on their own but
        // cannot be combined into one message.
        let server = Server::new(Resolver::upstream(
            |sub_query: &[u8]| -> Result<Vec<u8>, TransportError> {
                let mut reply = Message::decode(sub_query).unwrap();
                reply.header.flags.qr = true;
                let answer = Answer::a(
                    reply.questions[0].qname.clone(),
                    Class::IN,
                    Ttl::from(60),
                    Ipv4Addr::new(192, 0, 2, 1),
                );
                reply.answers = vec![answer; 40_000];
                Ok(reply.encode().unwrap())
            },
            ForwardingStrategy::Sequential,
        ));
        let mut query = Message::decode(QUERY).unwrap();
        query.questions.push(query.questions[0].clone());
        let response = unwrap_response(server.handle_message(&query.encode().unwrap()));
        assert_eq!(response.header.flags.rcode, Rcode::ServFail);
        assert_eq!(response.questions.len(), 2);
        assert!(response.answers.is_empty());
    }

    #[test]
    fn unencodable_responses_are_dropped() {
        let mut message = Message::decode(QUERY).unwrap();
        message.questions = vec![message.questions[0].clone(); 65_536];
        assert_eq!(encode_or_drop(&message), Response::None);

        message.questions.truncate(1);
        assert!(matches!(encode_or_drop(&message), Response::Single(_)));
    }
}
