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

//! Resolution of DNS queries, either locally or by forwarding them to
//! an upstream resolver.
//!
//! The entry points are [`resolve_locally`] and
//! [`resolve_via_upstream`]; [`Resolver`] bundles either one with its
//! configuration for use by the [server](crate::server).
//!
//! Forwarding splits a query into one sub-query per question, since
//! few upstream resolvers accept more than one question per message.
//! The answers to the sub-queries are reassembled in question order.
//! If any sub-query fails, the whole resolution fails; a response
//! missing some of its answers is never produced.

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::thread;

use log::{debug, warn};

use crate::class::Class;
use crate::message::{reader, writer, Answer, Flags, Header, Message, Question, Rcode};
use crate::rr::Ttl;

mod upstream;
pub use upstream::{Transport, TransportError, UdpTransport};

////////////////////////////////////////////////////////////////////////
// RESOLVER                                                           //
////////////////////////////////////////////////////////////////////////

/// A configured resolution method: either a [`RecordProvider`] that
/// answers everything locally, or a [`Transport`] to an upstream
/// resolver together with the [`ForwardingStrategy`] to use with it.
pub struct Resolver {
    method: Method,
}

enum Method {
    Local(Box<dyn RecordProvider + Send + Sync>),
    Upstream {
        transport: Box<dyn Transport + Send + Sync>,
        strategy: ForwardingStrategy,
    },
}

impl Resolver {
    /// Creates a `Resolver` that answers every query from `provider`.
    pub fn local<P>(provider: P) -> Self
    where
        P: RecordProvider + Send + Sync + 'static,
    {
        Self {
            method: Method::Local(Box::new(provider)),
        }
    }

    /// Creates a `Resolver` that forwards queries over `transport`.
    pub fn upstream<T>(transport: T, strategy: ForwardingStrategy) -> Self
    where
        T: Transport + Send + Sync + 'static,
    {
        Self {
            method: Method::Upstream {
                transport: Box::new(transport),
                strategy,
            },
        }
    }

    /// Returns whether this `Resolver` contacts an upstream resolver.
    pub fn is_forwarding(&self) -> bool {
        matches!(self.method, Method::Upstream { .. })
    }

    /// Resolves `query`, producing the response to send back.
    pub fn resolve(&self, query: &Message) -> Result<Message, Error> {
        match self.method {
            Method::Local(ref provider) => Ok(resolve_locally(query, provider.as_ref())),
            Method::Upstream {
                ref transport,
                strategy,
            } => resolve_via_upstream(query, transport.as_ref(), strategy),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// LOCAL RESOLUTION                                                   //
////////////////////////////////////////////////////////////////////////

/// A source of answers for questions that are not forwarded.
pub trait RecordProvider {
    /// Returns the answers to `question`. There may be any number of
    /// them, including none.
    fn answers(&self, question: &Question) -> Vec<Answer>;
}

/// A [`RecordProvider`] that answers every question with a single
/// placeholder IN A record pointing the QNAME at a fixed address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StaticRecordProvider {
    address: Ipv4Addr,
    ttl: Ttl,
}

impl StaticRecordProvider {
    pub const DEFAULT_ADDRESS: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
    pub const DEFAULT_TTL: u32 = 60;

    pub fn new(address: Ipv4Addr, ttl: Ttl) -> Self {
        Self { address, ttl }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }
}

impl Default for StaticRecordProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ADDRESS, Self::DEFAULT_TTL.into())
    }
}

impl RecordProvider for StaticRecordProvider {
    fn answers(&self, question: &Question) -> Vec<Answer> {
        vec![Answer::a(
            question.qname.clone(),
            Class::IN,
            self.ttl,
            self.address,
        )]
    }
}

/// Answers `query` from `provider` without contacting any upstream.
///
/// The response carries the original questions and the provider's
/// answers to each of them, in question order. Its RCODE is NOTIMP if
/// the query's OPCODE is not QUERY, and NOERROR otherwise.
pub fn resolve_locally<P>(query: &Message, provider: &P) -> Message
where
    P: RecordProvider + ?Sized,
{
    let answers = query
        .questions
        .iter()
        .flat_map(|question| provider.answers(question))
        .collect();
    let rcode = if query.header.flags.opcode.is_query() {
        Rcode::NoError
    } else {
        Rcode::NotImp
    };
    make_response(query, rcode, answers)
}

////////////////////////////////////////////////////////////////////////
// FORWARDING                                                         //
////////////////////////////////////////////////////////////////////////

/// How the sub-queries of a forwarded query are issued.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ForwardingStrategy {
    /// One at a time, in question order, each reusing the query's ID.
    #[default]
    Sequential,

    /// All at once, each on its own thread with its own random ID.
    Parallel,
}

impl fmt::Display for ForwardingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Parallel => f.write_str("parallel"),
        }
    }
}

impl FromStr for ForwardingStrategy {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.eq_ignore_ascii_case("sequential") {
            Ok(Self::Sequential)
        } else if text.eq_ignore_ascii_case("parallel") {
            Ok(Self::Parallel)
        } else {
            Err("unknown forwarding strategy")
        }
    }
}

/// Resolves `query` by forwarding each of its questions to an upstream
/// resolver through `transport`.
///
/// The response carries the original questions and, in question
/// order, the answer sections of the upstream's replies. Its RCODE is
/// passed through from the query. If the query's OPCODE is not QUERY,
/// the upstream is not contacted and the response has RCODE NOTIMP and
/// no answers.
///
/// Fails if the query has more questions than a message can carry, if
/// any sub-query cannot be encoded or exchanged, or if its reply is
/// malformed.
pub fn resolve_via_upstream<T>(
    query: &Message,
    transport: &T,
    strategy: ForwardingStrategy,
) -> Result<Message, Error>
where
    T: Transport + Sync + ?Sized,
{
    if !query.header.flags.opcode.is_query() {
        debug!(
            "Not forwarding query {:#06x} with opcode {:?}",
            query.header.id, query.header.flags.opcode,
        );
        return Ok(make_response(query, Rcode::NotImp, Vec::new()));
    }
    if query.questions.len() > u16::MAX as usize {
        return Err(Error::Encoding(writer::Error::CountOverflow));
    }

    let answer_sets = match strategy {
        ForwardingStrategy::Sequential => forward_sequentially(query, transport)?,
        ForwardingStrategy::Parallel => forward_in_parallel(query, transport)?,
    };
    let answers = answer_sets.into_iter().flatten().collect();
    Ok(make_response(query, query.header.flags.rcode, answers))
}

fn forward_sequentially<T>(query: &Message, transport: &T) -> Result<Vec<Vec<Answer>>, Error>
where
    T: Transport + ?Sized,
{
    query
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let sub_query = make_sub_query(query, question, query.header.id);
            exchange(transport, index, &sub_query)
        })
        .collect()
}

fn forward_in_parallel<T>(query: &Message, transport: &T) -> Result<Vec<Vec<Answer>>, Error>
where
    T: Transport + Sync + ?Sized,
{
    let ids = distinct_random_ids(query.questions.len());
    thread::scope(|scope| {
        let handles: Vec<_> = query
            .questions
            .iter()
            .zip(ids)
            .enumerate()
            .map(|(index, (question, id))| {
                let sub_query = make_sub_query(query, question, id);
                scope.spawn(move || exchange(transport, index, &sub_query))
            })
            .collect();

        // Joining in spawn order puts the answers back in question
        // order, whatever order the replies arrived in.
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect()
    })
}

/// Sends one sub-query and returns the answer section of the reply.
fn exchange<T>(transport: &T, index: usize, sub_query: &Message) -> Result<Vec<Answer>, Error>
where
    T: Transport + ?Sized,
{
    let octets = sub_query.encode().map_err(Error::Encoding)?;
    let reply = transport
        .send(&octets)
        .map_err(|source| Error::Transport { index, source })?;
    let reply = Message::decode(&reply).map_err(|source| Error::InvalidReply { index, source })?;

    debug!(
        "Upstream reply {:#06x} for question {}: {:?}, {} answer(s)",
        reply.header.id,
        index,
        reply.header.flags.rcode,
        reply.answers.len(),
    );
    if reply.header.flags.tc {
        warn!(
            "Upstream reply {:#06x} for question {} is truncated; using it as-is",
            reply.header.id, index,
        );
    }
    Ok(reply.answers)
}

/// Builds the single-question query sent upstream for `question`.
fn make_sub_query(query: &Message, question: &Question, id: u16) -> Message {
    Message {
        header: Header {
            id,
            flags: Flags {
                qr: false,
                rcode: Rcode::NoError,
                ..query.header.flags
            },
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        },
        questions: vec![question.clone()],
        answers: Vec::new(),
    }
}

/// Returns `count` pairwise distinct random message IDs. `count` must
/// not exceed the number of possible IDs.
fn distinct_random_ids(count: usize) -> Vec<u16> {
    assert!(count <= 1 << 16, "cannot draw {} distinct IDs", count);
    let mut seen = HashSet::with_capacity(count);
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        let id = rand::random::<u16>();
        if seen.insert(id) {
            ids.push(id);
        }
    }
    ids
}

////////////////////////////////////////////////////////////////////////
// RESPONSES                                                          //
////////////////////////////////////////////////////////////////////////

/// Builds a response to `query` with the given RCODE and answers. The
/// header is the query's, with QR set and the counts matching the
/// sections; no authority or additional records are included.
fn make_response(query: &Message, rcode: Rcode, answers: Vec<Answer>) -> Message {
    let mut response = Message {
        header: Header {
            flags: Flags {
                qr: true,
                rcode,
                ..query.header.flags
            },
            nscount: 0,
            arcount: 0,
            ..query.header
        },
        questions: query.questions.clone(),
        answers,
    };
    if response.sync_counts().is_err() {
        // Encoding will fail with the same error; leave the counts
        // from the query in place until then.
        debug!("Response to {:#06x} has too many answers", query.header.id);
    }
    response
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a query could not be resolved.
///
/// Where a sub-query is at fault, `index` is the position of its
/// question in the original query.
#[derive(Debug)]
pub enum Error {
    Transport {
        index: usize,
        source: TransportError,
    },
    InvalidReply {
        index: usize,
        source: reader::Error,
    },
    Encoding(writer::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Transport { index, source } => {
                write!(f, "sub-query for question {}: {}", index, source)
            }
            Self::InvalidReply { index, source } => {
                write!(
                    f,
                    "invalid upstream reply for question {}: {}",
                    index, source
                )
            }
            Self::Encoding(err) => write!(f, "failed to encode sub-query: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::InvalidReply { source, .. } => Some(source),
            Self::Encoding(err) => Some(err),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
