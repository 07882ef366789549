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

//! A minimal forwarding DNS server.
//!
//! The crate is split into the wire-level pieces and the pieces that
//! move datagrams around:
//!
//! * [`name`] encodes and decodes domain names, including compressed
//!   names read from untrusted messages;
//! * [`message`] encodes and decodes DNS messages (header, questions,
//!   and answers) and provides the [`Message`](message::Message)
//!   model;
//! * [`resolver`] turns a decoded query into a response, either by
//!   forwarding each question to an upstream resolver or by asking a
//!   local [`RecordProvider`](resolver::RecordProvider);
//! * [`server`] wraps the resolver with per-datagram error handling;
//!   and
//! * [`io`] runs the blocking UDP receive/handle/send loop.

pub mod class;
pub mod io;
pub mod message;
pub mod name;
pub mod resolver;
pub mod rr;
pub mod server;
mod util;
