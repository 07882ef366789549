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

//! Implementation of reading and writing of DNS messages.
//!
//! Wire-level access is through [`Reader`] and [`Writer`] (and the
//! standalone header and record encoders). [`Message`] is the owned
//! form the rest of the crate passes around.

mod answer;
mod constants;
mod header;
mod model;
mod opcode;
mod question;
mod rcode;
pub mod reader;
pub mod writer;
pub use answer::{Answer, RdataTooLongError};
pub use constants::{HEADER_SIZE, UDP_PAYLOAD_LIMIT};
pub use header::{decode_flags, decode_header, encode_flags, encode_header, Flags, Header};
pub use model::Message;
pub use opcode::{IntoOpcodeError, Opcode};
pub use question::{Qclass, Qtype, Question};
pub use rcode::{IntoRcodeError, Rcode};
pub use reader::Reader;
pub use writer::{encode_answer, encode_message, encode_question, Writer};
