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

//! Sending queries to the upstream resolver.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::debug;

use crate::message::{HEADER_SIZE, UDP_PAYLOAD_LIMIT};

////////////////////////////////////////////////////////////////////////
// TRANSPORT TRAIT                                                    //
////////////////////////////////////////////////////////////////////////

/// A synchronous request/response channel to an upstream resolver.
///
/// [`Transport::send`] takes an encoded query and returns the encoded
/// reply to that query. Implementations must bound the time they wait
/// and must only return a reply whose ID matches the query's.
///
/// Closures with the right signature are transports too, which is
/// mostly useful for testing.
pub trait Transport {
    fn send(&self, query: &[u8]) -> Result<Vec<u8>, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, TransportError>,
{
    fn send(&self, query: &[u8]) -> Result<Vec<u8>, TransportError> {
        self(query)
    }
}

////////////////////////////////////////////////////////////////////////
// UDP TRANSPORT                                                      //
////////////////////////////////////////////////////////////////////////

/// A [`Transport`] that sends each query in a UDP datagram from a
/// fresh ephemeral socket.
///
/// The socket is connected to the upstream, so datagrams from other
/// sources are filtered out by the operating system. Datagrams from
/// the upstream whose ID does not match the query are discarded, and
/// waiting continues until the timeout runs out. Replies are read into
/// a 512-octet buffer; anything beyond that is lost.
#[derive(Clone, Debug)]
pub struct UdpTransport {
    upstream: SocketAddr,
    timeout: Duration,
}

impl UdpTransport {
    /// Creates a new `UdpTransport` for the given upstream. Returns
    /// [`None`] if `timeout` is zero.
    pub fn new(upstream: SocketAddr, timeout: Duration) -> Option<Self> {
        if timeout.is_zero() {
            None
        } else {
            Some(Self { upstream, timeout })
        }
    }

    /// Returns the address of the upstream resolver.
    pub fn upstream(&self) -> SocketAddr {
        self.upstream
    }

    /// Returns how long [`Transport::send`] waits for a reply.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn bind(&self) -> io::Result<UdpSocket> {
        let local: SocketAddr = match self.upstream {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(self.upstream)?;
        Ok(socket)
    }
}

impl Transport for UdpTransport {
    fn send(&self, query: &[u8]) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let socket = self.bind().map_err(TransportError::Bind)?;
        socket.send(query).map_err(TransportError::Send)?;

        let mut buf = [0; UDP_PAYLOAD_LIMIT];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::TimedOut);
            }
            socket
                .set_read_timeout(Some(remaining))
                .map_err(TransportError::Receive)?;

            let len = match socket.recv(&mut buf) {
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Err(TransportError::TimedOut)
                }
                Err(e) => return Err(TransportError::Receive(e)),
            };

            let reply = &buf[..len];
            if reply.len() < HEADER_SIZE {
                return Err(TransportError::ReplyTooShort);
            } else if query.get(0..2) != Some(&reply[0..2]) {
                debug!(
                    "Discarding reply from {} with mismatched ID {:#06x}",
                    self.upstream,
                    u16::from_be_bytes([reply[0], reply[1]]),
                );
                continue;
            }
            return Ok(reply.to_vec());
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a query could not be exchanged with the
/// upstream resolver.
#[derive(Debug)]
pub enum TransportError {
    /// The local socket could not be set up.
    Bind(io::Error),

    /// The query could not be sent.
    Send(io::Error),

    /// Waiting for the reply failed for a reason other than the
    /// timeout.
    Receive(io::Error),

    /// No matching reply arrived in time.
    TimedOut,

    /// The upstream sent a datagram too short to be a DNS message.
    ReplyTooShort,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bind(_) => f.write_str("failed to set up upstream socket"),
            Self::Send(_) => f.write_str("failed to send query upstream"),
            Self::Receive(_) => f.write_str("failed to receive upstream reply"),
            Self::TimedOut => f.write_str("timed out waiting for upstream reply"),
            Self::ReplyTooShort => f.write_str("upstream reply is too short"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind(err) | Self::Send(err) | Self::Receive(err) => Some(err),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const QUERY: &[u8] = b"\xab\xcd\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
          \x01a\x00\x00\x01\x00\x01";

    /// Binds a loopback socket standing in for the upstream resolver.
    fn fake_upstream() -> (UdpSocket, UdpTransport) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        let transport = UdpTransport::new(addr, Duration::from_millis(500)).unwrap();
        (socket, transport)
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let addr = "127.0.0.1:53".parse().unwrap();
        assert!(UdpTransport::new(addr, Duration::ZERO).is_none());
    }

    #[test]
    fn udp_transport_returns_matching_reply() {
        let (upstream, transport) = fake_upstream();
        let responder = thread::spawn(move || {
            let mut buf = [0; 512];
            let (len, client) = upstream.recv_from(&mut buf).unwrap();
            assert_eq!(&buf[..len], QUERY);

            // A stale reply first, and then the real one.
            let mut stale = buf[..len].to_vec();
            stale[0] ^= 0xff;
            stale[2] |= 0x80;
            upstream.send_to(&stale, client).unwrap();
            let mut reply = buf[..len].to_vec();
            reply[2] |= 0x80;
            upstream.send_to(&reply, client).unwrap();
            reply
        });

        let reply = transport.send(QUERY).unwrap();
        assert_eq!(reply, responder.join().unwrap());
    }

    #[test]
    fn udp_transport_times_out() {
        let (_upstream, transport) = fake_upstream();
        let started = Instant::now();
        assert!(matches!(
            transport.send(QUERY),
            Err(TransportError::TimedOut)
        ));
        assert!(started.elapsed() >= transport.timeout() / 2);
    }

    #[test]
    fn udp_transport_rejects_short_reply() {
        let (upstream, transport) = fake_upstream();
        let responder = thread::spawn(move || {
            let mut buf = [0; 512];
            let (_, client) = upstream.recv_from(&mut buf).unwrap();
            upstream.send_to(&buf[..4], client).unwrap();
        });
        assert!(matches!(
            transport.send(QUERY),
            Err(TransportError::ReplyTooShort)
        ));
        responder.join().unwrap();
    }

    #[test]
    fn closures_are_transports() {
        let echo = |query: &[u8]| -> Result<Vec<u8>, TransportError> { Ok(query.to_vec()) };
        assert_eq!(echo.send(QUERY).unwrap(), QUERY);
    }
}
