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

//! Implementation of the blocking UDP receive/send loop.

// NOTE: I/O error handling in the receive/send loop is to exit the
// loop when *receiving* fails. Sends are logged and ignored instead,
// so we keep processing incoming messages as long as the receive
// portion continues to work.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info};

use crate::message::UDP_PAYLOAD_LIMIT;
use crate::server::{Response, Server};

/// A UDP socket serving DNS queries with blocking I/O.
///
/// Datagrams are processed one at a time: each is received, handed to
/// [`Server::handle_message`], and answered before the next is read.
/// The loop is started with [`UdpServer::run`] and stops when the
/// shutdown flag passed to it is set.
#[derive(Debug)]
pub struct UdpServer {
    socket: UdpSocket,
}

impl UdpServer {
    /// Binds the server's socket. This does not start serving.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(CHECK_FOR_SHUTDOWN_TIMEOUT))?;
        Ok(Self { socket })
    }

    /// Returns the address the server's socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs the receive/send loop until `shutdown` is set or receiving
    /// fails. Errors are logged as well as returned.
    pub fn run(&self, server: &Server, shutdown: &AtomicBool) -> io::Result<()> {
        if let Ok(addr) = self.socket.local_addr() {
            info!("Serving DNS over UDP on {}", addr);
        }
        let result = self.receive_loop(server, shutdown);
        log_io_errors(&result);
        result
    }

    fn receive_loop(&self, server: &Server, shutdown: &AtomicBool) -> io::Result<()> {
        let mut received_buf = [0; UDP_PAYLOAD_LIMIT];

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }

            // Receive a DNS message. If interrupted, we skip the rest of
            // the loop body and check for shutdown again before
            // retrying. Otherwise, repeated interruptions could in
            // theory prevent the call from ever timing out.
            let (received_len, src) = match self.socket.recv_from(&mut received_buf) {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            debug!("Received {} octets from {}", received_len, src);

            // Process the DNS message and send the response, if any.
            match server.handle_message(&received_buf[..received_len]) {
                Response::Single(response) => {
                    // Don't exit the loop if the send fails. (See the
                    // note at the beginning of the module.)
                    let sent = retry_if_interrupted(|| self.socket.send_to(&response, src));
                    log_io_errors(&sent);
                }
                Response::None => (),
            }
        }
    }
}

/// This defines the timeout on UDP receive operations. The loop checks
/// for shutdown between every receive, so this defines the *maximum*
/// interval between such checks. Consequently, it is the maximum amount
/// of time the shutdown procedure will have to wait for the loop to
/// finish up.
const CHECK_FOR_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs an I/O operation, retrying it for as long as it fails with
/// [`io::ErrorKind::Interrupted`].
fn retry_if_interrupted<F, R>(mut f: F) -> io::Result<R>
where
    F: FnMut() -> io::Result<R>,
{
    loop {
        match f() {
            Ok(r) => return Ok(r),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Logs the error if an I/O operation failed.
fn log_io_errors<T>(result: &io::Result<T>) {
    if let Err(e) = result {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("anonymous thread");
        error!("I/O error in thread {}: {}", thread_name, e);
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::thread;

    use super::*;
    use crate::message::Message;
    use crate::resolver::{Resolver, StaticRecordProvider};

    #[test]
    fn serves_until_shut_down() {
        let server = Server::new(Resolver::local(StaticRecordProvider::default()));
        let udp_server = UdpServer::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let server_addr = udp_server.local_addr().unwrap();
        let shutdown = AtomicBool::new(false);

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        thread::scope(|scope| {
            let loop_handle = scope.spawn(|| udp_server.run(&server, &shutdown));

            let query = b"\x00\x2a\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
                  \x07example\x03com\x00\x00\x01\x00\x01";
            client.send_to(query, server_addr).unwrap();
            let mut buf = [0; 512];
            let (len, from) = client.recv_from(&mut buf).unwrap();
            assert_eq!(from, server_addr);

            let response = Message::decode(&buf[..len]).unwrap();
            assert_eq!(response.header.id, 0x2a);
            assert!(response.header.flags.qr);
            assert_eq!(response.answers[0].ipv4(), Some(Ipv4Addr::new(8, 8, 8, 8)));

            shutdown.store(true, Ordering::Relaxed);
            assert!(loop_handle.join().unwrap().is_ok());
        });
    }

    #[test]
    fn retry_if_interrupted_retries() {
        let mut attempts = 0;
        let result = retry_if_interrupted(|| {
            attempts += 1;
            if attempts < 3 {
                Err(io::Error::from(io::ErrorKind::Interrupted))
            } else {
                Ok(attempts)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }
}
