//! Single query/reply exchange with a DNS server over UDP.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, trace, warn};

use crate::dns::wire::{hex_dump, MAX_MESSAGE_SIZE};
use crate::error::DnsError;

/// Transport seam between the resolver and the network.
///
/// - `UdpTransport`: one UDP datagram each way
/// - tests substitute canned replies
pub trait DnsTransport: Send + Sync {
    /// Send `query` to `server` and return the raw bytes of one reply.
    ///
    /// `timeout` of `None` blocks until a datagram arrives.
    fn exchange(
        &self,
        query: &[u8],
        server: SocketAddr,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DnsError>;
}

/// UDP transport; the socket lives only for the duration of one exchange
#[derive(Debug, Clone)]
pub struct UdpTransport {
    verify_source: bool,
}

impl UdpTransport {
    pub fn new(verify_source: bool) -> Self {
        Self { verify_source }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DnsTransport for UdpTransport {
    fn exchange(
        &self,
        query: &[u8],
        server: SocketAddr,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DnsError> {
        let socket = open_socket(server)?;

        trace!(server = %server, packet = %hex_dump(query), "Sending DNS query");
        let sent = socket.send_to(query, server).map_err(DnsError::Send)?;
        if sent != query.len() {
            return Err(DnsError::SendSizeMismatch {
                expected: query.len(),
                sent,
            });
        }

        apply_timeout(&socket, timeout)?;
        debug!(server = %server, bytes = sent, timeout = ?timeout, "Waiting for DNS reply");

        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if is_timeout(&e) => return Err(DnsError::Timeout),
            Err(e) => return Err(DnsError::Receive(e)),
        };

        if len == 0 {
            return Err(DnsError::EmptyReply);
        }

        // Anti-spoofing: the reply must come from the server we asked
        if self.verify_source && !same_endpoint(&from, &server) {
            warn!(
                from = %from,
                expected = %server,
                "DNS response from unexpected source (spoofing detected)"
            );
            return Err(DnsError::SpoofingDetected {
                expected: server,
                from,
            });
        }

        buf.truncate(len);
        trace!(from = %from, packet = %hex_dump(&buf), "Received DNS reply");
        Ok(buf)
    }
}

/// Open a UDP socket of the server's address family, bound to an ephemeral port
pub fn open_socket(server: SocketAddr) -> Result<UdpSocket, DnsError> {
    let socket = Socket::new(Domain::for_address(server), Type::DGRAM, Some(Protocol::UDP))
        .map_err(DnsError::Socket)?;

    let bind_addr = if server.is_ipv4() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
    } else {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
    };
    socket.bind(&bind_addr.into()).map_err(DnsError::Socket)?;

    Ok(socket.into())
}

/// A zero timeout polls: only a reply already queued is accepted
fn apply_timeout(socket: &UdpSocket, timeout: Option<Duration>) -> Result<(), DnsError> {
    match timeout {
        None => Ok(()),
        Some(d) if d.is_zero() => socket.set_nonblocking(true).map_err(DnsError::Socket),
        Some(d) => socket.set_read_timeout(Some(d)).map_err(DnsError::Socket),
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

// IPv6 sources may carry flow info or scope ids the server address lacks
fn same_endpoint(a: &SocketAddr, b: &SocketAddr) -> bool {
    a.ip() == b.ip() && a.port() == b.port()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn local_server() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    #[test]
    fn test_exchange_returns_reply_bytes() {
        let (server, addr) = local_server();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (len, client) = server.recv_from(&mut buf).unwrap();
            let mut reply = buf[..len].to_vec();
            reply.push(0xAA);
            server.send_to(&reply, client).unwrap();
        });

        let transport = UdpTransport::default();
        let reply = transport
            .exchange(&[1, 2, 3], addr, Some(Duration::from_secs(5)))
            .unwrap();
        handle.join().unwrap();
        assert_eq!(reply, vec![1, 2, 3, 0xAA]);
    }

    #[test]
    fn test_zero_timeout_fails_fast() {
        let (_server, addr) = local_server();
        let transport = UdpTransport::default();

        let started = Instant::now();
        let result = transport.exchange(&[0u8; 12], addr, Some(Duration::ZERO));
        assert!(matches!(result, Err(DnsError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_short_timeout_reports_timeout() {
        let (_server, addr) = local_server();
        let transport = UdpTransport::default();
        let result = transport.exchange(&[0u8; 12], addr, Some(Duration::from_millis(50)));
        assert!(result.unwrap_err().is_timeout());
    }

    #[test]
    fn test_empty_reply() {
        let (server, addr) = local_server();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (_, client) = server.recv_from(&mut buf).unwrap();
            server.send_to(&[], client).unwrap();
        });

        let transport = UdpTransport::default();
        let result = transport.exchange(&[9, 9], addr, Some(Duration::from_secs(5)));
        handle.join().unwrap();
        assert!(matches!(result, Err(DnsError::EmptyReply)));
    }

    #[test]
    fn test_reply_from_other_port_is_spoofing() {
        let (server, addr) = local_server();
        let (imposter, _) = local_server();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (len, client) = server.recv_from(&mut buf).unwrap();
            imposter.send_to(&buf[..len], client).unwrap();
        });

        let transport = UdpTransport::new(true);
        let result = transport.exchange(&[7, 7, 7], addr, Some(Duration::from_secs(5)));
        handle.join().unwrap();
        assert!(matches!(result, Err(DnsError::SpoofingDetected { .. })));
    }

    #[test]
    fn test_source_check_can_be_disabled() {
        let (server, addr) = local_server();
        let (imposter, _) = local_server();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (len, client) = server.recv_from(&mut buf).unwrap();
            imposter.send_to(&buf[..len], client).unwrap();
        });

        let transport = UdpTransport::new(false);
        let reply = transport
            .exchange(&[7, 7, 7], addr, Some(Duration::from_secs(5)))
            .unwrap();
        handle.join().unwrap();
        assert_eq!(reply, vec![7, 7, 7]);
    }

    #[test]
    fn test_open_socket_matches_family() {
        let v4 = open_socket("127.0.0.1:53".parse().unwrap()).unwrap();
        assert!(v4.local_addr().unwrap().is_ipv4());
    }

    #[test]
    fn test_same_endpoint_ignores_scope() {
        let a: SocketAddr = "[fe80::1%2]:53".parse().unwrap();
        let b: SocketAddr = "[fe80::1]:53".parse().unwrap();
        assert!(same_endpoint(&a, &b));
        let c: SocketAddr = "[fe80::1]:54".parse().unwrap();
        assert!(!same_endpoint(&b, &c));
    }
}
