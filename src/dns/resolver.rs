//! Resolve a hostname against one named DNS server.
//!
//! The lookup runs encode, exchange and decode exactly once; retries and
//! failover are left to the caller.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

use crate::dns::transport::{DnsTransport, UdpTransport};
use crate::dns::wire::{parse_answer, Answer, Query, QueryFamily, MAX_HOSTNAME_LEN};
use crate::error::DnsError;

/// Standard DNS port
pub const DNS_PORT: u16 = 53;

/// Resolves the DNS server's own name when it is not a literal address
pub trait ServerNameResolver: Send + Sync {
    fn resolve_ipv4(&self, name: &str) -> Option<Ipv4Addr>;
}

/// Server-name lookup through the operating system resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNameResolver;

impl ServerNameResolver for SystemNameResolver {
    fn resolve_ipv4(&self, name: &str) -> Option<Ipv4Addr> {
        (name, DNS_PORT)
            .to_socket_addrs()
            .ok()?
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
    }
}

/// Per-lookup settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub port: u16,
    /// `None` waits forever for the reply
    pub timeout: Option<Duration>,
    pub verify_source: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            port: DNS_PORT,
            timeout: None,
            verify_source: true,
        }
    }
}

/// Negative seconds mean "block indefinitely"
pub fn timeout_from_seconds(seconds: i64) -> Option<Duration> {
    u64::try_from(seconds).ok().map(Duration::from_secs)
}

/// Pick the server address: literal IPv4, then literal IPv6, then a name lookup (IPv4 only)
pub fn resolve_server_addr<N: ServerNameResolver>(
    servername: &str,
    names: &N,
) -> Result<IpAddr, DnsError> {
    if let Ok(v4) = servername.parse::<Ipv4Addr>() {
        return Ok(IpAddr::V4(v4));
    }
    if let Ok(v6) = servername.parse::<Ipv6Addr>() {
        return Ok(IpAddr::V6(v6));
    }
    names
        .resolve_ipv4(servername)
        .map(IpAddr::V4)
        .ok_or_else(|| DnsError::Resolution(servername.to_string()))
}

/// Resolver bound to a transport and a server-name lookup
pub struct SpecificResolver<T = UdpTransport, N = SystemNameResolver> {
    transport: T,
    names: N,
    options: QueryOptions,
}

impl SpecificResolver {
    /// UDP transport and system server-name lookup
    pub fn new(options: QueryOptions) -> Self {
        let transport = UdpTransport::new(options.verify_source);
        Self::with_parts(transport, SystemNameResolver, options)
    }
}

impl<T: DnsTransport, N: ServerNameResolver> SpecificResolver<T, N> {
    pub fn with_parts(transport: T, names: N, options: QueryOptions) -> Self {
        Self {
            transport,
            names,
            options,
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Resolve `hostname` at `servername` and return the address as text
    pub fn resolve(&self, servername: &str, hostname: &str) -> Result<String, DnsError> {
        self.lookup(servername, hostname)
            .map(|answer| answer.addr.to_string())
    }

    /// Resolve `hostname` at `servername`, keeping the answer's TTL
    pub fn lookup(&self, servername: &str, hostname: &str) -> Result<Answer, DnsError> {
        match self.lookup_inner(servername, hostname) {
            Ok(answer) => {
                debug!(
                    server = %servername,
                    hostname = %hostname,
                    addr = %answer.addr,
                    ttl = answer.ttl,
                    "Specific DNS lookup succeeded"
                );
                Ok(answer)
            }
            Err(e) => {
                warn!(
                    server = %servername,
                    hostname = %hostname,
                    error = %e,
                    "Specific DNS lookup failed"
                );
                Err(e)
            }
        }
    }

    fn lookup_inner(&self, servername: &str, hostname: &str) -> Result<Answer, DnsError> {
        // Length guards run before any lookup touches the network
        check_len("server name", servername)?;
        check_len("hostname", hostname)?;

        let server_ip = resolve_server_addr(servername, &self.names)?;
        let family = QueryFamily::of(&server_ip);
        let query = Query::build(hostname, family, transaction_id())?;
        let server = SocketAddr::new(server_ip, self.options.port);

        debug!(
            server = %server,
            hostname = %hostname,
            qtype = %query.record_type(),
            id = query.id(),
            "Sending specific DNS query"
        );

        let reply = self
            .transport
            .exchange(query.as_bytes(), server, self.options.timeout)?;
        Ok(parse_answer(&query, &reply)?)
    }
}

/// Resolve `hostname` to an address string using the DNS server `servername` on port 53.
///
/// A negative `timeout_seconds` waits forever for the reply.
pub fn get_host_by_name_spec_dns(
    servername: &str,
    hostname: &str,
    timeout_seconds: i64,
) -> Result<String, DnsError> {
    let options = QueryOptions {
        timeout: timeout_from_seconds(timeout_seconds),
        ..QueryOptions::default()
    };
    SpecificResolver::new(options).resolve(servername, hostname)
}

fn check_len(what: &str, name: &str) -> Result<(), DnsError> {
    if name.len() > MAX_HOSTNAME_LEN {
        return Err(DnsError::InvalidInput(format!(
            "{} is too long ({} > {} chars)",
            what,
            name.len(),
            MAX_HOSTNAME_LEN
        )));
    }
    Ok(())
}

// Process id is unique enough: concurrent lookups are matched by socket, not id
fn transaction_id() -> u16 {
    std::process::id() as u16
}
