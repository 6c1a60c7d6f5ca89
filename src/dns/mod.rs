//! DNS lookups against one explicitly named server.

pub mod resolver;
pub mod transport;
pub mod wire;

pub use resolver::{
    get_host_by_name_spec_dns, timeout_from_seconds, QueryOptions, ServerNameResolver,
    SpecificResolver, SystemNameResolver, DNS_PORT,
};
pub use transport::{DnsTransport, UdpTransport};
pub use wire::{Answer, QueryFamily};
