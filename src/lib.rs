//! dnsprobe - resolve a hostname against one specific DNS server.
//!
//! Queries go straight to the named server over UDP, bypassing the
//! operating system resolver and its cache. Exposed as a library for
//! embedding and testing; the binary is a thin wrapper.

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod logging;

pub use dns::get_host_by_name_spec_dns;
pub use error::{DnsError, ProtocolError};
