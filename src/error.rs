//! Structured error types for the resolver.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::dns::wire::ResponseCode;

/// Main error type for a single resolve call
#[derive(Debug)]
pub enum DnsError {
    /// Hostname or server name rejected before any network I/O
    InvalidInput(String),
    /// Server name is neither a literal address nor resolvable
    Resolution(String),
    /// UDP socket could not be created or configured
    Socket(io::Error),
    /// Sending the query failed
    Send(io::Error),
    /// The OS accepted fewer bytes than the query holds
    SendSizeMismatch { expected: usize, sent: usize },
    /// No reply arrived before the receive timeout
    Timeout,
    /// Receiving the reply failed
    Receive(io::Error),
    /// A zero-length datagram arrived
    EmptyReply,
    /// Reply came from an address other than the queried server
    SpoofingDetected { expected: SocketAddr, from: SocketAddr },
    /// The reply is malformed or does not match the query
    Protocol(ProtocolError),
}

impl DnsError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DnsError::Timeout)
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, DnsError::Protocol(_))
    }
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DnsError::Resolution(name) => {
                write!(f, "Cannot resolve DNS server address: {}", name)
            }
            DnsError::Socket(e) => write!(f, "UDP socket error: {}", e),
            DnsError::Send(e) => write!(f, "DNS query send failed: {}", e),
            DnsError::SendSizeMismatch { expected, sent } => write!(
                f,
                "DNS query send incomplete: sent {} of {} bytes",
                sent, expected
            ),
            DnsError::Timeout => write!(f, "DNS query timeout"),
            DnsError::Receive(e) => write!(f, "DNS reply receive failed: {}", e),
            DnsError::EmptyReply => write!(f, "DNS reply was empty"),
            DnsError::SpoofingDetected { expected, from } => write!(
                f,
                "DNS response spoofing detected: reply from {} instead of {}",
                from, expected
            ),
            DnsError::Protocol(e) => write!(f, "DNS protocol error: {}", e),
        }
    }
}

impl std::error::Error for DnsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DnsError::Socket(e) | DnsError::Send(e) | DnsError::Receive(e) => Some(e),
            DnsError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProtocolError> for DnsError {
    fn from(err: ProtocolError) -> Self {
        DnsError::Protocol(err)
    }
}

/// Part of the reply that was cut short
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Question,
    Answer,
    RecordHeader,
    RecordData,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Header => "header",
            Section::Question => "question",
            Section::Answer => "answer name",
            Section::RecordHeader => "answer record",
            Section::RecordData => "answer data",
        };
        f.write_str(name)
    }
}

/// Reply validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    TooShort(Section),
    TransactionIdMismatch { expected: u16, received: u16 },
    NotAResponse,
    ServerFailure(ResponseCode),
    QuestionMismatch,
    NoAnswer,
    UnsupportedLabel(u8),
    TypeMismatch { expected: u16, received: u16 },
    ClassMismatch { expected: u16, received: u16 },
    UnmanagedDataSize(u16),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::TooShort(section) => {
                write!(f, "reply too short to hold the {}", section)
            }
            ProtocolError::TransactionIdMismatch { expected, received } => write!(
                f,
                "transaction id {:#06x} does not match query id {:#06x}",
                received, expected
            ),
            ProtocolError::NotAResponse => write!(f, "reply is not a response (QR bit not set)"),
            ProtocolError::ServerFailure(rcode) => write!(f, "server answered {}", rcode),
            ProtocolError::QuestionMismatch => {
                write!(f, "question in reply differs from the one sent")
            }
            ProtocolError::NoAnswer => write!(f, "reply holds no answer record"),
            ProtocolError::UnsupportedLabel(byte) => {
                write!(f, "unmanaged label format {:#04x} in answer name", byte)
            }
            ProtocolError::TypeMismatch { expected, received } => write!(
                f,
                "answer type {} differs from query type {}",
                received, expected
            ),
            ProtocolError::ClassMismatch { expected, received } => write!(
                f,
                "answer class {} differs from query class {}",
                received, expected
            ),
            ProtocolError::UnmanagedDataSize(len) => {
                write!(f, "unmanaged data size {} for the queried family", len)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_yaml_ng::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Cannot read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Invalid config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Convenience type alias for Results using DnsError
pub type Result<T> = std::result::Result<T, DnsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_invalid_input_display() {
        let err = DnsError::InvalidInput("hostname too long".to_string());
        assert_eq!(err.to_string(), "Invalid input: hostname too long");
    }

    #[test]
    fn test_resolution_display() {
        let err = DnsError::Resolution("no.such.server".to_string());
        assert!(err.to_string().contains("no.such.server"));
    }

    #[test]
    fn test_send_size_mismatch_display() {
        let err = DnsError::SendSizeMismatch {
            expected: 33,
            sent: 20,
        };
        assert_eq!(
            err.to_string(),
            "DNS query send incomplete: sent 20 of 33 bytes"
        );
    }

    #[test]
    fn test_timeout_is_distinct() {
        assert!(DnsError::Timeout.is_timeout());
        assert!(!DnsError::EmptyReply.is_timeout());
        let recv = DnsError::Receive(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(!recv.is_timeout());
        assert!(DnsError::Timeout.to_string().contains("timeout"));
    }

    #[test]
    fn test_spoofing_display() {
        let err = DnsError::SpoofingDetected {
            expected: "9.9.9.9:53".parse().unwrap(),
            from: "10.0.0.1:53".parse().unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("spoofing"));
        assert!(msg.contains("10.0.0.1:53"));
        assert!(msg.contains("9.9.9.9:53"));
    }

    #[test]
    fn test_protocol_from_and_source() {
        let err: DnsError = ProtocolError::QuestionMismatch.into();
        assert!(err.is_protocol());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn test_io_source() {
        let err = DnsError::Send(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(err.source().is_some());
        assert!(DnsError::Timeout.source().is_none());
    }

    #[test]
    fn test_too_short_names_section() {
        let err = ProtocolError::TooShort(Section::RecordData);
        assert_eq!(err.to_string(), "reply too short to hold the answer data");
    }

    #[test]
    fn test_transaction_id_display() {
        let err = ProtocolError::TransactionIdMismatch {
            expected: 0x1234,
            received: 0xbeef,
        };
        assert_eq!(
            err.to_string(),
            "transaction id 0xbeef does not match query id 0x1234"
        );
    }

    #[test]
    fn test_unmanaged_size_display() {
        let err = ProtocolError::UnmanagedDataSize(4);
        assert!(err.to_string().contains("unmanaged data size 4"));
    }

    #[test]
    fn test_server_failure_display() {
        let err = ProtocolError::ServerFailure(ResponseCode::NxDomain);
        assert_eq!(err.to_string(), "server answered NXDOMAIN");
    }

    #[test]
    fn test_config_error_from_yaml() {
        let yaml_err = serde_yaml_ng::from_str::<u16>("not a number").unwrap_err();
        let err: ConfigError = yaml_err.into();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Invalid config file"));
    }

    #[test]
    fn test_dns_error_debug() {
        let debug_str = format!("{:?}", DnsError::EmptyReply);
        assert!(debug_str.contains("EmptyReply"));
    }
}
