//! Minimal DNS wire format codec (RFC 1035) for single-question A/AAAA lookups.
//!
//! Fields are read and written at explicit offsets with big-endian helpers;
//! every read is checked against the received length first.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{DnsError, ProtocolError, Section};

// DNS wire format constants
pub const HEADER_SIZE: usize = 12;
/// Largest datagram the codec builds or accepts
pub const MAX_MESSAGE_SIZE: usize = 65536;
/// Length cap on hostnames and server names
pub const MAX_HOSTNAME_LEN: usize = 256;
// RFC 1035: Maximum label length is 63 characters
const MAX_LABEL_LEN: usize = 63;
// TYPE(2) + CLASS(2) + TTL(4) + RDLENGTH(2)
const RECORD_FIXED_LEN: usize = 10;

const FLAG_QR: u16 = 0x8000;
const FLAG_AA: u16 = 0x0400;
const FLAG_TC: u16 = 0x0200;
const FLAG_RD: u16 = 0x0100;
const FLAG_RA: u16 = 0x0080;
const FLAG_Z: u16 = 0x0040;
const FLAG_AD: u16 = 0x0020;
const FLAG_CD: u16 = 0x0010;
const OPCODE_SHIFT: u16 = 11;
const OPCODE_MASK: u16 = 0x000F;
const FLAG_RCODE_MASK: u16 = 0x000F;

const LABEL_KIND_MASK: u8 = 0xC0;
const LABEL_NORMAL: u8 = 0x00;
const LABEL_POINTER: u8 = 0xC0;

const TYPE_A: u16 = 1;
const TYPE_AAAA: u16 = 28;
/// Internet class
pub const CLASS_IN: u16 = 1;

/// DNS response codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl ResponseCode {
    /// Create from the flags word; only the low 4 bits are used
    pub fn from_u16(value: u16) -> Self {
        match value & FLAG_RCODE_MASK {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NxDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            other => ResponseCode::Other(other as u8),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NxDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(v) => v & 0x0F,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::NoError => write!(f, "NOERROR"),
            ResponseCode::FormErr => write!(f, "FORMERR"),
            ResponseCode::ServFail => write!(f, "SERVFAIL"),
            ResponseCode::NxDomain => write!(f, "NXDOMAIN"),
            ResponseCode::NotImp => write!(f, "NOTIMP"),
            ResponseCode::Refused => write!(f, "REFUSED"),
            ResponseCode::Other(v) => write!(f, "RCODE{}", v),
        }
    }
}

/// DNS record types we care about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    Other(u16),
}

impl RecordType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            TYPE_A => RecordType::A,
            TYPE_AAAA => RecordType::AAAA,
            other => RecordType::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => TYPE_A,
            RecordType::AAAA => TYPE_AAAA,
            RecordType::Other(v) => v,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::Other(v) => write!(f, "TYPE{}", v),
        }
    }
}

/// Address family of a lookup; picks A or AAAA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFamily {
    V4,
    V6,
}

impl QueryFamily {
    /// Family matching the DNS server's own address
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => QueryFamily::V4,
            IpAddr::V6(_) => QueryFamily::V6,
        }
    }

    pub fn record_type(self) -> RecordType {
        match self {
            QueryFamily::V4 => RecordType::A,
            QueryFamily::V6 => RecordType::AAAA,
        }
    }

    fn address_len(self) -> usize {
        match self {
            QueryFamily::V4 => 4,
            QueryFamily::V6 => 16,
        }
    }
}

/// Fixed 12-byte message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: bool,
    pub ad: bool,
    pub cd: bool,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    /// Standard recursive query header with one question
    pub fn query(id: u16) -> Self {
        Header {
            id,
            rd: true,
            qdcount: 1,
            ..Header::default()
        }
    }

    pub fn flags(&self) -> u16 {
        let mut flags = (u16::from(self.opcode) & OPCODE_MASK) << OPCODE_SHIFT;
        flags |= u16::from(self.rcode) & FLAG_RCODE_MASK;
        for (set, bit) in [
            (self.qr, FLAG_QR),
            (self.aa, FLAG_AA),
            (self.tc, FLAG_TC),
            (self.rd, FLAG_RD),
            (self.ra, FLAG_RA),
            (self.z, FLAG_Z),
            (self.ad, FLAG_AD),
            (self.cd, FLAG_CD),
        ] {
            if set {
                flags |= bit;
            }
        }
        flags
    }

    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from_u16(u16::from(self.rcode))
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.flags().to_be_bytes());
        buf.extend_from_slice(&self.qdcount.to_be_bytes());
        buf.extend_from_slice(&self.ancount.to_be_bytes());
        buf.extend_from_slice(&self.nscount.to_be_bytes());
        buf.extend_from_slice(&self.arcount.to_be_bytes());
    }

    /// Read a header from the start of `buf`; `None` if fewer than 12 bytes
    pub fn read(buf: &[u8]) -> Option<Header> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let flags = read_u16(buf, 2);
        Some(Header {
            id: read_u16(buf, 0),
            qr: flags & FLAG_QR != 0,
            opcode: ((flags >> OPCODE_SHIFT) & OPCODE_MASK) as u8,
            aa: flags & FLAG_AA != 0,
            tc: flags & FLAG_TC != 0,
            rd: flags & FLAG_RD != 0,
            ra: flags & FLAG_RA != 0,
            z: flags & FLAG_Z != 0,
            ad: flags & FLAG_AD != 0,
            cd: flags & FLAG_CD != 0,
            rcode: (flags & FLAG_RCODE_MASK) as u8,
            qdcount: read_u16(buf, 4),
            ancount: read_u16(buf, 6),
            nscount: read_u16(buf, 8),
            arcount: read_u16(buf, 10),
        })
    }
}

/// An encoded query plus the context needed to check its reply
#[derive(Debug, Clone)]
pub struct Query {
    id: u16,
    family: QueryFamily,
    bytes: Vec<u8>,
}

impl Query {
    /// Encode a one-question query for `hostname`.
    ///
    /// Rejects names over 256 characters, empty names, empty labels and
    /// labels over 63 bytes. A single trailing dot is accepted.
    pub fn build(hostname: &str, family: QueryFamily, id: u16) -> Result<Query, DnsError> {
        if hostname.len() > MAX_HOSTNAME_LEN {
            return Err(DnsError::InvalidInput(format!(
                "hostname is too long ({} > {} chars)",
                hostname.len(),
                MAX_HOSTNAME_LEN
            )));
        }

        let mut bytes = Vec::with_capacity(HEADER_SIZE + hostname.len() + 6);
        Header::query(id).write_to(&mut bytes);
        encode_name(&mut bytes, hostname)?;
        bytes.extend_from_slice(&family.record_type().to_u16().to_be_bytes());
        bytes.extend_from_slice(&CLASS_IN.to_be_bytes());

        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(DnsError::InvalidInput(format!(
                "encoded query exceeds {} bytes",
                MAX_MESSAGE_SIZE
            )));
        }

        Ok(Query { id, family, bytes })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn family(&self) -> QueryFamily {
        self.family
    }

    pub fn record_type(&self) -> RecordType {
        self.family.record_type()
    }

    pub fn record_class(&self) -> u16 {
        CLASS_IN
    }

    /// Full datagram to send
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Question section: encoded name, QTYPE and QCLASS
    pub fn question(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }
}

/// Encode `hostname` as length-prefixed labels with a zero terminator
pub fn encode_name(buf: &mut Vec<u8>, hostname: &str) -> Result<(), DnsError> {
    let name = hostname.strip_suffix('.').unwrap_or(hostname);
    if name.is_empty() {
        return Err(DnsError::InvalidInput("hostname is empty".to_string()));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(DnsError::InvalidInput(format!(
                "empty label in hostname: {}",
                hostname
            )));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsError::InvalidInput(format!(
                "label exceeds {} bytes in hostname: {}",
                MAX_LABEL_LEN, hostname
            )));
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
    Ok(())
}

/// The first answer of a validated reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
    pub addr: IpAddr,
    pub ttl: u32,
}

/// Validate `reply` against `query` and extract the first answer's address.
///
/// Checks run in wire order and the first failure wins; nothing past a
/// failed check is inspected.
pub fn parse_answer(query: &Query, reply: &[u8]) -> Result<Answer, ProtocolError> {
    let header = Header::read(reply).ok_or(ProtocolError::TooShort(Section::Header))?;

    if header.id != query.id() {
        return Err(ProtocolError::TransactionIdMismatch {
            expected: query.id(),
            received: header.id,
        });
    }
    if !header.qr {
        return Err(ProtocolError::NotAResponse);
    }
    let rcode = header.response_code();
    if rcode != ResponseCode::NoError {
        return Err(ProtocolError::ServerFailure(rcode));
    }

    let question = query.question();
    let mut pos = HEADER_SIZE;
    if reply.len() < pos + question.len() {
        return Err(ProtocolError::TooShort(Section::Question));
    }
    if &reply[pos..pos + question.len()] != question {
        return Err(ProtocolError::QuestionMismatch);
    }
    pos += question.len();

    if header.ancount == 0 {
        return Err(ProtocolError::NoAnswer);
    }

    if reply.len() < pos + 2 {
        return Err(ProtocolError::TooShort(Section::Answer));
    }
    pos = skip_answer_name(reply, pos)?;

    if reply.len() < pos + RECORD_FIXED_LEN {
        return Err(ProtocolError::TooShort(Section::RecordHeader));
    }
    let rtype = read_u16(reply, pos);
    let rclass = read_u16(reply, pos + 2);
    let ttl = read_u32(reply, pos + 4);
    let rdlength = read_u16(reply, pos + 8);
    pos += RECORD_FIXED_LEN;

    let qtype = query.record_type().to_u16();
    if rtype != qtype {
        return Err(ProtocolError::TypeMismatch {
            expected: qtype,
            received: rtype,
        });
    }
    if rclass != query.record_class() {
        return Err(ProtocolError::ClassMismatch {
            expected: query.record_class(),
            received: rclass,
        });
    }

    let data_len = usize::from(rdlength);
    if reply.len() < pos + data_len {
        return Err(ProtocolError::TooShort(Section::RecordData));
    }
    if data_len != query.family().address_len() {
        return Err(ProtocolError::UnmanagedDataSize(rdlength));
    }

    let data = &reply[pos..pos + data_len];
    let addr = match query.family() {
        QueryFamily::V4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(data);
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        QueryFamily::V6 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(data);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
    };

    Ok(Answer { addr, ttl })
}

/// Skip the owner name of an answer record without decompressing it.
///
/// A name is a run of normal labels ending either in the zero terminator or
/// in a compression pointer. Pointers are never followed.
fn skip_answer_name(buf: &[u8], start: usize) -> Result<usize, ProtocolError> {
    let mut pos = start;

    loop {
        let first = *buf
            .get(pos)
            .ok_or(ProtocolError::TooShort(Section::Answer))?;

        match first & LABEL_KIND_MASK {
            LABEL_NORMAL if first == 0 => return Ok(pos + 1),
            LABEL_NORMAL => {
                // Lower 6 bits are the label length, so it is at most 63
                pos += 1 + usize::from(first);
                if pos > buf.len() {
                    return Err(ProtocolError::TooShort(Section::Answer));
                }
            }
            LABEL_POINTER => {
                if pos + 2 > buf.len() {
                    return Err(ProtocolError::TooShort(Section::Answer));
                }
                return Ok(pos + 2);
            }
            _ => return Err(ProtocolError::UnsupportedLabel(first)),
        }
    }
}

/// Space-separated hex rendering for packet tracing
pub fn hex_dump(buf: &[u8]) -> String {
    let mut out = String::with_capacity(buf.len() * 3);
    for (i, byte) in buf.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

fn read_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([buf[pos], buf[pos + 1]])
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

// ==================== Helper for building DNS replies (tests) ====================
