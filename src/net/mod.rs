//! Network layer: how and where the client dials.
//!
//! - `proxy`: SOCKS5 proxy chains built from configured URLs.
//! - `resolver`: choice of the endpoint to dial, with SRV leak avoidance.
//! - `hidden_services`: well known onion services for public servers.

pub mod hidden_services;
pub mod proxy;
pub mod resolver;

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;

/// A bidirectional byte stream to a remote peer.
pub trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}

/// Opens streams to `host:port` addresses.
pub trait Dialer: Send + Sync {
    /// Connects to `addr` and returns the stream.
    fn dial(&self, addr: &str) -> Result<Box<dyn Stream>, NetError>;
}

/// Plain TCP connect, the innermost hop of every chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl Dialer for Direct {
    fn dial(&self, addr: &str) -> Result<Box<dyn Stream>, NetError> {
        let stream = TcpStream::connect(addr).map_err(|e| NetError::ConnectionFailed {
            address: String::from(addr),
            kind: e.kind(),
        })?;
        Ok(Box::new(stream))
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    /// TCP connect to the address failed.
    ConnectionFailed { address: String, kind: io::ErrorKind },
    /// Read or write on an established stream failed.
    Io(io::ErrorKind),
    /// Peer answered with something that is not valid for the protocol.
    HandshakeFailed(&'static str),
    /// Proxy does not accept any authentication method we offered.
    NoAcceptableAuth,
    /// Proxy rejected the username/password.
    AuthenticationRejected,
    /// Proxy refused the CONNECT request.
    ProxyRefused { code: u8 },
    /// Address is not `host:port` or cannot be encoded.
    InvalidAddress(String),
    /// Directory lookup returned no usable record.
    NoRecords { name: String },
    /// Directory lookup failed.
    LookupFailed { name: String, reason: String },
}

impl NetError {
    fn socks_reply_message(code: u8) -> &'static str {
        match code {
            0x01 => "general SOCKS server failure",
            0x02 => "connection not allowed by ruleset",
            0x03 => "network unreachable",
            0x04 => "host unreachable",
            0x05 => "connection refused",
            0x06 => "TTL expired",
            0x07 => "command not supported",
            0x08 => "address type not supported",
            _ => "unknown reply code",
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::ConnectionFailed { address, kind } => {
                write!(f, "Connection to {} failed: {}", address, io::Error::from(*kind))
            }
            NetError::Io(kind) => write!(f, "I/O error: {}", io::Error::from(*kind)),
            NetError::HandshakeFailed(what) => write!(f, "Handshake failed: {}", what),
            NetError::NoAcceptableAuth => {
                write!(f, "Proxy accepts none of the offered authentication methods")
            }
            NetError::AuthenticationRejected => write!(f, "Proxy rejected the credentials"),
            NetError::ProxyRefused { code } => write!(
                f,
                "Proxy refused connection: {} ({:#04x})",
                NetError::socks_reply_message(*code),
                code
            ),
            NetError::InvalidAddress(addr) => write!(f, "Invalid address format: {}", addr),
            NetError::NoRecords { name } => write!(f, "No SRV records for {}", name),
            NetError::LookupFailed { name, reason } => {
                write!(f, "Lookup of {} failed: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for NetError {}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        NetError::Io(err.kind())
    }
}
