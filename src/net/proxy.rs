//! Proxy chains.
//!
//! Configured proxies are listed outermost first: entry 0 is the hop that sees
//! the destination, the last entry is the only one the client connects to
//! directly. The chain is built by wrapping from the last entry backwards.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::io::{Read, Write};
use std::net::IpAddr;

use url::Url;
use zeroize::Zeroizing;

use super::{Direct, Dialer, NetError, Stream};
use crate::error::BootstrapError;

/// URL schemes accepted for proxies. Both resolve the destination on the proxy.
pub const SUPPORTED_SCHEMES: &[&str] = &["socks5", "socks5h"];

const SOCKS_VERSION: u8 = 0x05;
const AUTH_NONE: u8 = 0x00;
const AUTH_USER_PASS: u8 = 0x02;
const AUTH_NO_ACCEPTABLE: u8 = 0xff;
const USER_PASS_VERSION: u8 = 0x01;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Username/password from the proxy URL (RFC 1929).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Zeroizing<String>,
}

/// One validated proxy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHop {
    url: String,
    address: String,
    credentials: Option<Credentials>,
}

impl ProxyHop {
    /// Parses and validates a proxy URL.
    ///
    /// # Errors
    /// - `InvalidProxyUrl` if `proxy` is not a URL.
    /// - `UnsupportedProxy` for other schemes or a missing host or port.
    pub fn parse(proxy: &str) -> Result<Self, BootstrapError> {
        let url = Url::parse(proxy).map_err(|e| BootstrapError::InvalidProxyUrl {
            proxy: String::from(proxy),
            reason: e.to_string(),
        })?;

        let unsupported = |reason: String| BootstrapError::UnsupportedProxy {
            proxy: String::from(proxy),
            reason,
        };

        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(unsupported(format!("unsupported scheme {:?}", url.scheme())));
        }
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(unsupported(String::from("missing proxy host"))),
        };
        let port = url
            .port()
            .ok_or_else(|| unsupported(String::from("missing proxy port")))?;

        let credentials = if url.username().is_empty() {
            None
        } else {
            Some(Credentials {
                username: String::from(url.username()),
                password: Zeroizing::new(String::from(url.password().unwrap_or(""))),
            })
        };

        Ok(Self {
            url: String::from(proxy),
            address: format!("{}:{}", host, port),
            credentials,
        })
    }

    /// The URL as configured.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `host:port` of the proxy itself.
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// A SOCKS5 hop that reaches its proxy through `forward`.
pub struct Socks5 {
    hop: ProxyHop,
    forward: Arc<dyn Dialer>,
}

impl Socks5 {
    pub fn new(hop: ProxyHop, forward: Arc<dyn Dialer>) -> Self {
        Self { hop, forward }
    }
}

impl Dialer for Socks5 {
    fn dial(&self, addr: &str) -> Result<Box<dyn Stream>, NetError> {
        let mut stream = self.forward.dial(&self.hop.address)?;
        log::debug!("SOCKS5 CONNECT {} via {}", addr, self.hop.address);
        socks5_connect(&mut stream, addr, self.hop.credentials.as_ref())?;
        Ok(stream)
    }
}

/// Runs the SOCKS5 handshake on `stream` and asks the proxy to connect to `target`.
///
/// Host names are always sent to the proxy unresolved.
pub fn socks5_connect<S>(
    stream: &mut S,
    target: &str,
    credentials: Option<&Credentials>,
) -> Result<(), NetError>
where
    S: Read + Write + ?Sized,
{
    let request = connect_request(target)?;

    // Greeting: offer "no auth", plus username/password when we have credentials
    if credentials.is_some() {
        stream.write_all(&[SOCKS_VERSION, 2, AUTH_NONE, AUTH_USER_PASS])?;
    } else {
        stream.write_all(&[SOCKS_VERSION, 1, AUTH_NONE])?;
    }

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice)?;
    if choice[0] != SOCKS_VERSION {
        return Err(NetError::HandshakeFailed("unexpected SOCKS version"));
    }
    match (choice[1], credentials) {
        (AUTH_NONE, _) => {}
        (AUTH_USER_PASS, Some(creds)) => authenticate(stream, creds)?,
        (AUTH_NO_ACCEPTABLE, _) => return Err(NetError::NoAcceptableAuth),
        _ => return Err(NetError::HandshakeFailed("proxy chose a method we did not offer")),
    }

    stream.write_all(&request)?;

    let mut header = [0u8; 4];
    stream.read_exact(&mut header)?;
    if header[0] != SOCKS_VERSION {
        return Err(NetError::HandshakeFailed("unexpected SOCKS version in reply"));
    }
    if header[1] != 0x00 {
        return Err(NetError::ProxyRefused { code: header[1] });
    }

    // Bound address is unused but must be consumed
    let remaining = match header[3] {
        ATYP_IPV4 => 4 + 2,
        ATYP_IPV6 => 16 + 2,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len)?;
            usize::from(len[0]) + 2
        }
        _ => return Err(NetError::HandshakeFailed("unknown address type in reply")),
    };
    let mut bound = [0u8; 258];
    stream.read_exact(&mut bound[..remaining])?;

    Ok(())
}

fn authenticate<S>(stream: &mut S, creds: &Credentials) -> Result<(), NetError>
where
    S: Read + Write + ?Sized,
{
    let user = creds.username.as_bytes();
    let pass = creds.password.as_bytes();
    if user.is_empty() || user.len() > 255 || pass.len() > 255 {
        return Err(NetError::HandshakeFailed("credentials too long for SOCKS5"));
    }

    let mut msg = Zeroizing::new(Vec::with_capacity(3 + user.len() + pass.len()));
    msg.push(USER_PASS_VERSION);
    msg.push(user.len() as u8);
    msg.extend_from_slice(user);
    msg.push(pass.len() as u8);
    msg.extend_from_slice(pass);
    stream.write_all(&msg)?;

    let mut status = [0u8; 2];
    stream.read_exact(&mut status)?;
    if status[0] != USER_PASS_VERSION {
        return Err(NetError::HandshakeFailed("unexpected authentication version"));
    }
    if status[1] != 0x00 {
        return Err(NetError::AuthenticationRejected);
    }
    Ok(())
}

fn connect_request(target: &str) -> Result<Vec<u8>, NetError> {
    let invalid = || NetError::InvalidAddress(String::from(target));

    let (host, port) = target.rsplit_once(':').ok_or_else(invalid)?;
    let port: u16 = port.parse().map_err(|_| invalid())?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let mut request = alloc::vec![SOCKS_VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            if host.is_empty() || host.len() > 255 {
                return Err(invalid());
            }
            request.push(ATYP_DOMAIN);
            request.push(host.len() as u8);
            request.extend_from_slice(host.as_bytes());
        }
    }
    request.extend_from_slice(&port.to_be_bytes());
    Ok(request)
}

/// A composed dialer for an ordered list of proxies.
pub struct ProxyChain {
    dialer: Arc<dyn Dialer>,
    hops: Vec<ProxyHop>,
}

impl ProxyChain {
    /// Builds the chain over plain TCP.
    pub fn build(proxies: &[String]) -> Result<Self, BootstrapError> {
        Self::build_over(proxies, Arc::new(Direct))
    }

    /// Builds the chain over `base`, wrapping from the last proxy to the first.
    ///
    /// An empty list yields `base` itself.
    pub fn build_over(proxies: &[String], base: Arc<dyn Dialer>) -> Result<Self, BootstrapError> {
        let mut dialer = base;
        let mut hops = Vec::with_capacity(proxies.len());

        for proxy in proxies.iter().rev() {
            let hop = ProxyHop::parse(proxy)?;
            log::debug!("Adding proxy hop {}", hop.address());
            dialer = Arc::new(Socks5::new(hop.clone(), dialer));
            hops.push(hop);
        }
        hops.reverse();

        Ok(Self { dialer, hops })
    }

    /// True when no proxy is configured.
    pub fn is_direct(&self) -> bool {
        self.hops.is_empty()
    }

    /// Hops in configured order, outermost first.
    pub fn hops(&self) -> &[ProxyHop] {
        &self.hops
    }

    /// Hops in the order the client reaches them, innermost first.
    pub fn dial_order(&self) -> impl Iterator<Item = &ProxyHop> {
        self.hops.iter().rev()
    }
}

impl Dialer for ProxyChain {
    fn dial(&self, addr: &str) -> Result<Box<dyn Stream>, NetError> {
        self.dialer.dial(addr)
    }
}
