//! Endpoint resolution.
//!
//! Decides the literal `host:port` to dial. Order:
//! 1. explicit server and port from the configuration (trusted);
//! 2. refuse when proxies are configured, since an SRV query would go out
//!    unproxied and reveal the account's domain;
//! 3. SRV lookup of the account domain (untrusted).

use alloc::string::{String, ToString};

use super::NetError;
use crate::config::Config;
use crate::error::BootstrapError;

/// Resolves a domain to the host and port of its XMPP client service.
pub trait DirectoryLookup {
    fn resolve(&self, domain: &str) -> Result<(String, u16), NetError>;
}

impl<T: DirectoryLookup + ?Sized> DirectoryLookup for &T {
    fn resolve(&self, domain: &str) -> Result<(String, u16), NetError> {
        (**self).resolve(domain)
    }
}

/// Endpoint selected for a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub host: String,
    pub port: u16,
    /// Set only when the endpoint came from explicit configuration.
    pub trusted: bool,
}

impl ResolvedEndpoint {
    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Chooses the endpoint for an account domain.
pub struct AddressResolver<L> {
    lookup: L,
}

impl<L: DirectoryLookup> AddressResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Resolves the endpoint for `domain` under `config`.
    ///
    /// # Errors
    /// - `ProxyWithoutExplicitServer` when proxies are configured but no server/port is.
    /// - `ResolutionFailed` when the directory lookup fails.
    pub fn resolve(&self, domain: &str, config: &Config) -> Result<ResolvedEndpoint, BootstrapError> {
        if let Some((host, port)) = config.explicit_endpoint() {
            log::info!("Using configured server {}:{}", host, port);
            return Ok(ResolvedEndpoint {
                host: String::from(host),
                port,
                trusted: true,
            });
        }

        if !config.proxies.is_empty() {
            return Err(BootstrapError::ProxyWithoutExplicitServer);
        }

        let (host, port) =
            self.lookup
                .resolve(domain)
                .map_err(|e| BootstrapError::ResolutionFailed {
                    domain: String::from(domain),
                    reason: e.to_string(),
                })?;
        log::info!("Resolved {} to {}:{}", domain, host, port);

        Ok(ResolvedEndpoint {
            host,
            port,
            trusted: false,
        })
    }
}

/// SRV name queried for a domain.
pub fn srv_name(domain: &str) -> String {
    format!("_xmpp-client._tcp.{}", domain)
}

/// One SRV answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub target: String,
    pub port: u16,
}

/// Picks the record to connect to: lowest priority, then highest weight.
///
/// Ties keep answer order. The target is returned without its trailing dot.
pub fn select_srv_record<I>(records: I) -> Option<(String, u16)>
where
    I: IntoIterator<Item = SrvRecord>,
{
    records
        .into_iter()
        .min_by_key(|r| (r.priority, core::cmp::Reverse(r.weight)))
        .map(|r| (String::from(r.target.trim_end_matches('.')), r.port))
}

/// DNS SRV lookup using the system resolver configuration.
#[cfg(feature = "dns")]
pub struct SrvLookup {
    resolver: trust_dns_resolver::Resolver,
}

#[cfg(feature = "dns")]
impl SrvLookup {
    /// Creates a lookup from `/etc/resolv.conf` (or the platform equivalent).
    pub fn from_system_conf() -> Result<Self, NetError> {
        let resolver = trust_dns_resolver::Resolver::from_system_conf().map_err(|e| {
            NetError::LookupFailed {
                name: String::from("system resolver"),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { resolver })
    }
}

#[cfg(feature = "dns")]
impl DirectoryLookup for SrvLookup {
    fn resolve(&self, domain: &str) -> Result<(String, u16), NetError> {
        let name = srv_name(domain);
        let lookup = self
            .resolver
            .srv_lookup(name.as_str())
            .map_err(|e| NetError::LookupFailed {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        let records = lookup.iter().map(|r| SrvRecord {
            priority: r.priority(),
            weight: r.weight(),
            target: r.target().to_string(),
            port: r.port(),
        });
        select_srv_record(records).ok_or(NetError::NoRecords { name })
    }
}
