//! Connection Bootstrap.
//!
//! Turns a configuration record and a password into a live session:
//! identity, endpoint, proxy chain, pin, TLS policy, optional proxied
//! transport, then the protocol handshake. Each step aborts on failure and no
//! partial session is ever returned.
//!
//! # Resources
//! A transport opened through the proxy chain is owned by the `DialPolicy`
//! handed to the protocol layer. If the protocol dial fails, the policy (and
//! with it the socket) is dropped before `establish` returns.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::sync::Arc;
use core::fmt;
use std::io::Write;
use std::sync::Mutex;

use crate::config::Config;
use crate::error::BootstrapError;
use crate::identity::AccountIdentity;
use crate::net::proxy::ProxyChain;
use crate::net::resolver::{AddressResolver, DirectoryLookup, ResolvedEndpoint};
use crate::net::{Dialer, Direct, Stream};
use crate::tls::{decode_pin, RootOverrides, TlsPolicy};

/// Shared sink for the protocol layer's raw traffic log.
pub type LogSink = Arc<Mutex<dyn Write + Send>>;

/// Everything the protocol layer needs besides address and credentials.
pub struct DialPolicy<C> {
    pub log: Option<LogSink>,
    /// Invoked by the protocol layer to fill in an in-band registration form.
    pub create_callback: Option<C>,
    /// Endpoint came from configuration rather than SRV.
    pub trusted_address: bool,
    /// Server-side message archiving.
    pub archive: bool,
    pub tls: TlsPolicy,
    /// Pre-opened transport, present only when proxies are configured.
    pub conn: Option<Box<dyn Stream>>,
}

impl<C> fmt::Debug for DialPolicy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialPolicy")
            .field("log", &self.log.is_some())
            .field("create_callback", &self.create_callback.is_some())
            .field("trusted_address", &self.trusted_address)
            .field("archive", &self.archive)
            .field("tls", &self.tls)
            .field("conn", &self.conn.is_some())
            .finish()
    }
}

/// The messaging protocol's session establishment.
pub trait ProtocolDialer {
    type Session;
    type Callback: Clone;
    type Error: fmt::Display;

    /// Performs TLS and protocol handshakes with `address`.
    ///
    /// Dials `address` itself when `policy.conn` is `None`.
    fn dial(
        &self,
        address: &str,
        local_part: &str,
        domain: &str,
        password: &str,
        policy: DialPolicy<Self::Callback>,
    ) -> Result<Self::Session, Self::Error>;
}

/// Establishes sessions from configuration records.
pub struct ConnectionBootstrap<P: ProtocolDialer, L> {
    protocol: P,
    resolver: AddressResolver<L>,
    root_overrides: RootOverrides,
    base_dialer: Arc<dyn Dialer>,
    log: Option<LogSink>,
    create_callback: Option<P::Callback>,
}

impl<P: ProtocolDialer, L: DirectoryLookup> ConnectionBootstrap<P, L> {
    pub fn new(protocol: P, lookup: L) -> Self {
        Self {
            protocol,
            resolver: AddressResolver::new(lookup),
            root_overrides: RootOverrides::default(),
            base_dialer: Arc::new(Direct),
            log: None,
            create_callback: None,
        }
    }

    pub fn with_root_overrides(mut self, overrides: RootOverrides) -> Self {
        self.root_overrides = overrides;
        self
    }

    /// Dialer underneath the proxy chain. Plain TCP by default.
    pub fn with_base_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.base_dialer = dialer;
        self
    }

    pub fn with_log(mut self, log: LogSink) -> Self {
        self.log = Some(log);
        self
    }

    /// Asks the protocol layer to register the account in-band.
    pub fn with_create_callback(mut self, callback: P::Callback) -> Self {
        self.create_callback = Some(callback);
        self
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Endpoint and TLS policy for `config`, without touching the network
    /// beyond the directory lookup.
    pub fn plan(&self, config: &Config) -> Result<(AccountIdentity, ResolvedEndpoint, TlsPolicy), BootstrapError> {
        let identity = AccountIdentity::parse(&config.account)?;
        let endpoint = self.resolver.resolve(identity.domain(), config)?;
        let tls = self.tls_policy(identity.domain(), config)?;
        Ok((identity, endpoint, tls))
    }

    fn tls_policy(&self, domain: &str, config: &Config) -> Result<TlsPolicy, BootstrapError> {
        let pin = match config.server_certificate_sha256.as_deref() {
            Some(pin) if !pin.is_empty() => Some(decode_pin(pin)?),
            _ => None,
        };
        Ok(TlsPolicy::new(domain, pin, &self.root_overrides))
    }

    /// Connects and authenticates the account in `config`.
    pub fn establish(&self, config: &Config, password: &str) -> Result<P::Session, BootstrapError> {
        let identity = AccountIdentity::parse(&config.account)?;
        let endpoint = self.resolver.resolve(identity.domain(), config)?;
        let chain = ProxyChain::build_over(&config.proxies, self.base_dialer.clone())?;
        let tls = self.tls_policy(identity.domain(), config)?;

        let address = endpoint.address();
        let conn = if chain.is_direct() {
            None
        } else {
            log::info!("Making connection to {} via proxy", address);
            let stream = chain
                .dial(&address)
                .map_err(|e| BootstrapError::TransportDialFailed {
                    address: address.clone(),
                    reason: e.to_string(),
                })?;
            Some(stream)
        };

        let policy = DialPolicy {
            log: self.log.clone(),
            create_callback: self.create_callback.clone(),
            trusted_address: endpoint.trusted,
            archive: false,
            tls,
            conn,
        };

        self.protocol
            .dial(&address, identity.local_part(), identity.domain(), password, policy)
            .map_err(|e| BootstrapError::SessionEstablishFailed {
                address: address.clone(),
                reason: e.to_string(),
            })
    }
}
