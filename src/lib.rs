//! Connection bootstrap and first-run enrollment for an XMPP client.
//!
//! The messaging protocol, OTR keys and the terminal are supplied by the host
//! through the `ProtocolDialer`, `KeyMaterial` and `Terminal`/`Ui` traits.

extern crate alloc;

pub mod bootstrap;
pub mod config;
pub mod enroll;
pub mod error;
pub mod identity;
pub mod net;
pub mod startup;
pub mod storage;
pub mod tls;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bootstrap::{ConnectionBootstrap, DialPolicy, LogSink, ProtocolDialer};
pub use config::{Config, ConfigError, OtrPolicy, DEFAULT_OTR_POLICY, DEFAULT_PORT, DEFAULT_TOR_PROXY};
pub use enroll::{EnrollStage, EnrollmentWizard, KeyMaterial, Terminal};
pub use error::BootstrapError;
pub use identity::AccountIdentity;
pub use net::proxy::ProxyChain;
pub use net::resolver::{AddressResolver, DirectoryLookup, ResolvedEndpoint};
#[cfg(feature = "dns")]
pub use net::resolver::SrvLookup;
pub use net::{Dialer, NetError, Stream};
pub use startup::{load_config, open_debug_log, Ui};
pub use tls::{RootOverrides, TlsPolicy};
