//! Error taxonomy for connection bootstrap and enrollment.
//!
//! Every failure carries enough context (offending value, failing step) to be
//! rendered as a single diagnostic line for the user.

use core::fmt;

use crate::config::ConfigError;

/// Failures surfaced by enrollment, resolution, policy construction and dialing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// Account string is not of the form `user@domain`.
    InvalidAccount { account: String },
    /// A configured proxy entry is not a parseable URL.
    InvalidProxyUrl { proxy: String, reason: String },
    /// A configured proxy entry parses but cannot be turned into a dialer.
    UnsupportedProxy { proxy: String, reason: String },
    /// Proxies are configured but no explicit server/port to dial.
    ProxyWithoutExplicitServer,
    /// SRV lookup for the account domain failed.
    ResolutionFailed { domain: String, reason: String },
    /// Pinned certificate fingerprint is not valid hex.
    InvalidPinEncoding { reason: String },
    /// Pinned certificate fingerprint does not decode to 32 bytes.
    InvalidPinLength { length: usize },
    /// Opening the transport through the proxy chain failed.
    TransportDialFailed { address: String, reason: String },
    /// The protocol layer failed to establish a session.
    SessionEstablishFailed { address: String, reason: String },
    /// The user quit enrollment or the terminal stopped delivering input.
    EnrollmentCancelled,
    /// Locating, reading or writing the persisted configuration failed.
    Config(ConfigError),
    /// No password stored and the user did not provide one.
    PasswordUnavailable { reason: String },
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::InvalidAccount { account } => {
                write!(f, "invalid username (want user@domain): {}", account)
            }
            BootstrapError::InvalidProxyUrl { proxy, reason } => {
                write!(f, "Failed to parse {} as a URL: {}", proxy, reason)
            }
            BootstrapError::UnsupportedProxy { proxy, reason } => {
                write!(f, "Failed to parse {} as a proxy: {}", proxy, reason)
            }
            BootstrapError::ProxyWithoutExplicitServer => write!(
                f,
                "Cannot connect via a proxy without Server and Port being set in the config file as an SRV lookup would leak information."
            ),
            BootstrapError::ResolutionFailed { domain, reason } => {
                write!(f, "Failed to resolve XMPP server for {}: {}", domain, reason)
            }
            BootstrapError::InvalidPinEncoding { reason } => write!(
                f,
                "Failed to parse ServerCertificateSHA256 (should be hex string): {}",
                reason
            ),
            BootstrapError::InvalidPinLength { length } => write!(
                f,
                "ServerCertificateSHA256 is not 32 bytes long (got {} bytes)",
                length
            ),
            BootstrapError::TransportDialFailed { address, reason } => {
                write!(f, "Failed to connect via proxy to {}: {}", address, reason)
            }
            BootstrapError::SessionEstablishFailed { address, reason } => {
                write!(f, "Failed to connect to XMPP server at {}: {}", address, reason)
            }
            BootstrapError::EnrollmentCancelled => write!(f, "Enrollment cancelled"),
            BootstrapError::Config(err) => write!(f, "{}", err),
            BootstrapError::PasswordUnavailable { reason } => {
                write!(f, "Failed to read password: {}", reason)
            }
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}
