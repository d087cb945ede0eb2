//! TLS trust policy.
//!
//! Builds the TLS parameters handed to the protocol layer: a conservative
//! protocol floor kept for legacy servers, a fixed ECDHE cipher allow-list, an
//! optional SHA-256 pin of the server certificate and, for a few domains, a
//! replacement root pool.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use sha2::{Digest, Sha256};

use crate::error::BootstrapError;

/// Length of a decoded certificate pin.
pub const PIN_LEN: usize = 32;

/// Domain whose server chains to the CACert root, which distributions have dropped.
pub const CACERT_DOMAIN: &str = "jabber.ccc.de";

/// CACert class 1 root, DER encoded.
pub const CACERT_ROOT_DER: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/cacert-root.der"));

/// TLS protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

impl TlsVersion {
    /// Version as it appears on the wire.
    pub fn wire_value(self) -> u16 {
        match self {
            TlsVersion::Tls10 => 0x0301,
            TlsVersion::Tls11 => 0x0302,
            TlsVersion::Tls12 => 0x0303,
            TlsVersion::Tls13 => 0x0304,
        }
    }
}

/// Lowest version offered. Some deployed servers still stop at TLS 1.0.
pub const MIN_TLS_VERSION: TlsVersion = TlsVersion::Tls10;

/// Cipher suites, by IANA identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CipherSuite {
    EcdheEcdsaWithAes128GcmSha256 = 0xc02b,
    EcdheRsaWithAes128GcmSha256 = 0xc02f,
    EcdheEcdsaWithAes128CbcSha = 0xc009,
    EcdheEcdsaWithAes256CbcSha = 0xc00a,
    EcdheRsaWithAes128CbcSha = 0xc013,
    EcdheRsaWithAes256CbcSha = 0xc014,
}

impl CipherSuite {
    pub fn iana_id(self) -> u16 {
        self as u16
    }
}

/// The only suites offered, in preference order.
pub const ALLOWED_CIPHER_SUITES: &[CipherSuite] = &[
    CipherSuite::EcdheEcdsaWithAes128GcmSha256,
    CipherSuite::EcdheRsaWithAes128GcmSha256,
    CipherSuite::EcdheEcdsaWithAes128CbcSha,
    CipherSuite::EcdheEcdsaWithAes256CbcSha,
    CipherSuite::EcdheRsaWithAes128CbcSha,
    CipherSuite::EcdheRsaWithAes256CbcSha,
];

/// Decodes a hex SHA-256 certificate pin.
///
/// # Errors
/// - `InvalidPinEncoding` if `pin` is not hex.
/// - `InvalidPinLength` if it does not decode to 32 bytes.
pub fn decode_pin(pin: &str) -> Result<[u8; PIN_LEN], BootstrapError> {
    let bytes = hex::decode(pin).map_err(|e| BootstrapError::InvalidPinEncoding {
        reason: e.to_string(),
    })?;
    <[u8; PIN_LEN]>::try_from(bytes.as_slice()).map_err(|_| BootstrapError::InvalidPinLength {
        length: bytes.len(),
    })
}

/// Domains whose system root pool is replaced by a single root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootOverrides {
    roots: BTreeMap<String, CertificateDer<'static>>,
}

impl RootOverrides {
    pub fn empty() -> Self {
        Self {
            roots: BTreeMap::new(),
        }
    }

    /// Replaces the root pool for `domain` with `root`.
    pub fn insert(&mut self, domain: &str, root: CertificateDer<'static>) {
        self.roots.insert(domain.to_ascii_lowercase(), root);
    }

    pub fn get(&self, domain: &str) -> Option<&CertificateDer<'static>> {
        self.roots.get(&domain.to_ascii_lowercase())
    }
}

impl Default for RootOverrides {
    fn default() -> Self {
        let mut overrides = Self::empty();
        overrides.insert(CACERT_DOMAIN, CertificateDer::from(CACERT_ROOT_DER));
        overrides
    }
}

/// TLS parameters for one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPolicy {
    pub min_version: TlsVersion,
    pub cipher_suites: Vec<CipherSuite>,
    /// SHA-256 of the expected server certificate, checked at handshake time.
    pub server_certificate_sha256: Option<[u8; PIN_LEN]>,
    /// Replacement root pool; `None` means the system roots.
    pub root_certificates: Option<Vec<CertificateDer<'static>>>,
}

impl TlsPolicy {
    /// Builds the policy for connecting to `domain`.
    ///
    /// A replacement root that fails to decode is skipped and the system roots
    /// stay in effect.
    pub fn new(domain: &str, pin: Option<[u8; PIN_LEN]>, overrides: &RootOverrides) -> Self {
        let root_certificates = overrides.get(domain).and_then(|root| {
            let mut store = RootCertStore::empty();
            match store.add(root.clone()) {
                Ok(()) => {
                    log::info!("Temporarily trusting only the pinned root for {}", domain);
                    Some(alloc::vec![root.clone()])
                }
                Err(e) => {
                    log::warn!("Tried to add replacement root for {} but failed: {}", domain, e);
                    None
                }
            }
        });

        Self {
            min_version: MIN_TLS_VERSION,
            cipher_suites: ALLOWED_CIPHER_SUITES.to_vec(),
            server_certificate_sha256: pin,
            root_certificates,
        }
    }

    /// The replacement roots as a rustls store, if any.
    pub fn root_store(&self) -> Option<RootCertStore> {
        self.root_certificates.as_ref().map(|roots| {
            let mut store = RootCertStore::empty();
            store.add_parsable_certificates(roots.iter().cloned());
            store
        })
    }

    /// Checks the presented leaf certificate against the pin. Always true without a pin.
    pub fn pin_matches(&self, leaf_der: &[u8]) -> bool {
        match &self.server_certificate_sha256 {
            Some(pin) => Sha256::digest(leaf_der).as_slice() == pin.as_slice(),
            None => true,
        }
    }
}
