//! Well known Tor hidden services of public XMPP servers.

use alloc::collections::BTreeMap;
use alloc::string::String;

/// Built-in domain to onion host mappings.
pub const KNOWN_HIDDEN_SERVICES: &[(&str, &str)] = &[
    ("jabber.ccc.de", "okj7xc6j2szr2y75.onion"),
    ("riseup.net", "4cjw6cwpeaeppfqz.onion"),
    ("jabber.calyxinstitute.org", "ijeeynrc6x2uy5ob.onion"),
    ("jabber.otr.im", "5rgdtlawqkcplz75.onion"),
    ("wtfismyip.com", "ofkztxcohimx34la.onion"),
];

/// Lookup table from account domain to onion host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenServices {
    hosts: BTreeMap<String, String>,
}

impl HiddenServices {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self {
            hosts: BTreeMap::new(),
        }
    }

    /// Builds a table from `(domain, onion host)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            hosts: pairs
                .into_iter()
                .map(|(domain, host)| (domain.to_ascii_lowercase(), String::from(host)))
                .collect(),
        }
    }

    /// Onion host for `domain`, if known.
    pub fn lookup(&self, domain: &str) -> Option<&str> {
        self.hosts.get(&domain.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Default for HiddenServices {
    fn default() -> Self {
        Self::from_pairs(KNOWN_HIDDEN_SERVICES.iter().copied())
    }
}
