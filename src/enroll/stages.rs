//! Enrollment Stages.
//!
//! The wizard walks these strictly in declaration order. Two stages may end
//! the walk early: `TorShortcut` (well known hidden service) and `Proxy`
//! (no proxy wanted), both jumping straight to `Complete`.

/// The ordered stages of first-run enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnrollStage {
    /// 1. Account `user@domain`.
    Account,
    /// 2. Raw protocol log yes/no.
    DebugLogging,
    /// 3. Tor yes/no.
    Tor,
    /// 4. Import or generate the OTR key.
    PrivateKey,
    /// 5. Fixed OTR policy flags.
    FixedPolicy,
    /// 6. Hidden service autoconfiguration.
    TorShortcut,
    /// 7. Proxy URL.
    Proxy,
    /// 8. Explicit server, or SRV lookup when left empty.
    Server,
    /// 9. Port for an explicit server.
    Port,
    /// Done; the record is fully populated.
    Complete,
}

impl EnrollStage {
    /// Returns the next stage in declaration order.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Account => Some(Self::DebugLogging),
            Self::DebugLogging => Some(Self::Tor),
            Self::Tor => Some(Self::PrivateKey),
            Self::PrivateKey => Some(Self::FixedPolicy),
            Self::FixedPolicy => Some(Self::TorShortcut),
            Self::TorShortcut => Some(Self::Proxy),
            Self::Proxy => Some(Self::Server),
            Self::Server => Some(Self::Port),
            Self::Port => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    /// Whether a transition from `self` to `to` is allowed.
    pub fn can_advance_to(&self, to: Self) -> bool {
        match (self, to) {
            (Self::TorShortcut, Self::Complete)
            | (Self::Proxy, Self::Complete)
            | (Self::Server, Self::Complete) => true,
            _ => self.next() == Some(to),
        }
    }
}
