//! Account identity (`user@domain`).

use alloc::string::String;

use crate::error::BootstrapError;

/// Local part and domain of an XMPP account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    local_part: String,
    domain: String,
}

impl AccountIdentity {
    /// Splits an account string on its `@`.
    ///
    /// # Errors
    /// Returns `BootstrapError::InvalidAccount` unless the string contains exactly
    /// one `@` with non-empty text on both sides.
    pub fn parse(account: &str) -> Result<Self, BootstrapError> {
        let invalid = || BootstrapError::InvalidAccount {
            account: String::from(account),
        };

        let (local_part, domain) = account.split_once('@').ok_or_else(invalid)?;
        if local_part.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(invalid());
        }

        Ok(Self {
            local_part: String::from(local_part),
            domain: String::from(domain),
        })
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_account() {
        let id = AccountIdentity::parse("alice@riseup.net").unwrap();
        assert_eq!(id.local_part(), "alice");
        assert_eq!(id.domain(), "riseup.net");
    }

    #[test]
    fn test_rejects_malformed_accounts() {
        for account in ["", "alice", "@riseup.net", "alice@", "a@b@c", "@", "@@"] {
            assert_eq!(
                AccountIdentity::parse(account),
                Err(BootstrapError::InvalidAccount {
                    account: String::from(account)
                }),
                "{account:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_split_iff_single_at_with_both_parts() {
        let samples = ["x@y", "x@@y", "xy", "x@", "@y", "first.last@sub.example.org", "a@b@"];
        for s in samples {
            let expected = s.matches('@').count() == 1
                && !s.starts_with('@')
                && !s.ends_with('@');
            assert_eq!(AccountIdentity::parse(s).is_ok(), expected, "{s:?}");
        }
    }
}
