//! Configuration management.
//!
//! Defines the persisted account record produced by enrollment and consumed by
//! the connection bootstrap, plus the fixed defaults of this client.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::{raw_files, StorageError};

/// Port used when the user accepts the default or a hidden service is auto-configured.
pub const DEFAULT_PORT: u16 = 5222;

/// Local Tor SOCKS endpoint.
pub const DEFAULT_TOR_PROXY: &str = "socks5://127.0.0.1:9050";

/// File name of the configuration inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".xmpp-client";

/// Name of the debug log offered during enrollment.
pub const DEBUG_LOG_FILE_NAME: &str = "xmpp-client-debug.log";

/// OTR session behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtrPolicy {
    #[serde(rename = "OTRAutoAppendTag")]
    pub auto_append_tag: bool,
    #[serde(rename = "OTRAutoStartSession")]
    pub auto_start_session: bool,
    #[serde(rename = "OTRAutoTearDown")]
    pub auto_tear_down: bool,
}

/// Policy assigned by enrollment. Not user-configurable yet.
pub const DEFAULT_OTR_POLICY: OtrPolicy = OtrPolicy {
    auto_append_tag: true,
    auto_start_session: true,
    auto_tear_down: false,
};

impl Default for OtrPolicy {
    fn default() -> Self {
        DEFAULT_OTR_POLICY
    }
}

/// Persisted account configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    /// Where the record was read from and is saved to.
    #[serde(skip)]
    pub filename: Option<PathBuf>,

    /// Account in `user@domain` form.
    pub account: String,

    /// Explicit server host; bypasses SRV lookup together with `port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Proxy URLs, outermost hop first.
    pub proxies: Vec<String>,

    /// Serialized private key, opaque to this crate.
    #[serde(with = "hex::serde")]
    pub private_key: Vec<u8>,

    /// Debug log path, if enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_log_file: Option<String>,

    pub use_tor: bool,

    /// Hex SHA-256 of the server's certificate.
    #[serde(
        rename = "ServerCertificateSHA256",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_certificate_sha256: Option<String>,

    #[serde(flatten)]
    pub otr: OtrPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Config {
    /// Explicit `(server, port)` pair, if both are usable.
    pub fn explicit_endpoint(&self) -> Option<(&str, u16)> {
        match (self.server.as_deref(), self.port) {
            (Some(server), Some(port)) if !server.is_empty() && port > 0 => Some((server, port)),
            _ => None,
        }
    }

    /// Writes the record back to `filename`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.filename.as_ref().ok_or(ConfigError::NoFilename)?;
        let data = serde_json::to_vec_pretty(self).map_err(|e| ConfigError::Serialize {
            reason: e.to_string(),
        })?;
        raw_files::write_atomic(path, &data).map_err(|error| ConfigError::Storage {
            path: path.clone(),
            error,
        })?;
        log::debug!("Saved configuration to {}", path.display());
        Ok(())
    }
}

/// Reads and parses the configuration at `path`.
pub fn parse_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = raw_files::read_file(path).map_err(|error| ConfigError::Storage {
        path: path.to_path_buf(),
        error,
    })?;
    let mut config: Config = serde_json::from_slice(&data).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    config.filename = Some(path.to_path_buf());
    Ok(config)
}

/// Location of the configuration for a home directory.
///
/// Uses `<home>/Persistent` instead of `<home>` when it exists, which is where
/// Tails keeps data across reboots.
pub fn find_config_file(home: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let home = match home {
        Some(home) if !home.as_os_str().is_empty() => home,
        _ => return Err(ConfigError::NoHomeDirectory),
    };

    let persistent = home.join("Persistent");
    let base = if persistent.is_dir() { persistent } else { home.to_path_buf() };
    Ok(base.join(CONFIG_FILE_NAME))
}

/// Default location of the enrollment debug log.
pub fn default_debug_log_path() -> PathBuf {
    std::env::temp_dir().join(DEBUG_LOG_FILE_NAME)
}

/// Interprets a yes/no answer. Only `y` and `yes` (any case) count as yes.
pub fn parse_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Errors related to configuration persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No home directory to search for the configuration.
    NoHomeDirectory,
    /// Record has no file name to save to.
    NoFilename,
    /// Reading or writing the file failed.
    Storage { path: PathBuf, error: StorageError },
    /// File contents are not a valid configuration.
    Parse { path: PathBuf, reason: String },
    /// Record could not be encoded.
    Serialize { reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoHomeDirectory => {
                write!(f, "Cannot find config file: no home directory")
            }
            ConfigError::NoFilename => write!(f, "Config has no file name to save to"),
            ConfigError::Storage { path, error } => {
                write!(f, "Config file {}: {}", path.display(), error)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "Failed to parse config file {}: {}", path.display(), reason)
            }
            ConfigError::Serialize { reason } => write!(f, "Failed to encode config: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("xmpp_bootstrap_config_{}", name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_save_and_parse() {
        let dir = temp_dir("roundtrip");
        let path = dir.join(CONFIG_FILE_NAME);

        let config = Config {
            filename: Some(path.clone()),
            account: String::from("bob@example.com"),
            server: Some(String::from("xmpp.example.com")),
            port: Some(5269),
            proxies: alloc::vec![String::from("socks5://10.0.0.1:1080")],
            private_key: alloc::vec![0xde, 0xad, 0xbe, 0xef],
            use_tor: false,
            otr: DEFAULT_OTR_POLICY,
            ..Default::default()
        };
        config.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"PrivateKey\": \"deadbeef\""));
        assert!(text.contains("\"OTRAutoAppendTag\": true"));
        assert!(!text.contains("Password"));

        assert_eq!(parse_config(&path).unwrap(), config);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_parse_missing_fields_default() {
        let dir = temp_dir("sparse");
        let path = dir.join("sparse.json");
        fs::write(&path, br#"{"Account":"alice@riseup.net","UseTor":true}"#).unwrap();

        let config = parse_config(&path).unwrap();
        assert_eq!(config.account, "alice@riseup.net");
        assert!(config.use_tor);
        assert!(config.proxies.is_empty());
        assert_eq!(config.explicit_endpoint(), None);
        assert_eq!(config.filename.as_deref(), Some(path.as_path()));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_parse_errors() {
        let dir = temp_dir("broken");
        let path = dir.join("broken.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(parse_config(&path), Err(ConfigError::Parse { .. })));

        let missing = dir.join("missing.json");
        assert!(matches!(
            parse_config(&missing),
            Err(ConfigError::Storage { error: StorageError::NotFound, .. })
        ));

        fs::write(&path, br#"{"Port": 70000}"#).unwrap();
        assert!(matches!(parse_config(&path), Err(ConfigError::Parse { .. })));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_without_filename() {
        assert_eq!(Config::default().save(), Err(ConfigError::NoFilename));
    }

    #[test]
    fn test_explicit_endpoint_requires_both() {
        let mut config = Config {
            server: Some(String::from("xmpp.example.com")),
            ..Default::default()
        };
        assert_eq!(config.explicit_endpoint(), None);

        config.port = Some(0);
        assert_eq!(config.explicit_endpoint(), None);

        config.port = Some(5222);
        assert_eq!(config.explicit_endpoint(), Some(("xmpp.example.com", 5222)));

        config.server = Some(String::new());
        assert_eq!(config.explicit_endpoint(), None);
    }

    #[test]
    fn test_find_config_file() {
        assert_eq!(find_config_file(None), Err(ConfigError::NoHomeDirectory));
        assert_eq!(find_config_file(Some(Path::new(""))), Err(ConfigError::NoHomeDirectory));

        let home = temp_dir("home");
        assert_eq!(find_config_file(Some(&home)).unwrap(), home.join(CONFIG_FILE_NAME));

        fs::create_dir_all(home.join("Persistent")).unwrap();
        assert_eq!(
            find_config_file(Some(&home)).unwrap(),
            home.join("Persistent").join(CONFIG_FILE_NAME)
        );
        let _ = fs::remove_dir_all(&home);
    }

    #[test]
    fn test_parse_yes() {
        for yes in ["y", "Y", "yes", "YES", "Yes", " y "] {
            assert!(parse_yes(yes), "{yes:?}");
        }
        for no in ["", "n", "no", "yep", "true", "1", "ye"] {
            assert!(!parse_yes(no), "{no:?}");
        }
    }
}
