//! First-run enrollment.
//!
//! Builds a configuration record interactively. Each stage prompts, validates
//! and re-asks on bad input; a failed line read cancels the whole enrollment,
//! except for the two yes/no questions where it simply means "no".
//!
//! Network failures are never retried: an SRV lookup that fails while picking
//! the server aborts enrollment.

pub mod stages;

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use std::io;
use std::path::PathBuf;

use rand_core::{CryptoRngCore, OsRng};

use crate::config::{
    default_debug_log_path, parse_yes, Config, DEFAULT_OTR_POLICY, DEFAULT_PORT, DEFAULT_TOR_PROXY,
};
use crate::error::BootstrapError;
use crate::identity::AccountIdentity;
use crate::net::hidden_services::HiddenServices;
use crate::net::proxy::ProxyHop;
use crate::net::resolver::DirectoryLookup;
use crate::storage::raw_files;

pub use stages::EnrollStage;

/// Interactive line input with a prompt.
pub trait Terminal {
    fn set_prompt(&mut self, prompt: &str);

    /// Reads one line without its terminator. End of input is an error.
    fn read_line(&mut self) -> io::Result<String>;

    fn info(&mut self, msg: &str) {
        log::info!("{}", msg);
    }

    fn alert(&mut self, msg: &str) {
        log::warn!("{}", msg);
    }
}

/// The OTR private key, opaque to enrollment.
pub trait KeyMaterial {
    fn generate(&mut self, rng: &mut dyn CryptoRngCore);

    /// Loads a libotr private key file. Returns false if it cannot be parsed.
    fn import(&mut self, raw: &[u8]) -> bool;

    fn serialize(&self) -> Vec<u8>;
}

/// The enrollment state machine.
pub struct EnrollmentWizard<'a, T: Terminal, K: KeyMaterial, L> {
    term: &'a mut T,
    key: &'a mut K,
    lookup: L,
    hidden_services: HiddenServices,
    debug_log_path: PathBuf,
    stage: EnrollStage,
    config: Config,
    domain: String,
}

impl<'a, T: Terminal, K: KeyMaterial, L: DirectoryLookup> EnrollmentWizard<'a, T, K, L> {
    pub fn new(term: &'a mut T, key: &'a mut K, lookup: L) -> Self {
        Self {
            term,
            key,
            lookup,
            hidden_services: HiddenServices::default(),
            debug_log_path: default_debug_log_path(),
            stage: EnrollStage::Account,
            config: Config::default(),
            domain: String::new(),
        }
    }

    /// Replaces the built-in hidden service table.
    pub fn with_hidden_services(mut self, table: HiddenServices) -> Self {
        self.hidden_services = table;
        self
    }

    pub fn with_debug_log_path(mut self, path: PathBuf) -> Self {
        self.debug_log_path = path;
        self
    }

    /// Runs every stage and returns the populated record.
    ///
    /// # Errors
    /// - `EnrollmentCancelled` on quit or failed input.
    /// - `ResolutionFailed` if the SRV lookup for the server fails.
    pub fn run(mut self) -> Result<Config, BootstrapError> {
        self.term.info("Enrolling new config file");

        while self.stage != EnrollStage::Complete {
            let next = match self.stage {
                EnrollStage::Account => self.ask_account()?,
                EnrollStage::DebugLogging => self.ask_debug_logging(),
                EnrollStage::Tor => self.ask_tor(),
                EnrollStage::PrivateKey => self.ask_private_key()?,
                EnrollStage::FixedPolicy => self.assign_policy(),
                EnrollStage::TorShortcut => self.try_tor_shortcut(),
                EnrollStage::Proxy => self.ask_proxy()?,
                EnrollStage::Server => self.ask_server()?,
                EnrollStage::Port => self.ask_port()?,
                EnrollStage::Complete => EnrollStage::Complete,
            };
            debug_assert!(self.stage.can_advance_to(next));
            log::debug!("Enrollment: {:?} -> {:?}", self.stage, next);
            self.stage = next;
        }

        self.term.set_prompt("> ");
        Ok(self.config)
    }

    fn read(&mut self) -> Result<String, BootstrapError> {
        self.term.read_line().map_err(|e| {
            log::debug!("Enrollment input ended: {}", e);
            BootstrapError::EnrollmentCancelled
        })
    }

    fn ask_account(&mut self) -> Result<EnrollStage, BootstrapError> {
        loop {
            self.term
                .set_prompt("Account (i.e. user@example.com, enter to quit): ");
            let account = self.read()?;
            if account.is_empty() {
                return Err(BootstrapError::EnrollmentCancelled);
            }

            match AccountIdentity::parse(&account) {
                Ok(identity) => {
                    self.domain = String::from(identity.domain());
                    self.config.account = account;
                    return Ok(EnrollStage::DebugLogging);
                }
                Err(e) => self.term.alert(&e.to_string()),
            }
        }
    }

    fn ask_debug_logging(&mut self) -> EnrollStage {
        let path = self.debug_log_path.display().to_string();
        self.term
            .set_prompt(&format!("Enable debug logging to {}? ", path));

        match self.term.read_line() {
            Ok(answer) if parse_yes(&answer) => {
                self.term.info("Debug logging enabled...");
                self.config.raw_log_file = Some(path);
            }
            _ => self.term.info("Not enabling debug logging..."),
        }
        EnrollStage::Tor
    }

    fn ask_tor(&mut self) -> EnrollStage {
        self.term.set_prompt("Use Tor?: ");

        self.config.use_tor = matches!(self.term.read_line(), Ok(answer) if parse_yes(&answer));
        if self.config.use_tor {
            self.term.info("Using Tor...");
        } else {
            self.term.info("Not using Tor...");
        }
        EnrollStage::PrivateKey
    }

    fn ask_private_key(&mut self) -> Result<EnrollStage, BootstrapError> {
        self.term
            .set_prompt("File to import libotr private key from (enter to generate): ");

        loop {
            let import_file = self.read()?;
            let import_file = import_file.trim();

            if import_file.is_empty() {
                self.term.info("Generating private key...");
                self.key.generate(&mut OsRng);
                break;
            }

            let raw = match raw_files::read_file(import_file) {
                Ok(raw) => zeroize::Zeroizing::new(raw),
                Err(e) => {
                    self.term
                        .alert(&format!("Failed to open private key file: {}", e));
                    continue;
                }
            };
            if !self.key.import(&raw) {
                self.term.alert(
                    "Failed to parse libotr private key file (the parser is pretty simple I'm afraid)",
                );
                continue;
            }
            break;
        }

        self.config.private_key = self.key.serialize();
        Ok(EnrollStage::FixedPolicy)
    }

    fn assign_policy(&mut self) -> EnrollStage {
        self.config.otr = DEFAULT_OTR_POLICY;
        EnrollStage::TorShortcut
    }

    fn try_tor_shortcut(&mut self) -> EnrollStage {
        if !self.config.use_tor {
            return EnrollStage::Proxy;
        }
        let Some(onion) = self.hidden_services.lookup(&self.domain) else {
            return EnrollStage::Proxy;
        };

        self.term.info(
            "It appears that you are using a well known server and we will use its Tor hidden service to connect.",
        );
        self.config.server = Some(String::from(onion));
        self.config.port = Some(DEFAULT_PORT);
        self.config.proxies = vec![String::from(DEFAULT_TOR_PROXY)];
        EnrollStage::Complete
    }

    fn ask_proxy(&mut self) -> Result<EnrollStage, BootstrapError> {
        let default_note = if self.config.use_tor {
            ", which is the default"
        } else {
            ", enter for none"
        };
        self.term
            .set_prompt(&format!("Proxy (i.e {}{}): ", DEFAULT_TOR_PROXY, default_note));

        let proxy = loop {
            let mut answer = self.read()?.trim().to_string();
            if answer.is_empty() {
                if !self.config.use_tor {
                    return Ok(EnrollStage::Complete);
                }
                answer = String::from(DEFAULT_TOR_PROXY);
            }

            match ProxyHop::parse(&answer) {
                Ok(_) => break answer,
                Err(e) => self.term.alert(&e.to_string()),
            }
        };

        self.config.proxies = vec![proxy];
        self.term.info(
            "Since you selected a proxy, we need to know the server and port to connect to as a SRV lookup would leak information every time.",
        );
        Ok(EnrollStage::Server)
    }

    fn ask_server(&mut self) -> Result<EnrollStage, BootstrapError> {
        self.term
            .set_prompt("Server (i.e. xmpp.example.com, enter to lookup using unproxied DNS): ");
        let server = self.read()?.trim().to_string();

        if !server.is_empty() {
            self.config.server = Some(server);
            return Ok(EnrollStage::Port);
        }

        self.term.info("Performing SRV lookup");
        match self.lookup.resolve(&self.domain) {
            Ok((host, port)) => {
                self.term.info(&format!("Resolved {}:{}", host, port));
                self.config.server = Some(host);
                self.config.port = Some(port);
                Ok(EnrollStage::Complete)
            }
            Err(e) => {
                self.term.alert(&format!("SRV lookup failed: {}", e));
                Err(BootstrapError::ResolutionFailed {
                    domain: self.domain.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn ask_port(&mut self) -> Result<EnrollStage, BootstrapError> {
        loop {
            self.term
                .set_prompt(&format!("Port (enter for {}): ", DEFAULT_PORT));
            let answer = self.read()?;
            let answer = answer.trim();

            let port = if answer.is_empty() {
                Some(DEFAULT_PORT)
            } else {
                answer.parse::<u16>().ok().filter(|p| *p > 0)
            };
            match port {
                Some(port) => {
                    self.config.port = Some(port);
                    return Ok(EnrollStage::Complete);
                }
                None => self.term.info("Port numbers must be 0 < port <= 65535"),
            }
        }
    }
}
