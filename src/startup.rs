//! Startup flow: find the configuration, enroll when there is none, obtain the
//! password, open the debug log.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zeroize::Zeroizing;

use crate::bootstrap::LogSink;
use crate::config::{find_config_file, parse_config, Config};
use crate::enroll::Terminal;
use crate::error::BootstrapError;
use crate::storage::{raw_files, StorageError};

/// The host user interface.
pub trait Ui: Terminal {
    /// Asks for the account password when none is stored.
    fn ask_for_password(&mut self, config: &Config) -> io::Result<String>;
}

/// Loads the configuration, enrolling a new one if it cannot be parsed.
///
/// `path` overrides the default location under `home`. `enroll` runs the
/// wizard; its record is saved to the configuration path before use. A save
/// failure is reported through `ui` but does not stop startup.
pub fn load_config<U, F>(
    ui: &mut U,
    path: Option<&Path>,
    home: Option<&Path>,
    enroll: F,
) -> Result<(Config, Zeroizing<String>), BootstrapError>
where
    U: Ui,
    F: FnOnce(&mut U) -> Result<Config, BootstrapError>,
{
    let path: PathBuf = match path {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => find_config_file(home).map_err(|e| {
            ui.alert(&e.to_string());
            BootstrapError::from(e)
        })?,
    };

    let config = match parse_config(&path) {
        Ok(config) => config,
        Err(e) => {
            ui.alert(&format!("Failed to parse config file: {}", e));
            let mut config = enroll(ui)?;
            config.filename = Some(path.clone());
            if let Err(e) = config.save() {
                ui.alert(&format!("Failed to save config file: {}", e));
            }
            config
        }
    };

    let password = match config.password.as_deref() {
        Some(password) if !password.is_empty() => Zeroizing::new(String::from(password)),
        _ => match ui.ask_for_password(&config) {
            Ok(password) => Zeroizing::new(password),
            Err(e) => {
                ui.alert(&format!("Failed to read password: {}", e));
                return Err(BootstrapError::PasswordUnavailable {
                    reason: e.to_string(),
                });
            }
        },
    };

    Ok((config, password))
}

/// Opens the raw protocol log for appending. New files are private to the user.
pub fn open_debug_log<P: AsRef<Path>>(path: P) -> Result<LogSink, StorageError> {
    let file = raw_files::create_private(path.as_ref(), true)?;
    log::info!("Logging raw traffic to {}", path.as_ref().display());
    Ok(Arc::new(Mutex::new(file)))
}
