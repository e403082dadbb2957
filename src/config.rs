//! Runtime settings: built-in defaults, optionally overlaid by a TOML file.
//!
//! ```toml
//! management_host = "127.0.0.1"
//! management_port = 7505
//! ca_root = "/etc/openvpn/easy-rsa"
//! ```
//!
//! Keys left out of the file keep their defaults. Command-line flags are
//! applied on top by the CLI.

use crate::error::{Error, Result};
use crate::lifecycle::{CertificateLifecycle, EasyRsa};
use crate::logs::DEFAULT_LOG_PATH;
use crate::management::{ManagementClient, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};
use crate::registry::{ConnectionRegistry, DEFAULT_STATUS_PATH};
use crate::store::{CertificateStore, DEFAULT_CA_ROOT};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a settings file when `--config` is not given.
pub const CONFIG_ENV: &str = "OVPN_MANAGER_CONFIG";

pub const DEFAULT_SERVICE_NAME: &str = "openvpn@server";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub log_path: PathBuf,
    pub status_path: PathBuf,
    pub management_host: String,
    pub management_port: u16,
    pub management_timeout_secs: u64,
    pub ca_root: PathBuf,
    /// Unit named in the restart hint after the CRL changes.
    pub service_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            status_path: PathBuf::from(DEFAULT_STATUS_PATH),
            management_host: DEFAULT_HOST.to_string(),
            management_port: DEFAULT_PORT,
            management_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            ca_root: PathBuf::from(DEFAULT_CA_ROOT),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads a settings file. A file that was asked for but is missing is an
    /// error, not a silent fallback to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                Error::Config(format!("settings file {} not found", path.display()))
            }
            _ => Error::Io(e),
        })?;
        debug!("loaded settings from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// `explicit` wins over `$OVPN_MANAGER_CONFIG`; with neither, defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.management_host.trim().is_empty() {
            return Err(Error::Config("management_host must not be empty".to_string()));
        }
        if self.management_port == 0 {
            return Err(Error::Config("management_port must be non-zero".to_string()));
        }
        if self.management_timeout_secs == 0 {
            return Err(Error::Config(
                "management_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn management_timeout(&self) -> Duration {
        Duration::from_secs(self.management_timeout_secs)
    }

    pub fn management_client(&self) -> ManagementClient {
        ManagementClient::new(self.management_host.clone(), self.management_port)
            .with_timeout(self.management_timeout())
    }

    pub fn registry(&self) -> ConnectionRegistry {
        ConnectionRegistry::new(self.management_client(), self.status_path.clone())
    }

    pub fn store(&self) -> CertificateStore {
        CertificateStore::new(self.ca_root.clone())
    }

    pub fn lifecycle(&self) -> CertificateLifecycle<EasyRsa> {
        CertificateLifecycle::easy_rsa(self.store())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}
