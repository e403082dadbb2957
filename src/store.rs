//! Read-only view over an easy-rsa PKI directory.
//!
//! Every call goes back to disk: the CA tool rewrites these files during
//! revoke and restore, so nothing is cached between calls.

use crate::error::{Error, Result};
use crate::parser::parse_index_entries;
use crate::types::{CertificateRecord, CertificateStatus, IndexEntry, SERVER_NAME};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_CA_ROOT: &str = "/etc/openvpn/easy-rsa";

#[derive(Debug, Clone)]
pub struct CertificateStore {
    ca_root: PathBuf,
}

impl CertificateStore {
    pub fn new(ca_root: impl Into<PathBuf>) -> Self {
        Self {
            ca_root: ca_root.into(),
        }
    }

    pub fn ca_root(&self) -> &Path {
        &self.ca_root
    }

    pub fn pki_dir(&self) -> PathBuf {
        self.ca_root.join("pki")
    }

    pub fn issued_dir(&self) -> PathBuf {
        self.pki_dir().join("issued")
    }

    pub fn private_dir(&self) -> PathBuf {
        self.pki_dir().join("private")
    }

    pub fn reqs_dir(&self) -> PathBuf {
        self.pki_dir().join("reqs")
    }

    pub fn index_path(&self) -> PathBuf {
        self.pki_dir().join("index.txt")
    }

    pub fn certificate_path(&self, common_name: &str) -> PathBuf {
        self.issued_dir().join(format!("{}.crt", common_name))
    }

    pub fn private_key_path(&self, common_name: &str) -> PathBuf {
        self.private_dir().join(format!("{}.key", common_name))
    }

    pub fn request_path(&self, common_name: &str) -> PathBuf {
        self.reqs_dir().join(format!("{}.req", common_name))
    }

    pub fn is_provisioned(&self) -> bool {
        self.pki_dir().is_dir()
    }

    /// Stems of `issued/*.crt`, without `server`, sorted ascending.
    pub fn list_valid(&self) -> Vec<String> {
        let dir = self.issued_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                log_read_failure(&dir, &e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().map_or(false, |ext| ext == "crt"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .filter(|name| name != SERVER_NAME)
            .collect();

        names.sort();
        debug!("{} issued certificate(s) in {}", names.len(), dir.display());
        names
    }

    /// Distinct revoked names from the index, without `server`, sorted
    /// ascending.
    pub fn list_revoked(&self) -> Vec<String> {
        self.index_entries()
            .into_iter()
            .filter(IndexEntry::is_revoked)
            .map(|entry| entry.common_name)
            .filter(|name| name != SERVER_NAME)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All parseable index lines; empty when the index does not exist.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        match self.read_index() {
            Ok(text) => parse_index_entries(&text),
            Err(e) => {
                if !e.is_not_found() {
                    warn!("cannot read PKI index: {}", e);
                }
                Vec::new()
            }
        }
    }

    /// Raw index contents; `NotFound` when the file is absent.
    pub fn read_index(&self) -> Result<String> {
        let path = self.index_path();
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(format!("PKI index {}", path.display())),
            _ => Error::Io(e),
        })
    }

    /// Merged view, sorted by name. The index decides: an issued file whose
    /// name only has revoked index lines is reported as revoked.
    pub fn records(&self) -> Vec<CertificateRecord> {
        let entries = self.index_entries();

        let mut by_name: BTreeMap<String, CertificateStatus> = BTreeMap::new();
        for name in self.list_valid() {
            let index_lines: Vec<&IndexEntry> =
                entries.iter().filter(|e| e.common_name == name).collect();
            let revoked_only =
                !index_lines.is_empty() && index_lines.iter().all(|e| e.is_revoked());
            let status = if revoked_only {
                CertificateStatus::Revoked
            } else {
                CertificateStatus::Valid
            };
            by_name.insert(name, status);
        }
        for name in self.list_revoked() {
            by_name.entry(name).or_insert(CertificateStatus::Revoked);
        }

        by_name
            .into_iter()
            .map(|(common_name, status)| CertificateRecord {
                common_name,
                status,
            })
            .collect()
    }
}

impl Default for CertificateStore {
    fn default() -> Self {
        Self::new(DEFAULT_CA_ROOT)
    }
}

fn log_read_failure(path: &Path, err: &std::io::Error) {
    if err.kind() == ErrorKind::NotFound {
        debug!("{} does not exist", path.display());
    } else {
        warn!("cannot read {}: {}", path.display(), err);
    }
}
