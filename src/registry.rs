//! Live session listing with management-interface first, status file second.

use crate::error::{Error, Result};
use crate::management::ManagementClient;
use crate::parser::{parse_delimited, parse_section};
use crate::types::{Session, SessionSnapshot, SessionSource};
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_STATUS_PATH: &str = "/var/log/openvpn/openvpn-status.log";

const CLIENT_LIST_TAG: &str = "CLIENT_LIST";
const STATUS_SECTION_START: &str = "Common Name,";
const STATUS_SECTION_END: &str = "ROUTING";

#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    client: ManagementClient,
    status_path: PathBuf,
}

impl ConnectionRegistry {
    pub fn new(client: ManagementClient, status_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            status_path: status_path.into(),
        }
    }

    pub fn client(&self) -> &ManagementClient {
        &self.client
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Current sessions plus the source they were read from. Never fails:
    /// when neither source answers the snapshot is empty and `Unavailable`.
    pub fn snapshot(&self) -> SessionSnapshot {
        match self.client.query_status() {
            Ok(response) => {
                let sessions = parse_management_status(&response);
                debug!(
                    "{} session(s) from management interface {}",
                    sessions.len(),
                    self.client.endpoint()
                );
                return SessionSnapshot {
                    source: SessionSource::Management,
                    sessions,
                };
            }
            Err(e) => warn!("{}, falling back to status file", e),
        }

        match read_status_file(&self.status_path) {
            Ok(sessions) => SessionSnapshot {
                source: SessionSource::StatusFile,
                sessions,
            },
            Err(e) => {
                warn!("status file unusable: {}", e);
                SessionSnapshot {
                    source: SessionSource::Unavailable,
                    sessions: Vec::new(),
                }
            }
        }
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.snapshot().sessions
    }

    /// Names of connected users, in source order.
    pub fn connected_users(&self) -> Vec<String> {
        self.list_sessions().into_iter().map(|s| s.user).collect()
    }
}

/// Parses the reply to the management `status` command.
///
/// `CLIENT_LIST` records are used when present. A server answering in the
/// version 1 layout has none, in which case its client section is read the
/// same way as the status file.
pub fn parse_management_status(response: &str) -> Vec<Session> {
    let sessions: Vec<Session> = parse_delimited(response, ',', 5)
        .into_iter()
        .filter(|fields| fields[0].trim() == CLIENT_LIST_TAG)
        .filter_map(|fields| Session::from_client_list(&fields))
        .collect();

    if sessions.is_empty() {
        return parse_status_text(response);
    }
    sessions
}

/// Parses the client section of a version 1 status file.
pub fn parse_status_text(text: &str) -> Vec<Session> {
    parse_section(text, STATUS_SECTION_START, STATUS_SECTION_END)
        .into_iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            Session::from_status_row(&fields)
        })
        .collect()
}

/// Reads and parses the status file; a missing file is `NotFound`.
pub fn read_status_file(path: &Path) -> Result<Vec<Session>> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(format!("status file {}", path.display())),
        _ => Error::Io(e),
    })?;
    Ok(parse_status_text(&text))
}
