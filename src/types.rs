use crate::parser::digits_or_zero;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// Placeholder for values a source does not report.
pub const UNKNOWN: &str = "unknown";

/// The CA's own identity; never listed as a client.
pub const SERVER_NAME: &str = "server";

/// One active VPN client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: String,
    pub real_address: String,
    pub virtual_address: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub connected_since: String,
}

impl Session {
    /// Builds a session from a management `CLIENT_LIST` record.
    ///
    /// `fields[0]` is the record tag. Layout: 1 user, 2 real address,
    /// 3 virtual address, 4 bytes received, 5 bytes sent, 7 connected since.
    pub(crate) fn from_client_list(fields: &[&str]) -> Option<Self> {
        if fields.len() < 5 || fields[0] != "CLIENT_LIST" {
            return None;
        }
        let user = fields[1].trim();
        if user.is_empty() {
            return None;
        }

        Some(Self {
            user: user.to_string(),
            real_address: fields[2].to_string(),
            virtual_address: non_empty_or_unknown(fields[3]),
            bytes_received: digits_or_zero(fields[4]),
            bytes_sent: fields.get(5).map(|f| digits_or_zero(f)).unwrap_or(0),
            connected_since: fields
                .get(7)
                .map(|f| non_empty_or_unknown(f))
                .unwrap_or_else(|| UNKNOWN.to_string()),
        })
    }

    /// Builds a session from a row of the status-file client section.
    ///
    /// Layout: 0 user, 1 real address, 2 bytes received, 3 bytes sent,
    /// 4 connected since. This format never carries the virtual address.
    pub(crate) fn from_status_row(fields: &[&str]) -> Option<Self> {
        if fields.len() < 4 {
            return None;
        }
        let user = fields[0].trim();
        if user.is_empty() {
            return None;
        }

        Some(Self {
            user: user.to_string(),
            real_address: fields[1].to_string(),
            virtual_address: UNKNOWN.to_string(),
            bytes_received: digits_or_zero(fields[2]),
            bytes_sent: digits_or_zero(fields[3]),
            connected_since: fields
                .get(4)
                .map(|f| non_empty_or_unknown(f))
                .unwrap_or_else(|| UNKNOWN.to_string()),
        })
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_received.saturating_add(self.bytes_sent)
    }
}

fn non_empty_or_unknown(field: &str) -> String {
    let field = field.trim();
    if field.is_empty() {
        UNKNOWN.to_string()
    } else {
        field.to_string()
    }
}

/// Where a list of sessions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Management,
    StatusFile,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub source: SessionSource,
    pub sessions: Vec<Session>,
}

/// Outcome of one request/response exchange with the management interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementCommandResult {
    pub raw_response: String,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Valid,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateRecord {
    pub common_name: String,
    pub status: CertificateStatus,
}

/// One line of the PKI `index.txt` ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// `V` valid, `R` revoked, `E` expired.
    pub flag: char,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
    pub serial: String,
    pub common_name: String,
}

impl IndexEntry {
    pub fn is_revoked(&self) -> bool {
        self.flag == 'R'
    }
}

/// Parses the OpenSSL CA database time formats (`YYMMDDHHMMSSZ` and
/// `YYYYMMDDHHMMSSZ`).
pub(crate) fn parse_index_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let format = match value.len() {
        13 => "%y%m%d%H%M%SZ",
        15 => "%Y%m%d%H%M%SZ",
        _ => return None,
    };
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .map(|naive| naive.and_utc())
}
