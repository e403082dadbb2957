use crate::types::Session;
use serde::Serialize;

pub const DEFAULT_TOP: usize = 5;

/// Aggregate figures over one session snapshot and the certificate counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub connected_users: usize,
    pub valid_certificates: usize,
    pub revoked_certificates: usize,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    top_talkers: Vec<Session>,
}

impl Statistics {
    pub fn collect(sessions: &[Session], valid_certificates: usize, revoked_certificates: usize) -> Self {
        let mut ranked = sessions.to_vec();
        // sort_by is stable: ties keep source order
        ranked.sort_by(|a, b| b.total_bytes().cmp(&a.total_bytes()));

        Self {
            connected_users: sessions.len(),
            valid_certificates,
            revoked_certificates,
            bytes_received: sessions.iter().map(|s| s.bytes_received).sum(),
            bytes_sent: sessions.iter().map(|s| s.bytes_sent).sum(),
            top_talkers: ranked,
        }
    }

    pub fn total_traffic(&self) -> u64 {
        self.bytes_received.saturating_add(self.bytes_sent)
    }

    /// Sessions by combined traffic, highest first.
    pub fn top_talkers(&self, n: usize) -> &[Session] {
        &self.top_talkers[..n.min(self.top_talkers.len())]
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} TB", value)
}
