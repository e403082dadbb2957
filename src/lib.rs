//! ovpn-manager - administration toolkit for an OpenVPN server
//!
//! This library covers the day-to-day chores of running an OpenVPN server
//! backed by an easy-rsa PKI:
//!
//! - Listing connected clients through the management interface, falling
//!   back to the status file when the interface does not answer
//! - Disconnecting a client
//! - Listing valid and revoked client certificates from the PKI index
//! - Revoking and re-issuing client certificates, regenerating the CRL
//! - Reading the server log and summarising traffic
//!
//! # Examples
//!
//! ## Listing Sessions
//!
//! ```no_run
//! use ovpn_manager::management::ManagementClient;
//! use ovpn_manager::registry::ConnectionRegistry;
//!
//! let registry = ConnectionRegistry::new(
//!     ManagementClient::new("localhost", 7505),
//!     "/var/log/openvpn/openvpn-status.log",
//! );
//!
//! for session in registry.list_sessions() {
//!     println!("{} from {}", session.user, session.real_address);
//! }
//! ```
//!
//! ## Revoking a Client
//!
//! ```no_run
//! use ovpn_manager::lifecycle::CertificateLifecycle;
//! use ovpn_manager::store::CertificateStore;
//!
//! let lifecycle = CertificateLifecycle::easy_rsa(CertificateStore::new("/etc/openvpn/easy-rsa"));
//! let report = lifecycle.revoke("alice").unwrap();
//!
//! if report.restart_required() {
//!     println!("restart the server to load the new CRL");
//! }
//! ```

pub mod config;
pub mod error;
pub mod inspect;
pub mod lifecycle;
pub mod logs;
pub mod management;
pub mod parser;
pub mod registry;
pub mod select;
pub mod stats;
pub mod store;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result, ToolFailure};

pub use config::Settings;
pub use inspect::{inspect_certificate, CertificateDetails};
pub use lifecycle::{
    CaTool, CertificateLifecycle, EasyRsa, StepFailure, WorkflowKind, WorkflowReport,
    WorkflowState, WorkflowStep,
};
pub use management::ManagementClient;
pub use registry::ConnectionRegistry;
pub use select::resolve_selection;
pub use stats::{format_bytes, Statistics};
pub use store::CertificateStore;
pub use types::{
    CertificateRecord, CertificateStatus, IndexEntry, ManagementCommandResult, Session,
    SessionSnapshot, SessionSource,
};

#[cfg(test)]
mod tests {
    use super::*;
    use management::tests::{closed_port, serve_once};
    use std::fs;
    use std::time::Duration;
    use store::tests::{pki_fixture, INDEX};

    const STATUS_FILE: &str = "\
OpenVPN CLIENT LIST
Updated,Mon Jan  1 00:00:00 2024
Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since
alice,1.2.3.4:5000,1024,2048,Mon Jan  1 00:00:00 2024
bob,5.6.7.8:6000,4096,0,Mon Jan  1 00:05:00 2024
ROUTING TABLE
GLOBAL STATS
END
";

    #[test]
    fn test_stats_from_live_sessions_and_pki() {
        let (port, _server) = serve_once(vec![
            "CLIENT_LIST,alice,1.2.3.4:5000,10.8.0.6,100,200,x,Mon Jan  1 00:00:00 2024\r\n\
             CLIENT_LIST,bob,5.6.7.8:6000,10.8.0.10,5000,0,x,Mon Jan  1 00:00:00 2024\r\nEND\r\n",
        ]);
        let registry =
            ConnectionRegistry::new(ManagementClient::new("127.0.0.1", port), "/nonexistent");
        let (_dir, store) = pki_fixture(&["alice", "dave"], Some(INDEX));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.source, SessionSource::Management);

        let stats = Statistics::collect(
            &snapshot.sessions,
            store.list_valid().len(),
            store.list_revoked().len(),
        );
        assert_eq!(stats.connected_users, 2);
        assert_eq!(stats.valid_certificates, 2);
        assert_eq!(stats.revoked_certificates, 2);
        assert_eq!(stats.total_traffic(), 5300);
        assert_eq!(stats.top_talkers(1)[0].user, "bob");
    }

    #[test]
    fn test_kick_candidates_from_status_file() {
        let (dir, _store) = pki_fixture(&[], None);
        let status_path = dir.path().join("openvpn-status.log");
        fs::write(&status_path, STATUS_FILE).unwrap();

        let client =
            ManagementClient::new("127.0.0.1", closed_port()).with_timeout(Duration::from_secs(1));
        let registry = ConnectionRegistry::new(client, &status_path);

        let users = registry.connected_users();
        assert_eq!(users, vec!["alice", "bob"]);
        assert_eq!(resolve_selection(&users, "BO").unwrap(), "bob");
        assert!(matches!(
            registry.client().disconnect_user("bob"),
            Err(Error::ManagementUnavailable(_))
        ));
    }

    #[test]
    fn test_settings_wire_components() {
        let (dir, _store) = pki_fixture(&["alice"], Some(INDEX));
        let settings = Settings {
            ca_root: dir.path().to_path_buf(),
            ..Settings::default()
        };

        let store = settings.store();
        assert!(store.is_provisioned());
        assert_eq!(store.list_valid(), vec!["alice"]);
        assert_eq!(settings.lifecycle().store().ca_root(), dir.path());
    }
}
