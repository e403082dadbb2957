//! Details of an issued client certificate, read from `pki/issued/<name>.crt`.

use crate::error::{Error, Result};
use crate::store::CertificateStore;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::prelude::*;

#[derive(Debug, Clone, Serialize)]
pub struct CertificateDetails {
    pub common_name: String,
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub not_before: String,
    pub not_after: String,
    pub signature_algorithm: String,
    pub subject_alt_names: Vec<String>,
    pub is_ca: bool,
    pub extended_key_usage: Vec<String>,
    pub is_valid: bool,
    pub validity_status: String,
}

pub fn inspect_certificate(store: &CertificateStore, common_name: &str) -> Result<CertificateDetails> {
    let path = store.certificate_path(common_name);
    let data = fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(format!("certificate {}", path.display())),
        _ => Error::Io(e),
    })?;

    parse_certificate_pem(common_name, &data)
}

/// Parses the first PEM certificate in `data`. easy-rsa prefixes issued
/// certificates with a text dump, which is skipped.
pub fn parse_certificate_pem(common_name: &str, data: &[u8]) -> Result<CertificateDetails> {
    let (_, pem) = parse_x509_pem(data)?;
    if pem.label != "CERTIFICATE" {
        return Err(Error::CertParse(format!(
            "expected a CERTIFICATE block, found {}",
            pem.label
        )));
    }
    let x509 = pem.parse_x509()?;

    let now = chrono::Utc::now().timestamp();
    let not_before_ts = x509.validity.not_before.timestamp();
    let not_after_ts = x509.validity.not_after.timestamp();

    let is_valid = now >= not_before_ts && now <= not_after_ts;
    let validity_status = if now < not_before_ts {
        "Not yet valid"
    } else if now > not_after_ts {
        "Expired"
    } else {
        "Valid"
    };

    let mut subject_alt_names = Vec::new();
    if let Ok(Some(san_ext)) = x509.subject_alternative_name() {
        for san in &san_ext.value.general_names {
            match san {
                GeneralName::DNSName(name) => subject_alt_names.push(format!("DNS:{}", name)),
                GeneralName::RFC822Name(email) => {
                    subject_alt_names.push(format!("Email:{}", email))
                }
                GeneralName::IPAddress(ip) => {
                    subject_alt_names.push(format!("IP:{}", format_ip(ip)))
                }
                _ => {}
            }
        }
    }

    let is_ca = x509
        .basic_constraints()
        .ok()
        .flatten()
        .map(|bc| bc.value.ca)
        .unwrap_or(false);

    let mut extended_key_usage = Vec::new();
    if let Ok(Some(eku_ext)) = x509.extended_key_usage() {
        let eku = eku_ext.value;
        if eku.server_auth {
            extended_key_usage.push("TLS Web Server Authentication".to_string());
        }
        if eku.client_auth {
            extended_key_usage.push("TLS Web Client Authentication".to_string());
        }
    }

    Ok(CertificateDetails {
        common_name: common_name.to_string(),
        subject: format_dn(x509.subject()),
        issuer: format_dn(x509.issuer()),
        serial_number: format_serial(&x509.serial.to_bytes_be()),
        not_before: x509.validity.not_before.to_string(),
        not_after: x509.validity.not_after.to_string(),
        signature_algorithm: x509.signature_algorithm.algorithm.to_string(),
        subject_alt_names,
        is_ca,
        extended_key_usage,
        is_valid,
        validity_status: validity_status.to_string(),
    })
}

fn format_dn(dn: &X509Name) -> String {
    let mut parts = Vec::new();

    for rdn in dn.iter() {
        for attr in rdn.iter() {
            let name = match attr.attr_type().to_id_string().as_str() {
                "2.5.4.3" => "CN",
                "2.5.4.10" => "O",
                "2.5.4.11" => "OU",
                "2.5.4.6" => "C",
                "2.5.4.7" => "L",
                "2.5.4.8" => "ST",
                _ => continue,
            };
            parts.push(format!("{}={}", name, attr.as_str().unwrap_or("?")));
        }
    }

    parts.join(", ")
}

fn format_serial(serial: &[u8]) -> String {
    serial
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn format_ip(bytes: &[u8]) -> String {
    let addr = if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        IpAddr::V4(Ipv4Addr::from(octets))
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        IpAddr::V6(Ipv6Addr::from(octets))
    } else {
        return format_serial(bytes);
    };
    addr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::pki_fixture;

    // easy-rsa writes a text dump ahead of the PEM block
    const ALICE_CRT: &str = "\
Certificate:
    Data:
        Version: 3 (0x2)
        Serial Number: 1715004 (0x1a2b3c)
        Signature Algorithm: ecdsa-with-SHA256
        Issuer: CN=Easy-RSA CA
        Validity
            Not Before: Jan  1 00:00:00 2024 GMT
            Not After : Jan  1 00:00:00 2124 GMT
        Subject: CN=alice
        Subject Public Key Info:
            Public Key Algorithm: id-ecPublicKey
-----BEGIN CERTIFICATE-----
MIIBVTCB/aADAgECAgMaKzwwCgYIKoZIzj0EAwIwFjEUMBIGA1UEAwwLRWFzeS1S
U0EgQ0EwIBcNMjQwMTAxMDAwMDAwWhgPMjEyNDAxMDEwMDAwMDBaMBAxDjAMBgNV
BAMMBWFsaWNlMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEz868cGsCGD7Zeh/v
BlQuwmdukCREHXZgPDXQPRp2afhXrJ8zuQLRPk0Rd6AHqw3QQBtyZbhMNEpVNr0x
/G0ZjqM+MDwwCQYDVR0TBAIwADATBgNVHSUEDDAKBggrBgEFBQcDAjAaBgNVHREE
EzARgglhbGljZS52cG6HBAoIAAEwCgYIKoZIzj0EAwIDRwAwRAIgRy0ECsUKNs1w
tQEDVSCGXJmp0Ni5P1bKHF6KOkvdnvQCIB77ybwMHU1jk5jdbaQG185MqkL3m399
kLfZAxJgc+Mq
-----END CERTIFICATE-----
";

    const EXPIRED_CRT: &str = "\
Certificate:
    Data:
        Version: 3 (0x2)
        Serial Number: 2 (0x2)
        Signature Algorithm: ecdsa-with-SHA256
        Issuer: CN=Easy-RSA CA
        Validity
            Not Before: Jan  1 00:00:00 2020 GMT
            Not After : Jan  1 00:00:00 2021 GMT
        Subject: CN=bob
        Subject Public Key Info:
            Public Key Algorithm: id-ecPublicKey
-----BEGIN CERTIFICATE-----
MIIBNDCB26ADAgECAgECMAoGCCqGSM49BAMCMBYxFDASBgNVBAMMC0Vhc3ktUlNB
IENBMB4XDTIwMDEwMTAwMDAwMFoXDTIxMDEwMTAwMDAwMFowDjEMMAoGA1UEAwwD
Ym9iMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEz868cGsCGD7Zeh/vBlQuwmdu
kCREHXZgPDXQPRp2afhXrJ8zuQLRPk0Rd6AHqw3QQBtyZbhMNEpVNr0x/G0ZjqMi
MCAwCQYDVR0TBAIwADATBgNVHSUEDDAKBggrBgEFBQcDAjAKBggqhkjOPQQDAgNI
ADBFAiEA1AR8Stb9sAyCyf48/QyDSPKrN2IRQ/Kr80U8x21oJMoCICqBxwqXSoii
Bg34hSi+3onK5gyEBcQcBhUdEk41rBxa
-----END CERTIFICATE-----
";

    #[test]
    fn test_parse_issued_certificate() {
        let cert = parse_certificate_pem("alice", ALICE_CRT.as_bytes()).unwrap();

        assert_eq!(cert.common_name, "alice");
        assert_eq!(cert.subject, "CN=alice");
        assert_eq!(cert.issuer, "CN=Easy-RSA CA");
        assert_eq!(cert.serial_number, "1A:2B:3C");
        assert_eq!(cert.not_before, "Jan  1 00:00:00 2024 +00:00");
        assert_eq!(cert.not_after, "Jan  1 00:00:00 2124 +00:00");
        assert_eq!(cert.validity_status, "Valid");
        assert!(cert.is_valid);
        assert!(!cert.is_ca);
        assert_eq!(cert.subject_alt_names, vec!["DNS:alice.vpn", "IP:10.8.0.1"]);
        assert_eq!(cert.extended_key_usage, vec!["TLS Web Client Authentication"]);
    }

    #[test]
    fn test_expired_certificate() {
        let cert = parse_certificate_pem("bob", EXPIRED_CRT.as_bytes()).unwrap();

        assert_eq!(cert.serial_number, "02");
        assert_eq!(cert.validity_status, "Expired");
        assert!(!cert.is_valid);
        assert!(cert.subject_alt_names.is_empty());
    }

    #[test]
    fn test_inspect_reads_issued_file() {
        let (_dir, store) = pki_fixture(&[], None);
        fs::write(store.certificate_path("alice"), ALICE_CRT).unwrap();

        let cert = inspect_certificate(&store, "alice").unwrap();
        assert_eq!(cert.subject, "CN=alice");
    }

    #[test]
    fn test_format_ip() {
        assert_eq!(format_ip(&[10, 8, 0, 1]), "10.8.0.1");
        let mut v6 = [0u8; 16];
        v6[15] = 1;
        assert_eq!(format_ip(&v6), "::1");
        assert_eq!(format_ip(&[1, 2]), "01:02");
    }

    #[test]
    fn test_format_serial() {
        assert_eq!(format_serial(&[0x01, 0xab, 0x0f]), "01:AB:0F");
        assert_eq!(format_serial(&[]), "");
    }

    #[test]
    fn test_missing_certificate_is_not_found() {
        let (_dir, store) = pki_fixture(&[], None);
        let err = inspect_certificate(&store, "ghost").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let (_dir, store) = pki_fixture(&[], None);
        fs::write(
            store.certificate_path("broken"),
            "Certificate:\n    Data: ...\n-----BEGIN CERTIFICATE-----\nnot base64!!\n-----END CERTIFICATE-----\n",
        )
        .unwrap();

        let err = inspect_certificate(&store, "broken").unwrap_err();
        assert!(matches!(err, Error::CertParse(_)));
    }
}
