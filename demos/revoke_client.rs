use ovpn_manager::lifecycle::CertificateLifecycle;
use ovpn_manager::select::resolve_selection;
use ovpn_manager::store::CertificateStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input = std::env::args()
        .nth(1)
        .ok_or("usage: revoke_client <name|position|fragment> [ca-root]")?;
    let ca_root = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "/etc/openvpn/easy-rsa".to_string());

    println!("=== Revoking a Client Certificate ===\n");

    let store = CertificateStore::new(ca_root);
    let valid = store.list_valid();
    for (idx, name) in valid.iter().enumerate() {
        println!("  {}. {}", idx + 1, name);
    }

    let target = resolve_selection(&valid, &input)?;
    println!("\nRevoking {}...", target);

    let lifecycle = CertificateLifecycle::easy_rsa(store);
    let report = lifecycle.revoke(&target)?;

    if report.is_done() {
        println!("✓ Revoked {}", report.common_name);
    } else if let (Some(step), Some(failure)) = (report.failed_step(), report.failure()) {
        println!("✗ {} failed: {}", step.name(), failure);
        if let Some(divergence) = report.divergence() {
            println!("  {}", divergence);
        }
    }

    if report.restart_required() {
        println!("\nRestart the OpenVPN service to load the new CRL.");
    }

    Ok(())
}
