use ovpn_manager::registry::ConnectionRegistry;
use ovpn_manager::stats::{format_bytes, Statistics};
use ovpn_manager::types::SessionSource;
use ovpn_manager::Settings;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Connected Clients ===\n");

    let settings = Settings::load(None)?;
    let registry: ConnectionRegistry = settings.registry();

    println!("Querying {}...", registry.client().endpoint());
    let snapshot = registry.snapshot();

    match snapshot.source {
        SessionSource::Management => println!("Source: management interface\n"),
        SessionSource::StatusFile => println!(
            "Source: {} (management interface unreachable)\n",
            registry.status_path().display()
        ),
        SessionSource::Unavailable => {
            println!("No session source available.");
            return Ok(());
        }
    }

    for session in &snapshot.sessions {
        println!(
            "{:<20} {:<22} {:<16} rx {:>12} tx {:>12}",
            session.user,
            session.real_address,
            session.virtual_address,
            format_bytes(session.bytes_received),
            format_bytes(session.bytes_sent)
        );
    }

    let stats = Statistics::collect(&snapshot.sessions, 0, 0);
    println!(
        "\n{} client(s), {} total traffic",
        stats.connected_users,
        format_bytes(stats.total_traffic())
    );

    Ok(())
}
