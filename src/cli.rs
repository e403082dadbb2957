use crate::config::Settings;
use crate::error::{Error, Result};
use crate::inspect::{inspect_certificate, CertificateDetails};
use crate::lifecycle::{StepFailure, WorkflowKind, WorkflowReport};
use crate::logs::{classify, tail_lines, LineKind, DEFAULT_TAIL_LINES};
use crate::select::resolve_selection;
use crate::stats::{format_bytes, Statistics, DEFAULT_TOP};
use crate::store::CertificateStore;
use crate::types::{CertificateStatus, SessionSnapshot, SessionSource};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ovpn-manager")]
#[command(version, about = "Manage an OpenVPN server and its easy-rsa PKI", long_about = None)]
pub struct Cli {
    #[arg(long, global = true, env = "OVPN_MANAGER_CONFIG", help = "TOML settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "OVPN_LOG_PATH", help = "OpenVPN server log")]
    pub log_path: Option<PathBuf>,

    #[arg(long, global = true, env = "OVPN_STATUS_PATH", help = "OpenVPN status file")]
    pub status_path: Option<PathBuf>,

    #[arg(long, global = true, env = "OVPN_MGMT_HOST", help = "Management interface host")]
    pub mgmt_host: Option<String>,

    #[arg(long, global = true, env = "OVPN_MGMT_PORT", help = "Management interface port")]
    pub mgmt_port: Option<u16>,

    #[arg(
        long,
        global = true,
        env = "OVPN_MGMT_TIMEOUT",
        help = "Management interface timeout in seconds"
    )]
    pub mgmt_timeout: Option<u64>,

    #[arg(long, global = true, env = "OVPN_CA_ROOT", help = "easy-rsa directory")]
    pub ca_root: Option<PathBuf>,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "More log output (repeatable)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Show the end of the server log")]
    Logs {
        #[arg(short = 'n', long, default_value_t = DEFAULT_TAIL_LINES, help = "Number of lines")]
        lines: usize,
    },

    #[command(about = "List connected clients")]
    Sessions {
        #[arg(short, long, default_value = "pretty", help = "Output format (pretty, json)")]
        format: String,
    },

    #[command(about = "List client certificates")]
    Certs {
        #[arg(short, long, default_value = "pretty", help = "Output format (pretty, json)")]
        format: String,
    },

    #[command(about = "Revoke a client certificate and regenerate the CRL")]
    Revoke {
        #[arg(help = "Client name, list position, or unique fragment")]
        name: String,
    },

    #[command(about = "Re-issue a revoked client certificate")]
    Restore {
        #[arg(help = "Client name, list position, or unique fragment")]
        name: String,
    },

    #[command(about = "Disconnect a connected client")]
    Kick {
        #[arg(help = "Client name, list position, or unique fragment")]
        name: String,
    },

    #[command(about = "Show traffic and certificate statistics")]
    Stats {
        #[arg(long, default_value_t = DEFAULT_TOP, help = "Number of top clients to show")]
        top: usize,

        #[arg(short, long, default_value = "pretty", help = "Output format (pretty, json)")]
        format: String,
    },

    #[command(about = "Show details of an issued client certificate")]
    Inspect {
        #[arg(help = "Client name, list position, or unique fragment")]
        name: String,

        #[arg(short, long, default_value = "pretty", help = "Output format (pretty, json)")]
        format: String,
    },

    #[command(about = "Print the effective settings")]
    Config,
}

pub enum OutputFormat {
    Pretty,
    #[cfg(feature = "json")]
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            #[cfg(feature = "json")]
            "json" => Ok(OutputFormat::Json),
            _ => Err(Error::InvalidInput(format!("Invalid format: {}", s))),
        }
    }
}

impl Cli {
    /// File settings with command-line and environment overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;

        if let Some(path) = &self.log_path {
            settings.log_path = path.clone();
        }
        if let Some(path) = &self.status_path {
            settings.status_path = path.clone();
        }
        if let Some(host) = &self.mgmt_host {
            settings.management_host = host.clone();
        }
        if let Some(port) = self.mgmt_port {
            settings.management_port = port;
        }
        if let Some(secs) = self.mgmt_timeout {
            settings.management_timeout_secs = secs;
        }
        if let Some(root) = &self.ca_root {
            settings.ca_root = root.clone();
        }

        settings.validate()?;
        Ok(settings)
    }
}

pub fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose > 0 || std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
    }
    builder.format_target(false).init();
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = cli.settings()?;

    match cli.command {
        Commands::Logs { lines } => {
            let tail = tail_lines(&settings.log_path, lines).map_err(|e| match e {
                Error::Io(io) if io.kind() == ErrorKind::PermissionDenied => {
                    Error::InvalidInput(format!(
                        "cannot read {} ({}); try again with sudo",
                        settings.log_path.display(),
                        io
                    ))
                }
                other => other,
            })?;

            println!(
                "{}",
                format!("Last {} line(s) of {}", tail.len(), settings.log_path.display())
                    .cyan()
                    .bold()
            );
            for line in &tail {
                match classify(line) {
                    LineKind::Error => println!("{}", line.red()),
                    LineKind::Warning => println!("{}", line.yellow()),
                    LineKind::Connected => println!("{}", line.green()),
                    LineKind::Plain => println!("{}", line),
                }
            }
        }

        Commands::Sessions { format } => {
            let output_format = format.parse::<OutputFormat>()?;
            let snapshot = settings.registry().snapshot();

            match output_format {
                OutputFormat::Pretty => print_sessions(&snapshot),
                #[cfg(feature = "json")]
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            }
        }

        Commands::Certs { format } => {
            let output_format = format.parse::<OutputFormat>()?;
            let store = provisioned_store(&settings)?;
            let records = store.records();

            match output_format {
                OutputFormat::Pretty => {
                    for (status, title) in [
                        (CertificateStatus::Valid, "Valid certificates"),
                        (CertificateStatus::Revoked, "Revoked certificates"),
                    ] {
                        let names: Vec<&str> = records
                            .iter()
                            .filter(|r| r.status == status)
                            .map(|r| r.common_name.as_str())
                            .collect();

                        println!("{} ({})", title.cyan().bold(), names.len());
                        if names.is_empty() {
                            println!("  {}", "none".dimmed());
                        }
                        for (idx, name) in names.iter().enumerate() {
                            let label = match status {
                                CertificateStatus::Valid => name.green(),
                                CertificateStatus::Revoked => name.red(),
                            };
                            println!("  {}. {}", idx + 1, label);
                        }
                    }
                }
                #[cfg(feature = "json")]
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            }
        }

        Commands::Revoke { name } => {
            let store = provisioned_store(&settings)?;
            let target = resolve_selection(&store.list_valid(), &name)?;

            println!("{}", format!("Revoking certificate for {}...", target).cyan());
            let report = settings.lifecycle().revoke(&target)?;
            print_report(&report, &settings.service_name)?;
        }

        Commands::Restore { name } => {
            let store = provisioned_store(&settings)?;
            let target = resolve_selection(&store.list_revoked(), &name)?;

            println!("{}", format!("Re-issuing certificate for {}...", target).cyan());
            let report = settings.lifecycle().restore(&target)?;
            print_report(&report, &settings.service_name)?;
        }

        Commands::Kick { name } => {
            let registry = settings.registry();
            let target = resolve_selection(&registry.connected_users(), &name)?;

            let result = registry.client().disconnect_user(&target)?;
            if result.success {
                println!("{}", format!("{} disconnected", target).green().bold());
            } else {
                return Err(Error::InvalidInput(format!(
                    "server refused to disconnect {}: {}",
                    target,
                    result.raw_response.trim()
                )));
            }
        }

        Commands::Stats { top, format } => {
            let output_format = format.parse::<OutputFormat>()?;
            let snapshot = settings.registry().snapshot();
            let store = settings.store();
            let (valid, revoked) = if store.is_provisioned() {
                (store.list_valid().len(), store.list_revoked().len())
            } else {
                log::warn!("{}", Error::CaNotProvisioned(store.ca_root().to_path_buf()));
                (0, 0)
            };
            let stats = Statistics::collect(&snapshot.sessions, valid, revoked);

            match output_format {
                OutputFormat::Pretty => print_stats(&stats, top, snapshot.source),
                #[cfg(feature = "json")]
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            }
        }

        Commands::Inspect { name, format } => {
            let output_format = format.parse::<OutputFormat>()?;
            let store = provisioned_store(&settings)?;
            let target = resolve_selection(&store.list_valid(), &name)?;
            let details = inspect_certificate(&store, &target)?;

            match output_format {
                OutputFormat::Pretty => print_details(&details),
                #[cfg(feature = "json")]
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&details)?),
            }
        }

        Commands::Config => {
            print!("{}", settings.to_toml()?);
        }
    }

    Ok(())
}

fn provisioned_store(settings: &Settings) -> Result<CertificateStore> {
    let store = settings.store();
    if !store.is_provisioned() {
        return Err(Error::CaNotProvisioned(store.ca_root().to_path_buf()));
    }
    Ok(store)
}

fn source_label(source: SessionSource) -> &'static str {
    match source {
        SessionSource::Management => "management interface",
        SessionSource::StatusFile => "status file (management interface unreachable)",
        SessionSource::Unavailable => "no source available",
    }
}

fn print_sessions(snapshot: &SessionSnapshot) {
    println!(
        "{} ({})",
        "Connected clients".cyan().bold(),
        source_label(snapshot.source).dimmed()
    );

    if snapshot.source == SessionSource::Unavailable {
        println!(
            "  {}",
            "Neither the management interface nor the status file could be read".yellow()
        );
        return;
    }
    if snapshot.sessions.is_empty() {
        println!("  {}", "none".dimmed());
        return;
    }

    println!(
        "  {}",
        format!(
            "{:<20} {:<22} {:<16} {:>12} {:>12}  {}",
            "User", "Real address", "Virtual address", "Received", "Sent", "Connected since"
        )
        .bold()
    );
    for s in &snapshot.sessions {
        println!(
            "  {} {:<22} {:<16} {:>12} {:>12}  {}",
            format!("{:<20}", s.user).green(),
            s.real_address,
            s.virtual_address,
            format_bytes(s.bytes_received),
            format_bytes(s.bytes_sent),
            s.connected_since.dimmed()
        );
    }
    println!("  {}: {}", "Total".cyan(), snapshot.sessions.len());
}

fn print_stats(stats: &Statistics, top: usize, source: SessionSource) {
    println!("{}", "Server statistics".cyan().bold());
    println!("  {}: {}", "Session source".cyan(), source_label(source));
    println!("  {}: {}", "Connected users".cyan(), stats.connected_users);
    println!("  {}: {}", "Valid certificates".cyan(), stats.valid_certificates);
    println!("  {}: {}", "Revoked certificates".cyan(), stats.revoked_certificates);
    println!("  {}: {}", "Received".cyan(), format_bytes(stats.bytes_received));
    println!("  {}: {}", "Sent".cyan(), format_bytes(stats.bytes_sent));
    println!("  {}: {}", "Total traffic".cyan(), format_bytes(stats.total_traffic()));

    let talkers = stats.top_talkers(top);
    if !talkers.is_empty() {
        println!("\n{}", format!("Top {} by traffic", talkers.len()).cyan().bold());
        for (idx, s) in talkers.iter().enumerate() {
            println!(
                "  {}. {} {}",
                idx + 1,
                format!("{:<20}", s.user).green(),
                format_bytes(s.total_bytes())
            );
        }
    }
}

fn print_details(cert: &CertificateDetails) {
    println!("\n{}", format!("Certificate {}", cert.common_name).bold().cyan());
    println!("{}", "-".repeat(60));
    println!("  {}: {}", "Subject".bold().yellow(), cert.subject);
    println!("  {}: {}", "Issuer".bold().yellow(), cert.issuer);
    println!("  {}: {}", "Serial Number".bold().yellow(), cert.serial_number);

    let validity = if cert.is_valid {
        cert.validity_status.green()
    } else {
        cert.validity_status.red()
    };
    println!("  {}: {}", "Validity Status".bold().yellow(), validity);
    println!("  {}: {}", "Not Before".bold().yellow(), cert.not_before.dimmed());
    println!("  {}: {}", "Not After".bold().yellow(), cert.not_after.dimmed());
    println!(
        "  {}: {}",
        "Signature Algorithm".bold().yellow(),
        cert.signature_algorithm.dimmed()
    );

    if !cert.subject_alt_names.is_empty() {
        println!("  {}:", "Subject Alternative Names".bold().yellow());
        for san in &cert.subject_alt_names {
            println!("    - {}", san.cyan());
        }
    }
    if !cert.extended_key_usage.is_empty() {
        println!(
            "  {}: {}",
            "Extended Key Usage".bold().yellow(),
            cert.extended_key_usage.join(", ").dimmed()
        );
    }
}

/// Prints a workflow outcome. A partial failure is printed in full and then
/// returned as the error of its failed step.
fn print_report(report: &WorkflowReport, service_name: &str) -> Result<()> {
    let verb = match report.kind {
        WorkflowKind::Revoke => "revoked",
        WorkflowKind::Restore => "re-issued",
    };

    if report.is_done() {
        println!(
            "{}",
            format!("Certificate for {} {}!", report.common_name, verb)
                .green()
                .bold()
        );
        if report.kind == WorkflowKind::Restore {
            let a = &report.artifacts;
            println!("  {}: {}", "Certificate".cyan(), a.certificate_path.display());
            println!("  {}: {}", "Private Key".cyan(), a.private_key_path.display());
            println!("  {}: {}", "Index lines removed".cyan(), a.index_lines_removed);
        }
    } else if let Some(step) = report.failed_step() {
        println!(
            "{}",
            format!("Stopped at {} for {}", step.name(), report.common_name)
                .red()
                .bold()
        );
        if let Some(divergence) = report.divergence() {
            println!("  {}: {}", "State".yellow(), divergence);
        }
        if report.crl_out_of_sync() {
            println!(
                "  {}",
                "Run `easyrsa gen-crl` in the CA directory once the problem is fixed".yellow()
            );
        }
    }

    if report.restart_required() {
        println!(
            "{} {}",
            "Restart the server to load the new CRL:".yellow(),
            format!("systemctl restart {}", service_name).bold()
        );
    }

    match report.failure() {
        None => Ok(()),
        Some(StepFailure::Tool(failure)) => Err(Error::ExternalTool(failure.clone())),
        Some(StepFailure::Filesystem(msg)) => Err(Error::Io(std::io::Error::other(msg.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ovpn-manager",
            "sessions",
            "--mgmt-port",
            "7600",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.mgmt_port, Some(7600));
        assert!(matches!(cli.command, Commands::Sessions { ref format } if format == "json"));
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["ovpn-manager", "-vv", "config"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_defaults_for_subcommands() {
        let cli = Cli::try_parse_from(["ovpn-manager", "logs"]).unwrap();
        assert!(matches!(cli.command, Commands::Logs { lines } if lines == DEFAULT_TAIL_LINES));

        let cli = Cli::try_parse_from(["ovpn-manager", "stats"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats { top, .. } if top == DEFAULT_TOP));
    }

    #[test]
    fn test_missing_name_rejected() {
        assert!(Cli::try_parse_from(["ovpn-manager", "revoke"]).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("manager.toml");
        std::fs::write(&path, "management_port = 7600\nservice_name = \"vpn\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "ovpn-manager",
            "--config",
            path.to_str().unwrap(),
            "--mgmt-port",
            "7700",
            "config",
        ])
        .unwrap();
        let settings = cli.settings().unwrap();

        assert_eq!(settings.management_port, 7700);
        assert_eq!(settings.service_name, "vpn");
    }

    #[test]
    fn test_output_format() {
        assert!(matches!("Pretty".parse::<OutputFormat>(), Ok(OutputFormat::Pretty)));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
