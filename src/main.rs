#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use ovpn_manager::cli::run_cli;
#[cfg(feature = "cli")]
use ovpn_manager::Error;

#[cfg(feature = "cli")]
fn main() {
    match run_cli() {
        Ok(()) => {}
        Err(Error::Cancelled) => {
            eprintln!("{}", "Cancelled".yellow());
        }
        Err(Error::AmbiguousSelection { input, candidates }) => {
            eprintln!("{} '{}' matches several entries:", "Error:".red().bold(), input);
            for (idx, name) in candidates.iter().enumerate() {
                eprintln!("  {}. {}", idx + 1, name);
            }
            eprintln!("Use the full name to pick one.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature to be enabled.");
    eprintln!("Build with: cargo build --features cli");
    std::process::exit(1);
}
