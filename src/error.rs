use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A CA tool subcommand that exited unsuccessfully or could not be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub subcommand: String,
    /// `None` when the process never ran or was killed by a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exit_code {
            Some(code) => write!(
                f,
                "`{}` exited with status {}: {}",
                self.subcommand,
                code,
                self.stderr.trim()
            ),
            None => write!(f, "`{}` did not run: {}", self.subcommand, self.stderr.trim()),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Management interface unavailable: {0}")]
    ManagementUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No easy-rsa PKI found at {}", .0.display())]
    CaNotProvisioned(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Selection cancelled")]
    Cancelled,

    #[error("'{input}' matches several entries: {}", .candidates.join(", "))]
    AmbiguousSelection {
        input: String,
        candidates: Vec<String>,
    },

    #[error("CA tool failure: {0}")]
    ExternalTool(ToolFailure),

    #[error("Certificate parsing error: {0}")]
    CertParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// True for the "nothing there" outcomes callers render as empty results.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::CaNotProvisioned(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<x509_parser::nom::Err<x509_parser::error::X509Error>> for Error {
    fn from(err: x509_parser::nom::Err<x509_parser::error::X509Error>) -> Self {
        Error::CertParse(err.to_string())
    }
}

impl From<x509_parser::nom::Err<x509_parser::error::PEMError>> for Error {
    fn from(err: x509_parser::nom::Err<x509_parser::error::PEMError>) -> Self {
        Error::CertParse(err.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
