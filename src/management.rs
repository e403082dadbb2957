//! Client for the OpenVPN management interface.
//!
//! Started with `--management <addr> <port>`, the server accepts plain-text
//! commands on a TCP socket. Every call here opens a fresh connection, drains
//! the greeting banner, sends exactly one command and closes the socket again.

use crate::error::{Error, Result};
use crate::types::ManagementCommandResult;
use log::{debug, warn};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 7505;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const BANNER_READ_SIZE: usize = 1024;
const RESPONSE_CHUNK_SIZE: usize = 8192;
/// Upper bound on a single response; a status dump past this is truncated.
const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024;

const SUCCESS_MARKER: &str = "SUCCESS:";
const ERROR_MARKER: &str = "ERROR:";
const END_MARKER: &str = "END";

/// Well-known management commands.
pub struct MgmtCommands;

impl MgmtCommands {
    pub const STATUS: &'static str = "status";

    pub fn kill(common_name: &str) -> String {
        format!("kill {}", common_name)
    }
}

#[derive(Debug, Clone)]
pub struct ManagementClient {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ManagementClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bounds connect, every read and every write of one exchange.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sends `status` and returns the raw multi-line dump, up to its `END`
    /// line.
    ///
    /// A reply that is only an `ERROR:` line (for example an unauthenticated
    /// session) is `ManagementUnavailable`.
    pub fn query_status(&self) -> Result<String> {
        let response = self.exchange(MgmtCommands::STATUS, status_end)?;

        let has_end = response.lines().any(|line| line.trim() == END_MARKER);
        if !has_end {
            if let Some(line) = response
                .lines()
                .map(str::trim)
                .find(|line| line.starts_with(ERROR_MARKER))
            {
                return Err(Error::ManagementUnavailable(format!(
                    "{} rejected status: {}",
                    self.endpoint(),
                    line
                )));
            }
        }
        Ok(response)
    }

    /// Sends `kill <username>`; `success` reflects the server's `SUCCESS:`
    /// reply.
    pub fn disconnect_user(&self, username: &str) -> Result<ManagementCommandResult> {
        if username.is_empty() || username.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidInput(format!(
                "Refusing to send kill for malformed name {:?}",
                username
            )));
        }

        let raw_response = self.exchange(&MgmtCommands::kill(username), reply_end)?;
        let success = raw_response.contains(SUCCESS_MARKER);
        if !success {
            warn!("kill {} not acknowledged: {}", username, raw_response.trim());
        }

        Ok(ManagementCommandResult {
            raw_response,
            success,
        })
    }

    fn exchange(&self, command: &str, is_last: fn(&str) -> bool) -> Result<String> {
        let mut stream = self.connect()?;

        let mut banner = [0u8; BANNER_READ_SIZE];
        let read = stream
            .read(&mut banner)
            .map_err(|e| self.unavailable("reading greeting", e))?;
        if read == 0 {
            return Err(Error::ManagementUnavailable(format!(
                "{} closed the connection before greeting",
                self.endpoint()
            )));
        }
        debug!(
            "management greeting from {}: {}",
            self.endpoint(),
            String::from_utf8_lossy(&banner[..read]).trim()
        );

        stream
            .write_all(format!("{}\n", command).as_bytes())
            .map_err(|e| self.unavailable("sending command", e))?;
        debug!("sent management command '{}'", command);

        let response = self.read_response(&mut stream, is_last);
        let _ = stream.shutdown(Shutdown::Both);
        response
    }

    fn connect(&self) -> Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.unavailable("resolving address", e))?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.timeout))
                        .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
                        .map_err(|e| self.unavailable("configuring socket", e))?;
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => self.unavailable("connecting", e),
            None => Error::ManagementUnavailable(format!(
                "{} did not resolve to any address",
                self.endpoint()
            )),
        })
    }

    /// Reads until a terminated line satisfies `is_last`. Only lines
    /// completed by the latest chunk are examined.
    fn read_response(&self, stream: &mut TcpStream, is_last: fn(&str) -> bool) -> Result<String> {
        let mut response = Vec::new();
        let mut chunk = [0u8; RESPONSE_CHUNK_SIZE];
        let mut scanned = 0;

        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    response.extend_from_slice(&chunk[..n]);
                    if last_line_seen(&response, &mut scanned, is_last) {
                        break;
                    }
                    if response.len() >= MAX_RESPONSE_SIZE {
                        warn!(
                            "management response from {} exceeded {} bytes, truncating",
                            self.endpoint(),
                            MAX_RESPONSE_SIZE
                        );
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) && !response.is_empty() => {
                    warn!(
                        "management response from {} incomplete after {:?}",
                        self.endpoint(),
                        self.timeout
                    );
                    break;
                }
                Err(e) => return Err(self.unavailable("reading response", e)),
            }
        }

        if response.is_empty() {
            return Err(Error::ManagementUnavailable(format!(
                "{} closed the connection without a response",
                self.endpoint()
            )));
        }

        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    fn unavailable(&self, stage: &str, err: std::io::Error) -> Error {
        Error::ManagementUnavailable(format!("{} {}: {}", stage, self.endpoint(), err))
    }
}

impl Default for ManagementClient {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Checks the lines terminated since `*scanned`, advancing it past them.
fn last_line_seen(response: &[u8], scanned: &mut usize, is_last: fn(&str) -> bool) -> bool {
    while let Some(pos) = response[*scanned..].iter().position(|b| *b == b'\n') {
        let line = String::from_utf8_lossy(&response[*scanned..*scanned + pos]);
        *scanned += pos + 1;
        if is_last(line.trim()) {
            return true;
        }
    }
    false
}

fn status_end(line: &str) -> bool {
    line == END_MARKER || line.starts_with(ERROR_MARKER)
}

fn reply_end(line: &str) -> bool {
    line.starts_with(SUCCESS_MARKER) || line.starts_with(ERROR_MARKER)
}
