//! Reading the tail of the OpenVPN server log.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

pub const DEFAULT_LOG_PATH: &str = "/var/log/openvpn/openvpn.log";
pub const DEFAULT_TAIL_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Error,
    Warning,
    Connected,
    Plain,
}

pub fn classify(line: &str) -> LineKind {
    if line.contains("ERROR") || line.contains("error") {
        LineKind::Error
    } else if line.contains("WARNING") || line.contains("warning") {
        LineKind::Warning
    } else if line.contains("Connected") || line.contains("connected") {
        LineKind::Connected
    } else {
        LineKind::Plain
    }
}

/// Last `count` lines of the log, oldest first, without line terminators.
pub fn tail_lines(path: &Path, count: usize) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(format!("log file {}", path.display())),
        _ => Error::Io(e),
    })?;

    let mut window = VecDeque::with_capacity(count.min(4096));
    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        if count == 0 {
            continue;
        }
        if window.len() == count {
            window.pop_front();
        }
        let text = String::from_utf8_lossy(&line);
        window.push_back(text.trim_end_matches('\r').to_string());
    }

    Ok(window.into())
}
