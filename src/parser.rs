//! Tolerant parsing of the semi-structured text OpenVPN and easy-rsa leave
//! behind: comma-separated status dumps and the tab-separated PKI index.
//!
//! Nothing in here fails. A line that does not fit is dropped and the rest of
//! the stream is still returned, because the inputs are live files that may be
//! half-written while we read them.

use crate::types::{parse_index_time, IndexEntry};

const CN_TOKEN: &str = "/CN=";

/// Index of the distinguished-name field in an `index.txt` line.
const INDEX_DN_FIELD: usize = 5;

/// Parses a counter field: all ASCII digits, or zero.
pub fn digits_or_zero(field: &str) -> u64 {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    field.parse().unwrap_or(0)
}

/// Splits every non-empty line on `delimiter`, dropping lines with fewer than
/// `min_fields` fields.
pub fn parse_delimited(text: &str, delimiter: char, min_fields: usize) -> Vec<Vec<&str>> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(delimiter).collect::<Vec<_>>())
        .filter(|fields| fields.len() >= min_fields)
        .collect()
}

/// Returns the non-blank lines strictly between the first line starting with
/// `start_prefix` and the next line starting with `end_prefix`.
///
/// Empty when the start marker never appears. A missing end marker runs the
/// section to the end of the text.
pub fn parse_section<'a>(text: &'a str, start_prefix: &str, end_prefix: &str) -> Vec<&'a str> {
    let mut lines = text.lines().map(str::trim);

    if !lines.any(|line| line.starts_with(start_prefix)) {
        return Vec::new();
    }

    lines
        .take_while(|line| !line.starts_with(end_prefix))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Parses `index.txt` into entries, skipping lines without a usable `/CN=`.
pub fn parse_index_entries(text: &str) -> Vec<IndexEntry> {
    parse_delimited(text, '\t', INDEX_DN_FIELD + 1)
        .into_iter()
        .filter_map(|fields| {
            let flag = fields[0].chars().next()?;
            let common_name = extract_common_name(fields[INDEX_DN_FIELD])?;

            let (revoked_at, revocation_reason) = match fields[2].split_once(',') {
                Some((time, reason)) => (parse_index_time(time), Some(reason.to_string())),
                None => (parse_index_time(fields[2]), None),
            };

            Some(IndexEntry {
                flag,
                expires_at: parse_index_time(fields[1]),
                revoked_at,
                revocation_reason,
                serial: fields[3].to_string(),
                common_name: common_name.to_string(),
            })
        })
        .collect()
}

/// Extracts the first `/CN=<value>` from a distinguished-name string.
pub fn extract_common_name(dn: &str) -> Option<&str> {
    common_names(dn).next()
}

/// True when any `/CN=` token in `text` carries exactly `name`.
pub fn has_common_name(text: &str, name: &str) -> bool {
    common_names(text).any(|cn| cn == name)
}

fn common_names(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices(CN_TOKEN).filter_map(move |(idx, _)| {
        let rest = &text[idx + CN_TOKEN.len()..];
        let end = rest
            .find(|c: char| c == '/' || c == '\t' || c == '\n' || c == '\r')
            .unwrap_or(rest.len());
        let value = rest[..end].trim_end();
        (!value.is_empty()).then_some(value)
    })
}
