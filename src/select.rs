use crate::error::{Error, Result};

/// Resolves operator input against a candidate list.
///
/// Accepts a 1-based position, an exact name, or a case-insensitive fragment
/// matching exactly one candidate. `0` cancels.
pub fn resolve_selection(candidates: &[String], input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("no selection given".to_string()));
    }

    if input.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(position) = input.parse::<usize>() {
            if position == 0 {
                return Err(Error::Cancelled);
            }
            if let Some(name) = candidates.get(position - 1) {
                return Ok(name.clone());
            }
            // A numeric common name is still allowed to match by name.
            if !candidates.iter().any(|c| c == input) {
                return Err(Error::InvalidInput(format!(
                    "{} is out of range (1-{})",
                    position,
                    candidates.len()
                )));
            }
        }
    }

    if let Some(exact) = candidates.iter().find(|c| c.as_str() == input) {
        return Ok(exact.clone());
    }

    let needle = input.to_lowercase();
    let mut matches: Vec<String> = candidates
        .iter()
        .filter(|c| c.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    match matches.len() {
        0 => Err(Error::NotFound(format!("no entry matches '{}'", input))),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::AmbiguousSelection {
            input: input.to_string(),
            candidates: matches,
        }),
    }
}
