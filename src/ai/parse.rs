//! Recovering structured data from free-form model output.
//!
//! Models are asked to answer with a single JSON object or array and
//! nothing else, but they regularly wrap it in prose or a markdown
//! fence. Parsing goes through three steps:
//!
//! 1. Parse the whole response.
//! 2. Parse the first balanced `{...}` or `[...]` substring that
//!    deserializes into the target type.
//! 3. Give up with a [`CollaboratorParseError`] carrying the raw text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use thiserror::Error;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^```[a-zA-Z]*\s*$").expect("Invalid code fence regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse collaborator response: {message}")]
pub struct CollaboratorParseError {
    pub message: String,
    pub raw_response: String,
}

pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, CollaboratorParseError> {
    let direct_err = match serde_json::from_str::<T>(raw.trim()) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => e,
    };

    let mut last_err = None;
    for candidate in balanced_candidates(raw) {
        match serde_json::from_str::<T>(candidate) {
            Ok(parsed) => {
                tracing::debug!("Recovered JSON from a substring of the response");
                return Ok(parsed);
            }
            Err(e) => last_err = Some(e),
        }
    }

    let message = match last_err {
        Some(e) => format!("failed to parse extracted JSON: {}", e),
        None => format!("failed to parse response: {}", direct_err),
    };
    tracing::warn!("{}", message);

    Err(CollaboratorParseError {
        message,
        raw_response: raw.to_string(),
    })
}

/// Every balanced `{...}`/`[...]` substring in order of its opening
/// bracket. Brackets inside JSON strings are ignored.
fn balanced_candidates(raw: &str) -> impl Iterator<Item = &str> {
    raw.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .filter_map(|(start, _)| balanced_end(&raw[start..]).map(|end| &raw[start..start + end]))
}

fn balanced_end(s: &str) -> Option<usize> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// Plain-text answers sometimes come back in a markdown fence.
pub fn clean_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    CODE_FENCE.replace_all(trimmed, "").trim().to_string()
}

/// Models like to answer `null` instead of leaving a field out.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
