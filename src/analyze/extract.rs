//! Pull a typed JSON payload out of free-form completion text.
//!
//! Order: whole text as JSON, then each fenced block, then the first well-formed
//! object found anywhere in the text. Anything else is an error for the caller's fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::oracle::OracleError;

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").unwrap());

pub fn extract_payload<T: DeserializeOwned>(text: &str) -> Result<T, OracleError> {
    let mut schema_err: Option<String> = None;

    let mut attempt = |candidate: &str| -> Option<T> {
        let value: serde_json::Value = serde_json::from_str(candidate.trim()).ok()?;
        match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                schema_err.get_or_insert_with(|| e.to_string());
                None
            }
        }
    };

    if let Some(v) = attempt(text) {
        return Ok(v);
    }
    for cap in RE_FENCE.captures_iter(text) {
        if let Some(v) = cap.get(1).and_then(|m| attempt(m.as_str())) {
            return Ok(v);
        }
    }

    // Embedded object: take the first `{` whose prefix parses as a complete value.
    for (idx, _) in text.match_indices('{') {
        let mut de = serde_json::Deserializer::from_str(&text[idx..]);
        let Ok(value) = serde_json::Value::deserialize(&mut de) else {
            continue;
        };
        match T::deserialize(value) {
            Ok(v) => return Ok(v),
            Err(e) => {
                schema_err.get_or_insert_with(|| e.to_string());
            }
        }
    }

    Err(match schema_err {
        Some(msg) => OracleError::Schema(msg),
        None => OracleError::Malformed,
    })
}
