//! Small transformations applied to upstream payloads before they are
//! returned to callers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::error::{ServerError, ServerResult};

/// Decode a contents-API `content` field. The upstream wraps its base64 at
/// 60 columns, so all ASCII whitespace is dropped first. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn decode_content(encoded: &str) -> ServerResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ServerError::bad_request(format!("file content is not valid base64: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Number of lines when splitting on `\r\n`, `\r` or `\n`. A trailing
/// terminator yields an empty last line, and the empty string is one line.
pub fn count_lines(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut lines = 1;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => lines += 1,
            _ => {}
        }
        i += 1;
    }
    lines
}

/// Keep only the entries of a recursive tree listing at or below `path`.
pub fn filter_tree(listing: &mut Value, path: &str) {
    let prefix = path.trim_matches('/');
    if prefix.is_empty() {
        return;
    }
    let nested = format!("{prefix}/");
    let kept: Vec<Value> = listing
        .get("tree")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| {
                    entry
                        .get("path")
                        .and_then(Value::as_str)
                        .is_some_and(|p| p == prefix || p.starts_with(&nested))
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    if let Some(object) = listing.as_object_mut() {
        object.insert("tree".into(), Value::Array(kept));
    }
}

/// Query flag parsing: absent means `default`; otherwise only `1`, `true`
/// and `yes` (any case) count as set.
pub fn flag(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
    }
}
