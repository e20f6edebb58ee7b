//! Serialization of job-data maps.
//!
//! Two on-disk forms, selected by the `use_properties` configuration flag:
//!
//! - **Binary** (default): the persistent entries as a JSON document. The
//!   bytes are opaque to the database.
//! - **Properties**: a `key=value` text stream constrained to string-valued
//!   entries. Non-string or null values fail with a codec error before any
//!   row is touched.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::datamap::JobDataMap;
use crate::error::{StoreError, StoreResult};

/// Serialize a job-data map in the configured mode. Transient entries are
/// stripped in either mode.
pub fn serialize_data_map(map: &JobDataMap, use_properties: bool) -> StoreResult<Vec<u8>> {
    let entries = map.persistent_entries();
    if use_properties {
        serialize_properties(&entries)
    } else {
        serde_json::to_vec(&entries).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

/// Deserialize a job-data blob. An empty blob yields an empty map.
pub fn deserialize_data_map(bytes: &[u8], use_properties: bool) -> StoreResult<JobDataMap> {
    if bytes.is_empty() {
        return Ok(JobDataMap::new());
    }
    let entries = if use_properties {
        deserialize_properties(bytes)?
    } else {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))?
    };
    Ok(JobDataMap::from(entries))
}

fn serialize_properties(entries: &BTreeMap<String, Value>) -> StoreResult<Vec<u8>> {
    let mut out = String::new();
    for (key, value) in entries {
        let value = match value {
            Value::String(s) => s,
            Value::Null => {
                return Err(StoreError::Codec(format!(
                    "null value not allowed in properties mode, key: {key}"
                )))
            }
            other => {
                return Err(StoreError::Codec(format!(
                    "values must be strings in properties mode, key: {key}, got: {other}"
                )))
            }
        };
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    Ok(out.into_bytes())
}

fn deserialize_properties(bytes: &[u8]) -> StoreResult<BTreeMap<String, Value>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| StoreError::Codec(format!("property data is not valid utf-8: {e}")))?;
    let mut entries = BTreeMap::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let (key, value) = split_property_line(line)
            .ok_or_else(|| StoreError::Codec(format!("malformed property line: {line}")))?;
        entries.insert(unescape(&key)?, Value::String(unescape(&value)?));
    }
    Ok(entries)
}

/// Split on the first unescaped `=`.
fn split_property_line(line: &str) -> Option<(String, String)> {
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            '=' if !escaped => {
                return Some((line[..i].to_string(), line[i + 1..].to_string()));
            }
            _ => escaped = false,
        }
    }
    None
}

fn escape(s: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '=' if is_key => out.push_str("\\="),
            other => out.push(other),
        }
    }
    out
}

fn unescape(s: &str) -> StoreResult<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('=') => out.push('='),
            other => {
                return Err(StoreError::Codec(format!(
                    "invalid escape sequence in property data: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
