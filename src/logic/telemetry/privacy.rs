//! Content fingerprints
//!
//! User text never enters the buffer. Anything that could carry it is
//! reduced to a truncated SHA-256 fingerprint plus a length, which is
//! enough to spot a duplicate delivery without retaining content.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::constants::CONTENT_HASH_HEX_LEN;

/// Payload keys that may carry user text
const CONTENT_KEYS: &[&str] = &["content", "text", "input", "output", "data", "value"];

/// One-way, deterministic fingerprint of `text`
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..CONTENT_HASH_HEX_LEN].to_string()
}

/// Length in characters (what the user perceives as the paste size)
pub fn content_length(text: &str) -> usize {
    text.chars().count()
}

/// Strip user text out of a free-form producer payload.
///
/// String values under a content-like key become `<key>Hash` + `<key>Length`.
/// Nested objects are sanitised recursively; non-object payloads are wrapped
/// as `{ "value": ... }`.
pub fn sanitize_payload(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => sanitize_map(map),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            sanitize_map(map)
        }
    }
}

fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
    let mut clean = Map::with_capacity(map.len());

    for (key, value) in map {
        match value {
            Value::String(text) if is_content_key(&key) => {
                clean.insert(format!("{}Hash", key), Value::String(content_hash(&text)));
                clean.insert(format!("{}Length", key), Value::from(content_length(&text)));
            }
            Value::Object(inner) => {
                clean.insert(key, Value::Object(sanitize_map(inner)));
            }
            other => {
                clean.insert(key, other);
            }
        }
    }

    clean
}

fn is_content_key(key: &str) -> bool {
    CONTENT_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}
