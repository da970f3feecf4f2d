//! `Upload-Metadata` header encoding.
//!
//! The wire form is a comma-separated list of `key base64(value)` pairs.
//! Keys are transmitted verbatim and must not contain spaces or commas;
//! [`crate::types::UploadConfig::validate`] enforces this before a session
//! starts.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Encodes creation-time metadata into the `Upload-Metadata` header value.
///
/// Pairs are emitted in sorted key order so the output is deterministic.
/// Returns `None` for an empty map (the header is omitted entirely).
pub fn encode_metadata(metadata: &HashMap<String, String>) -> Option<String> {
    if metadata.is_empty() {
        return None;
    }
    let mut keys: Vec<&String> = metadata.keys().collect();
    keys.sort();

    let pairs: Vec<String> = keys
        .into_iter()
        .map(|key| {
            let value = &metadata[key];
            if value.is_empty() {
                key.clone()
            } else {
                format!("{key} {}", STANDARD.encode(value))
            }
        })
        .collect();
    Some(pairs.join(","))
}

/// Decodes an `Upload-Metadata` header value back into a map.
///
/// Pairs with undecodable values are skipped.
pub fn decode_metadata(header: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    for pair in header.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        match pair.split_once(' ') {
            Some((key, encoded)) => {
                if let Ok(raw) = STANDARD.decode(encoded)
                    && let Ok(value) = String::from_utf8(raw)
                {
                    metadata.insert(key.to_string(), value);
                }
            }
            None => {
                metadata.insert(pair.to_string(), String::new());
            }
        }
    }
    metadata
}
