//! Text encodings for stored maps.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

/// Encodes text as base64 with `=` and `+` swapped for `(` and `)`, so the
/// result shares the character set of the other stored tokens.
pub fn encode_token(text: &str) -> String {
    STANDARD
        .encode(text.as_bytes())
        .replace('=', "(")
        .replace('+', ")")
}

/// Inverse of [`encode_token`]. Returns `None` for anything that is not a
/// valid encoding of UTF-8 text.
pub fn decode_token(encoded: &str) -> Option<String> {
    let b64 = encoded.replace('(', "=").replace(')', "+");
    let bytes = STANDARD.decode(b64).ok()?;
    String::from_utf8(bytes).ok()
}

pub fn map_to_json(map: &HashMap<String, String>) -> Result<String, serde_json::Error> {
    serde_json::to_string(map)
}

/// Parses a JSON object, coercing every value to a string.
pub fn json_to_map(text: &str) -> Option<HashMap<String, String>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(object) => Some(coerce_string_map(&object)),
        _ => None,
    }
}

pub fn coerce_string_map(object: &Map<String, Value>) -> HashMap<String, String> {
    object
        .iter()
        .map(|(k, v)| (k.clone(), coerce_value(v)))
        .collect()
}

/// Strings are taken verbatim; everything else uses its JSON rendering.
pub fn coerce_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
