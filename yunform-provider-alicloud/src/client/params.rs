//! Flattening of structured request maps into RPC query parameters

use std::collections::BTreeMap;

use serde_json::Value as Json;

/// Request body as built by resources and data sources
pub type Request = serde_json::Map<String, Json>;

/// Nested maps become `Key.Sub`, lists become `Key.1`, `Key.2`, ...
pub fn flatten_request(request: &Request) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (key, value) in request {
        flatten_into(key, value, &mut out);
    }
    out
}

fn flatten_into(prefix: &str, value: &Json, out: &mut BTreeMap<String, String>) {
    match value {
        Json::Null => {}
        Json::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Json::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Json::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Json::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(&format!("{}.{}", prefix, i + 1), item, out);
            }
        }
        Json::Object(map) => {
            for (key, item) in map {
                flatten_into(&format!("{}.{}", prefix, key), item, out);
            }
        }
    }
}
