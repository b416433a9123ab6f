//! Minimal JSON path lookup (`$.Vpcs.Vpc`, `$.Rules[0].Status`)

use serde_json::Value as Json;

use crate::error::{AlicloudError, AlicloudResult};

/// Look up a dotted path in a response body
pub fn get<'a>(obj: &'a Json, path: &str) -> AlicloudResult<&'a Json> {
    lookup(obj, path).ok_or_else(|| {
        AlicloudError::decode(
            path.to_string(),
            format!("path {} not found in response", path),
        )
    })
}

/// Like `get`, for paths that may legitimately be absent
pub fn lookup<'a>(obj: &'a Json, path: &str) -> Option<&'a Json> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let mut current = obj;

    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let (key, indexes) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };
        if !key.is_empty() {
            current = current.get(key)?;
        }
        for index in indexes
            .split(']')
            .filter_map(|s| s.strip_prefix('['))
        {
            current = current.get(index.parse::<usize>().ok()?)?;
        }
    }

    Some(current)
}

/// Array at `path`, cloned. A missing or null value yields an empty list.
pub fn list(obj: &Json, path: &str) -> AlicloudResult<Vec<Json>> {
    match lookup(obj, path) {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::Array(items)) => Ok(items.clone()),
        Some(other) => Err(AlicloudError::decode(
            path.to_string(),
            format!("expected a list at {}, got {}", path, other),
        )),
    }
}

/// String form of a scalar at `path`
pub fn string(obj: &Json, path: &str) -> Option<String> {
    match lookup(obj, path)? {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
