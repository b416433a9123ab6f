//! Mapping between API JSON and schema attributes
//!
//! Each attribute maps to an API field through `provider_name`. Nested
//! blocks map recursively through their own field schemas.

use std::collections::HashMap;

use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::client::Request;

/// Flatten an API object into attributes declared by `schema`
pub fn attributes_from_response(schema: &ResourceSchema, obj: &Json) -> HashMap<String, Value> {
    fields_from_response(schema.attributes.values(), obj)
}

pub fn fields_from_response<'a>(
    fields: impl IntoIterator<Item = &'a AttributeSchema>,
    obj: &Json,
) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    for field in fields {
        if let Some(value) = obj
            .get(field.api_name())
            .and_then(|json| json_to_attribute(&field.attr_type, json))
        {
            attributes.insert(field.name.clone(), value);
        }
    }
    attributes
}

/// Convert one JSON value, coercing the loose typing of RPC responses
pub fn json_to_attribute(attr_type: &AttributeType, json: &Json) -> Option<Value> {
    match (attr_type, json) {
        (_, Json::Null) => None,
        (AttributeType::Custom { base, .. }, _) => json_to_attribute(base, json),

        (AttributeType::String | AttributeType::Enum(_), Json::String(s)) => {
            Some(Value::String(s.clone()))
        }
        (AttributeType::String | AttributeType::Enum(_), Json::Number(n)) => {
            Some(Value::String(n.to_string()))
        }
        (AttributeType::String | AttributeType::Enum(_), Json::Bool(b)) => {
            Some(Value::String(b.to_string()))
        }

        (AttributeType::Int, Json::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Value::Int),
        (AttributeType::Int, Json::String(s)) => s.trim().parse().ok().map(Value::Int),

        (AttributeType::Float, Json::Number(n)) => n.as_f64().map(Value::Float),
        (AttributeType::Float, Json::String(s)) => s.trim().parse().ok().map(Value::Float),

        (AttributeType::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
        (AttributeType::Bool, Json::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (AttributeType::List(inner), Json::Array(items)) => Some(Value::List(
            items
                .iter()
                .filter_map(|item| json_to_attribute(inner, item))
                .collect(),
        )),
        (AttributeType::List(inner), Json::Object(map)) => match &**inner {
            // A single block returned where a list is declared
            AttributeType::Struct(fields) if fields.iter().any(|f| map.contains_key(f.api_name())) => {
                json_to_attribute(inner, json).map(|v| Value::List(vec![v]))
            }
            // `{"VSwitchId": ["vsw-1"]}` style wrappers
            _ if map.len() == 1 => map
                .values()
                .next()
                .filter(|v| v.is_array())
                .and_then(|v| json_to_attribute(attr_type, v)),
            _ => None,
        },

        (AttributeType::Map(_), Json::Array(items)) => Some(Value::Map(tags_from_list(items))),
        (AttributeType::Map(_), Json::Object(map)) if map.len() == 1 && map.values().all(Json::is_array) => {
            map.values()
                .next()
                .and_then(Json::as_array)
                .map(|items| Value::Map(tags_from_list(items)))
        }
        (AttributeType::Map(inner), Json::Object(map)) => Some(Value::Map(
            map.iter()
                .filter_map(|(k, v)| json_to_attribute(inner, v).map(|v| (k.clone(), v)))
                .collect(),
        )),

        (AttributeType::Struct(fields), Json::Object(_)) => {
            Some(Value::Map(fields_from_response(fields, json)))
        }

        _ => None,
    }
}

/// `[{"Key": .., "Value": ..}]` or `[{"TagKey": .., "TagValue": ..}]`
pub fn tags_from_list(items: &[Json]) -> HashMap<String, Value> {
    items
        .iter()
        .filter_map(|tag| {
            let key = tag.get("Key").or_else(|| tag.get("TagKey"))?.as_str()?;
            let value = tag
                .get("Value")
                .or_else(|| tag.get("TagValue"))
                .and_then(Json::as_str)
                .unwrap_or_default();
            Some((key.to_string(), Value::String(value.to_string())))
        })
        .collect()
}

/// Convert one attribute value into the JSON the API expects
pub fn attribute_to_json(attr_type: &AttributeType, value: &Value) -> Option<Json> {
    match (attr_type, value) {
        (_, Value::ResourceRef(_, _)) => None,
        (AttributeType::Custom { base, .. }, _) => attribute_to_json(base, value),
        (AttributeType::Struct(fields), Value::Map(map)) => {
            let mut obj = serde_json::Map::new();
            for field in fields {
                if let Some(json) = map.get(&field.name).and_then(|v| field_to_json(field, v)) {
                    obj.insert(field.api_name().to_string(), json);
                }
            }
            Some(Json::Object(obj))
        }
        (AttributeType::List(inner), Value::List(items)) => Some(Json::Array(
            items
                .iter()
                .filter_map(|item| attribute_to_json(inner, item))
                .collect(),
        )),
        (AttributeType::Map(inner), Value::Map(map)) => Some(Json::Object(
            map.iter()
                .filter_map(|(k, v)| attribute_to_json(inner, v).map(|j| (k.clone(), j)))
                .collect(),
        )),
        (_, Value::String(s)) => Some(Json::String(s.clone())),
        (_, Value::Int(i)) => Some(Json::from(*i)),
        (_, Value::Float(f)) => serde_json::Number::from_f64(*f).map(Json::Number),
        (_, Value::Bool(b)) => Some(Json::Bool(*b)),
        (_, Value::List(items)) => Some(Json::Array(
            items
                .iter()
                .filter_map(|item| attribute_to_json(&AttributeType::String, item))
                .collect(),
        )),
        (_, Value::Map(map)) => Some(Json::Object(
            map.iter()
                .filter_map(|(k, v)| attribute_to_json(&AttributeType::String, v).map(|j| (k.clone(), j)))
                .collect(),
        )),
    }
}

/// Blocks limited to a single item are sent as an object, not a list
fn field_to_json(field: &AttributeSchema, value: &Value) -> Option<Json> {
    match (field.max_items, &field.attr_type, value) {
        (Some(1), AttributeType::List(inner), Value::List(items)) => items
            .first()
            .and_then(|item| attribute_to_json(inner, item)),
        _ => attribute_to_json(&field.attr_type, value),
    }
}

/// Request fields for the named attributes that are set
pub fn request_from_attributes(
    schema: &ResourceSchema,
    attributes: &HashMap<String, Value>,
    names: &[&str],
) -> Request {
    let mut request = Request::new();
    for name in names {
        let (Some(field), Some(value)) = (schema.attributes.get(*name), attributes.get(*name)) else {
            continue;
        };
        if let Some(json) = field_to_json(field, value) {
            request.insert(field.api_name().to_string(), json);
        }
    }
    request
}

/// `Tag.N.Key` / `Tag.N.Value` request entries, sorted by key
pub fn tags_request(tags: &HashMap<String, Value>) -> Json {
    let mut keys: Vec<&String> = tags.keys().collect();
    keys.sort();
    Json::Array(
        keys.into_iter()
            .map(|k| {
                let value = tags.get(k).and_then(Value::as_str).unwrap_or_default();
                serde_json::json!({"Key": k, "Value": value})
            })
            .collect(),
    )
}
