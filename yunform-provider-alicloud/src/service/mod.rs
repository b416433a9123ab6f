//! Describe helpers and status refresh functions, one module per product
//!
//! A `describe_*` helper fetches a single object by id and reports
//! `AlicloudError::NotFound` when it is gone. The matching `*_state_refresh`
//! adapts it to `StateChangeConf::wait_for_state`.

pub mod alb;
pub mod cbn;
pub mod dbfs;
pub mod dts;
pub mod sgw;
pub mod vpc;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde_json::Value as Json;
use yunform_core::resource::Value;

use crate::client::{Product, Request, RpcClient};
use crate::error::{AlicloudError, AlicloudResult, is_expected_errors, not_found_error};
use crate::jsonpath;

/// How long a describe call keeps retrying transient errors
pub const DESCRIBE_TIMEOUT: Duration = Duration::from_secs(300);

const TAGGING_TIMEOUT: Duration = Duration::from_secs(600);

/// Tag keys owned by the platform, never removed
const SYSTEM_TAG_PREFIXES: &[&str] = &["aliyun", "acs:", "http://", "https://"];

/// Issue a lookup call, mapping `not_found_codes` to `NotFound`
pub(crate) async fn describe_call(
    client: &RpcClient,
    product: Product,
    action: &str,
    request: &Request,
    kind: &str,
    id: &str,
    not_found_codes: &[&str],
) -> AlicloudResult<Json> {
    match client
        .request_with_retry(product, action, request, DESCRIBE_TIMEOUT, &[])
        .await
    {
        Err(e) if is_expected_errors(&e, not_found_codes) => Err(AlicloudError::not_found(kind, id)),
        other => other,
    }
}

/// First object of the list at `path`, which must carry `id` in `id_field`
pub(crate) fn first_with_id(
    response: &Json,
    path: &str,
    id_field: &str,
    kind: &str,
    id: &str,
) -> AlicloudResult<Json> {
    let items = jsonpath::list(response, path)?;
    match items.into_iter().next() {
        Some(object) if jsonpath::string(&object, id_field).as_deref() == Some(id) => Ok(object),
        _ => Err(AlicloudError::not_found(kind, id)),
    }
}

/// Adapt a describe result for status polling.
///
/// Not found becomes `None`. A status listed in `fail_states` is an error.
pub fn refresh_result(
    result: AlicloudResult<Json>,
    status_path: &str,
    fail_states: &[&str],
    kind: &str,
    id: &str,
) -> AlicloudResult<Option<(Json, String)>> {
    let object = match result {
        Ok(object) => object,
        Err(e) if not_found_error(&e) => return Ok(None),
        Err(e) => return Err(e),
    };

    let status = jsonpath::string(&object, status_path).unwrap_or_default();
    if fail_states.contains(&status.as_str()) {
        return Err(AlicloudError::UnexpectedStatus {
            kind: kind.to_string(),
            id: id.to_string(),
            status,
        });
    }
    Ok(Some((object, status)))
}

/// Tags to add and tag keys to remove when moving from `old` to `new`.
/// A changed value is removed and added again.
pub fn tag_changes(
    old: Option<&HashMap<String, Value>>,
    new: Option<&HashMap<String, Value>>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let empty = HashMap::new();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);
    let text = |v: &Value| v.as_str().unwrap_or_default().to_string();

    let mut removed: Vec<String> = old
        .iter()
        .filter(|(k, v)| new.get(*k).is_none_or(|n| text(n) != text(v)))
        .map(|(k, _)| k.clone())
        .filter(|k| !SYSTEM_TAG_PREFIXES.iter().any(|p| k.starts_with(p)))
        .collect();
    removed.sort();

    let added = new
        .iter()
        .filter(|(k, v)| old.get(*k).is_none_or(|o| text(o) != text(v)))
        .map(|(k, v)| (k.clone(), text(v)))
        .collect();

    (added, removed)
}

/// Reconcile tags through `TagResources` and the product's untag action
pub(crate) async fn update_tags(
    client: &RpcClient,
    product: Product,
    untag_action: &str,
    resource_type: &str,
    id: &str,
    old: Option<&HashMap<String, Value>>,
    new: Option<&HashMap<String, Value>>,
) -> AlicloudResult<()> {
    let (added, removed) = tag_changes(old, new);

    if !removed.is_empty() {
        let mut request = request_of(client, &[("ResourceType", resource_type), ("ResourceId.1", id)]);
        for (i, key) in removed.iter().enumerate() {
            request.insert(format!("TagKey.{}", i + 1), Json::String(key.clone()));
        }
        client
            .request_with_retry(product, untag_action, &request, TAGGING_TIMEOUT, &["Throttling"])
            .await?;
    }

    if !added.is_empty() {
        let mut request = request_of(client, &[("ResourceType", resource_type), ("ResourceId.1", id)]);
        for (i, (key, value)) in added.iter().enumerate() {
            request.insert(format!("Tag.{}.Key", i + 1), Json::String(key.clone()));
            request.insert(format!("Tag.{}.Value", i + 1), Json::String(value.clone()));
        }
        client
            .request_with_retry(product, "TagResources", &request, TAGGING_TIMEOUT, &["Throttling"])
            .await?;
    }

    log::debug!("{} {}: {} tags added, {} removed", resource_type, id, added.len(), removed.len());
    Ok(())
}

/// Request with `RegionId` and the given string entries
pub(crate) fn request_of(client: &RpcClient, entries: &[(&str, &str)]) -> Request {
    let mut request = Request::new();
    request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
    for (key, value) in entries {
        request.insert(key.to_string(), Json::String(value.to_string()));
    }
    request
}
