//! Cloud Enterprise Network lookups

use std::collections::HashMap;

use serde_json::Value as Json;
use yunform_core::resource::Value;

use super::{first_with_id, refresh_result, update_tags};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;

/// `DescribeCens` filtered to a single `CenId`
pub async fn describe_cen_instance(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let mut request = Request::new();
    request.insert(
        "Filter".to_string(),
        serde_json::json!([{"Key": "CenId", "Value": [id]}]),
    );
    // Served by the central endpoint; RegionId still goes out with the common parameters
    let response = client
        .request_with_retry(Product::Cbn, "DescribeCens", &request, super::DESCRIBE_TIMEOUT, &[])
        .await?;
    first_with_id(&response, "$.Cens.Cen", "CenId", "CEN", id)
}

pub async fn cen_instance_state_refresh(
    client: &RpcClient,
    id: &str,
    fail_states: &[&str],
) -> AlicloudResult<Option<(Json, String)>> {
    let result = describe_cen_instance(client, id).await;
    refresh_result(result, "Status", fail_states, "CEN", id)
}

/// Apply tag differences with `TagResources` / `UntagResources`
pub async fn set_resource_tags(
    client: &RpcClient,
    id: &str,
    old: Option<&HashMap<String, Value>>,
    new: Option<&HashMap<String, Value>>,
) -> AlicloudResult<()> {
    update_tags(client, Product::Cbn, "UntagResources", "cen", id, old, new).await
}
