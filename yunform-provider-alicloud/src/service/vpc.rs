//! VPC and VSwitch lookups, plus VPC resource tagging

use std::collections::HashMap;

use serde_json::Value as Json;
use yunform_core::resource::Value;

use super::{DESCRIBE_TIMEOUT, describe_call, first_with_id, refresh_result, request_of, update_tags};
use crate::client::{Product, RpcClient};
use crate::error::{AlicloudError, AlicloudResult};
use crate::jsonpath;
use crate::paging::paginate_tokens;

pub async fn describe_vpc(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let request = request_of(client, &[("VpcId", id)]);
    let response = describe_call(
        client,
        Product::Vpc,
        "DescribeVpcs",
        &request,
        "VPC",
        id,
        &["Forbidden.VpcNotFound", "InvalidVpcID.NotFound"],
    )
    .await?;
    first_with_id(&response, "$.Vpcs.Vpc", "VpcId", "VPC", id)
}

pub async fn vpc_state_refresh(
    client: &RpcClient,
    id: &str,
    fail_states: &[&str],
) -> AlicloudResult<Option<(Json, String)>> {
    let result = describe_vpc(client, id).await;
    refresh_result(result, "Status", fail_states, "VPC", id)
}

pub async fn describe_vswitch(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let request = request_of(client, &[("VSwitchId", id)]);
    let response = describe_call(
        client,
        Product::Vpc,
        "DescribeVSwitchAttributes",
        &request,
        "VSwitch",
        id,
        &["InvalidVSwitchId.NotFound", "InvalidVswitchID.NotFound"],
    )
    .await?;

    match response.get("VSwitchId").and_then(Json::as_str) {
        Some(found) if found == id => Ok(response),
        _ => Err(AlicloudError::not_found("VSwitch", id)),
    }
}

pub async fn vswitch_state_refresh(
    client: &RpcClient,
    id: &str,
    fail_states: &[&str],
) -> AlicloudResult<Option<(Json, String)>> {
    let result = describe_vswitch(client, id).await;
    refresh_result(result, "Status", fail_states, "VSwitch", id)
}

/// All tags attached to a VPC-product resource
pub async fn list_tag_resources(
    client: &RpcClient,
    id: &str,
    resource_type: &str,
) -> AlicloudResult<HashMap<String, Value>> {
    let tags = paginate_tokens(|token| async move {
        let mut request = request_of(client, &[("ResourceType", resource_type), ("ResourceId.1", id)]);
        if let Some(token) = token {
            request.insert("NextToken".to_string(), Json::String(token));
        }
        let response = client
            .request_with_retry(Product::Vpc, "ListTagResources", &request, DESCRIBE_TIMEOUT, &["Throttling"])
            .await?;
        let items = jsonpath::list(&response, "$.TagResources.TagResource")?;
        Ok((items, jsonpath::string(&response, "NextToken")))
    })
    .await?;

    Ok(crate::convert::tags_from_list(&tags))
}

/// Apply tag differences with `TagResources` / `UnTagResources`
pub async fn set_resource_tags(
    client: &RpcClient,
    resource_type: &str,
    id: &str,
    old: Option<&HashMap<String, Value>>,
    new: Option<&HashMap<String, Value>>,
) -> AlicloudResult<()> {
    update_tags(client, Product::Vpc, "UnTagResources", resource_type, id, old, new).await
}
