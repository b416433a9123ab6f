//! Application Load Balancer lookups

use serde_json::Value as Json;

use super::{describe_call, first_with_id, refresh_result, request_of};
use crate::client::{Product, RpcClient};
use crate::error::{AlicloudError, AlicloudResult};

pub async fn describe_alb_rule(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let request = request_of(client, &[("RuleIds.1", id), ("MaxResults", "100")]);
    let response = describe_call(client, Product::Alb, "ListRules", &request, "AlbRule", id, &[]).await?;
    first_with_id(&response, "$.Rules", "RuleId", "AlbRule", id)
}

pub async fn alb_rule_state_refresh(
    client: &RpcClient,
    id: &str,
    fail_states: &[&str],
) -> AlicloudResult<Option<(Json, String)>> {
    let result = describe_alb_rule(client, id).await;
    refresh_result(result, "RuleStatus", fail_states, "AlbRule", id)
}

pub async fn describe_alb_listener(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let request = request_of(client, &[("ListenerId", id)]);
    let response = describe_call(
        client,
        Product::Alb,
        "GetListenerAttribute",
        &request,
        "AlbListener",
        id,
        &["ResourceNotFound.Listener"],
    )
    .await?;

    match response.get("ListenerId").and_then(Json::as_str) {
        Some(found) if found == id => Ok(response),
        _ => Err(AlicloudError::not_found("AlbListener", id)),
    }
}

pub async fn alb_listener_state_refresh(
    client: &RpcClient,
    id: &str,
    fail_states: &[&str],
) -> AlicloudResult<Option<(Json, String)>> {
    let result = describe_alb_listener(client, id).await;
    refresh_result(result, "ListenerStatus", fail_states, "AlbListener", id)
}
