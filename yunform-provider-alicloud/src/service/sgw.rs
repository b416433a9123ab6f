//! Cloud Storage Gateway lookups

use serde_json::Value as Json;

use super::{describe_call, request_of};
use crate::client::{Product, RpcClient};
use crate::error::{AlicloudError, AlicloudResult};
use crate::jsonpath;

/// `DescribeStorageBundle`; a `Success: false` body surfaces as an API error
pub async fn describe_storage_bundle(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let request = request_of(client, &[("StorageBundleId", id)]);
    let response = describe_call(
        client,
        Product::Sgw,
        "DescribeStorageBundle",
        &request,
        "StorageBundle",
        id,
        &["StorageBundleNotExist"],
    )
    .await?;

    match jsonpath::string(&response, "StorageBundleId") {
        Some(found) if found == id => Ok(response),
        _ => Err(AlicloudError::not_found("StorageBundle", id)),
    }
}
