//! Database File System snapshot lookups

use serde_json::Value as Json;

use super::{describe_call, first_with_id, refresh_result, request_of};
use crate::client::{Product, RpcClient};
use crate::error::AlicloudResult;

pub async fn describe_dbfs_snapshot(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let request = request_of(
        client,
        &[("FilterKey", "SnapshotId"), ("FilterValue", id), ("PageNumber", "1"), ("PageSize", "100")],
    );
    let response = describe_call(client, Product::Dbfs, "ListSnapshot", &request, "DBFS Snapshot", id, &[]).await?;
    first_with_id(&response, "$.Snapshots", "SnapshotId", "DBFS Snapshot", id)
}

pub async fn dbfs_snapshot_state_refresh(
    client: &RpcClient,
    id: &str,
    fail_states: &[&str],
) -> AlicloudResult<Option<(Json, String)>> {
    let result = describe_dbfs_snapshot(client, id).await;
    refresh_result(result, "Status", fail_states, "DBFS Snapshot", id)
}
