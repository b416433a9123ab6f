//! Data Transmission Service lookups

use serde_json::Value as Json;

use super::{describe_call, refresh_result, request_of};
use crate::client::{Product, RpcClient};
use crate::error::{AlicloudError, AlicloudResult};
use crate::jsonpath;

/// Synchronization job detail, keyed by its DTS instance id
pub async fn describe_dts_synchronization_job(client: &RpcClient, id: &str) -> AlicloudResult<Json> {
    let request = request_of(
        client,
        &[("DtsInstanceID", id), ("SynchronizationDirection", "Forward")],
    );
    let response = describe_call(
        client,
        Product::Dts,
        "DescribeDtsJobDetail",
        &request,
        "DtsSynchronizationJob",
        id,
        &["Forbidden.InstanceNotFound"],
    )
    .await?;

    match jsonpath::string(&response, "DtsInstanceID") {
        Some(found) if found == id => Ok(response),
        _ => Err(AlicloudError::not_found("DtsSynchronizationJob", id)),
    }
}

pub async fn dts_synchronization_job_state_refresh(
    client: &RpcClient,
    id: &str,
    fail_states: &[&str],
) -> AlicloudResult<Option<(Json, String)>> {
    let result = describe_dts_synchronization_job(client, id).await;
    refresh_result(result, "Status", fail_states, "DtsSynchronizationJob", id)
}
