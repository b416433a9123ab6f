//! alicloud.dbfs_snapshot

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::{AlicloudResource, client_token, response_id};
use crate::client::{Product, RpcClient};
use crate::convert::request_from_attributes;
use crate::error::{AlicloudError, AlicloudResult};
use crate::resource_data::ResourceData;
use crate::service::dbfs::{dbfs_snapshot_state_refresh, describe_dbfs_snapshot};
use crate::service::request_of;

const KIND: &str = "DBFS Snapshot";

pub struct DbfsSnapshot;

#[async_trait]
impl AlicloudResource for DbfsSnapshot {
    fn name(&self) -> &'static str {
        "dbfs_snapshot"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Snapshot of a Database File System")
            .attribute(
                AttributeSchema::new("fs_id", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("SourceFsId"),
            )
            .attribute(
                AttributeSchema::new(
                    "snapshot_name",
                    types::string_match(
                        r"^[A-Za-z\p{Han}][A-Za-z0-9\p{Han}:_-]{1,127}$",
                        "snapshot_name must be 2 to 128 characters and start with a letter",
                    ),
                )
                .with_provider_name("SnapshotName"),
            )
            .attribute(
                AttributeSchema::new("description", types::string_len_between(2, 256))
                    .with_provider_name("Description"),
            )
            .attribute(
                AttributeSchema::new("retention_days", types::int_between(1, 65536))
                    .force_new()
                    .with_provider_name("RetentionDays"),
            )
            .attribute(AttributeSchema::new("force", AttributeType::Bool))
            .attribute(
                AttributeSchema::new("status", AttributeType::String)
                    .computed()
                    .with_provider_name("Status"),
            )
            .with_timeouts(
                Duration::from_secs(300),
                Duration::from_secs(120),
                Duration::from_secs(120),
            )
    }

    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json> {
        describe_dbfs_snapshot(client, id).await
    }

    async fn create(
        &self,
        client: &RpcClient,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<String> {
        let mut request = request_from_attributes(
            &self.schema(),
            data.attributes(),
            &["snapshot_name", "description", "retention_days"],
        );
        if let Some(fs_id) = data.get_str("fs_id") {
            request.insert("FsId".to_string(), Json::String(fs_id.to_string()));
        }
        request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
        request.insert("ClientToken".to_string(), client_token());

        let response = client
            .request_with_retry(Product::Dbfs, "CreateSnapshot", &request, timeouts.create, &[])
            .await?;
        let id = response_id(&response, "SnapshotId", "CreateSnapshot")?;
        log::info!("created DBFS snapshot {}", id);

        client
            .state_change(&[], &["accomplished"], timeouts.create)
            .wait_for_state(|| dbfs_snapshot_state_refresh(client, &id, &["failed"]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, &id, e))?;
        Ok(id)
    }

    async fn update(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let changed: Vec<&str> = ["snapshot_name", "description"]
            .into_iter()
            .filter(|name| data.has_change(name))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        let mut request = request_from_attributes(&self.schema(), data.attributes(), &changed);
        request.insert("SnapshotId".to_string(), Json::String(id.to_string()));
        request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
        client
            .request_with_retry(Product::Dbfs, "ModifySnapshotAttribute", &request, timeouts.update, &[])
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let mut request = request_of(client, &[("SnapshotId", id)]);
        if let Some(force) = data.get_bool("force") {
            request.insert("Force".to_string(), Json::Bool(force));
        }
        client
            .request_with_retry(Product::Dbfs, "DeleteSnapshot", &request, timeouts.delete, &[])
            .await?;

        client
            .state_change(&[], &[], timeouts.delete)
            .wait_for_state(|| dbfs_snapshot_state_refresh(client, id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        Ok(())
    }
}
