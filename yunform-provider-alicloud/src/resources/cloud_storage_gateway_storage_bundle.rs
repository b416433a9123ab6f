//! alicloud.cloud_storage_gateway_storage_bundle

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::{AlicloudResource, response_id};
use crate::client::{Product, RpcClient};
use crate::convert::request_from_attributes;
use crate::error::{AlicloudResult, is_expected_errors};
use crate::resource_data::ResourceData;
use crate::service::request_of;
use crate::service::sgw::describe_storage_bundle;

pub struct StorageBundle;

#[async_trait]
impl AlicloudResource for StorageBundle {
    fn name(&self) -> &'static str {
        "cloud_storage_gateway_storage_bundle"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Cloud Storage Gateway storage bundle")
            .attribute(
                AttributeSchema::new("storage_bundle_name", types::string_len_between(1, 60))
                    .required()
                    .with_provider_name("StorageBundleName"),
            )
            .attribute(
                AttributeSchema::new("description", types::string_len_between(0, 255))
                    .with_provider_name("Description"),
            )
            .attribute(
                AttributeSchema::new("location", AttributeType::String)
                    .computed()
                    .with_provider_name("Location"),
            )
    }

    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json> {
        describe_storage_bundle(client, id).await
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
            &["storage_bundle_name", "description"],
        );
        request.insert("Location".to_string(), Json::String(client.region().to_string()));
        request.insert("BackendBucketRegionId".to_string(), Json::String(client.region().to_string()));

        let response = client
            .request_with_retry(Product::Sgw, "CreateStorageBundle", &request, timeouts.create, &[])
            .await?;
        let id = response_id(&response, "StorageBundleId", "CreateStorageBundle")?;
        log::info!("created storage bundle {}", id);
        Ok(id)
    }

    async fn update(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        if !data.has_changes(&["storage_bundle_name", "description"]) {
            return Ok(());
        }

        // The name is mandatory on every update
        let mut request = request_from_attributes(
            &self.schema(),
            data.attributes(),
            &["storage_bundle_name", "description"],
        );
        request.insert("StorageBundleId".to_string(), Json::String(id.to_string()));
        client
            .request_with_retry(Product::Sgw, "UpdateStorageBundle", &request, timeouts.update, &[])
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        client: &RpcClient,
        id: &str,
        _data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let request = request_of(client, &[("StorageBundleId", id)]);
        match client
            .request_with_retry(Product::Sgw, "DeleteStorageBundle", &request, timeouts.delete, &[])
            .await
        {
            Err(e) if is_expected_errors(&e, &["StorageBundleNotExist"]) => Ok(()),
            other => other.map(|_| ()),
        }
    }
}
