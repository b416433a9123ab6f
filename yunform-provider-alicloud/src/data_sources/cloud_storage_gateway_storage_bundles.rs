//! alicloud.cloud_storage_gateway_storage_bundles

use std::collections::HashMap;

use async_trait::async_trait;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{AlicloudDataSource, Listing, field, list_by_page, scalar_arg};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;

const LISTING: Listing = Listing {
    list_key: "bundles",
    id_field: "StorageBundleId",
    name_field: Some("Name"),
    status_field: None,
};

pub struct StorageBundles;

#[async_trait]
impl AlicloudDataSource for StorageBundles {
    fn name(&self) -> &'static str {
        "cloud_storage_gateway_storage_bundles"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "Cloud Storage Gateway storage bundles",
            vec![
                field("storage_bundle_id", AttributeType::String, "StorageBundleId"),
                field("storage_bundle_name", AttributeType::String, "Name"),
                field("description", AttributeType::String, "Description"),
                field("location", AttributeType::String, "Location"),
                field("create_time", AttributeType::Int, "CreatedTime"),
            ],
            vec![AttributeSchema::new("backend_bucket_region_id", AttributeType::String).required()],
        )
    }

    async fn read(
        &self,
        client: &RpcClient,
        args: &HashMap<String, Value>,
    ) -> AlicloudResult<HashMap<String, Value>> {
        let mut request = Request::new();
        if let Some(region) = scalar_arg(args, "backend_bucket_region_id") {
            request.insert("BackendBucketRegionId".to_string(), region);
        }

        let objects = list_by_page(
            client,
            Product::Sgw,
            "DescribeStorageBundles",
            &request,
            "$.StorageBundles.StorageBundle",
        )
        .await?;
        LISTING.finish(&self.schema(), args, objects)
    }
}
