//! alicloud.cen_instances

use std::collections::HashMap;

use async_trait::async_trait;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{AlicloudDataSource, Listing, field, list_by_page};
use crate::client::{Product, Request, RpcClient};
use crate::convert::tags_request;
use crate::error::AlicloudResult;

const LISTING: Listing = Listing {
    list_key: "instances",
    id_field: "CenId",
    name_field: Some("Name"),
    status_field: Some("Status"),
};

pub struct CenInstances;

#[async_trait]
impl AlicloudDataSource for CenInstances {
    fn name(&self) -> &'static str {
        "cen_instances"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "Cloud Enterprise Network instances",
            vec![
                field("cen_id", AttributeType::String, "CenId"),
                field("cen_instance_name", AttributeType::String, "Name"),
                field("description", AttributeType::String, "Description"),
                field("protection_level", AttributeType::String, "ProtectionLevel"),
                field("cen_bandwidth_package_ids", types::string_list(), "CenBandwidthPackageIds"),
                field("status", AttributeType::String, "Status"),
                field("tags", types::tags(), "Tags"),
            ],
            vec![AttributeSchema::new("tags", types::tags())],
        )
    }

    async fn read(
        &self,
        client: &RpcClient,
        args: &HashMap<String, Value>,
    ) -> AlicloudResult<HashMap<String, Value>> {
        let mut request = Request::new();
        if let Some(tags) = args.get("tags").and_then(Value::as_map)
            && !tags.is_empty()
        {
            request.insert("Tag".to_string(), tags_request(tags));
        }

        let objects = list_by_page(client, Product::Cbn, "DescribeCens", &request, "$.Cens.Cen").await?;
        LISTING.finish(&self.schema(), args, objects)
    }
}
