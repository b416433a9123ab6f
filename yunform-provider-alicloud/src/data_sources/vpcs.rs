//! alicloud.vpcs

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{AlicloudDataSource, Listing, field, list_by_page, scalar_arg};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;
use crate::jsonpath;

const LISTING: Listing = Listing {
    list_key: "vpcs",
    id_field: "VpcId",
    name_field: Some("VpcName"),
    status_field: Some("Status"),
};

pub struct Vpcs;

#[async_trait]
impl AlicloudDataSource for Vpcs {
    fn name(&self) -> &'static str {
        "vpcs"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "Virtual private clouds in the region",
            vec![
                field("vpc_id", AttributeType::String, "VpcId"),
                field("vpc_name", AttributeType::String, "VpcName"),
                field("cidr_block", AttributeType::String, "CidrBlock"),
                field("ipv6_cidr_block", AttributeType::String, "Ipv6CidrBlock"),
                field("description", AttributeType::String, "Description"),
                field("is_default", AttributeType::Bool, "IsDefault"),
                field("router_id", AttributeType::String, "VRouterId"),
                field("vswitch_ids", types::string_list(), "VSwitchIds"),
                field("resource_group_id", AttributeType::String, "ResourceGroupId"),
                field("creation_time", AttributeType::String, "CreationTime"),
                field("status", AttributeType::String, "Status"),
                field("tags", types::tags(), "Tags"),
            ],
            vec![
                AttributeSchema::new("cidr_block", AttributeType::String),
                AttributeSchema::new("is_default", AttributeType::Bool),
                AttributeSchema::new("vpc_name", AttributeType::String),
                AttributeSchema::new("resource_group_id", AttributeType::String),
            ],
        )
    }

    async fn read(
        &self,
        client: &RpcClient,
        args: &HashMap<String, Value>,
    ) -> AlicloudResult<HashMap<String, Value>> {
        let mut request = Request::new();
        for (arg, key) in [
            ("is_default", "IsDefault"),
            ("vpc_name", "VpcName"),
            ("resource_group_id", "ResourceGroupId"),
        ] {
            if let Some(value) = scalar_arg(args, arg) {
                request.insert(key.to_string(), value);
            }
        }

        let mut objects =
            list_by_page(client, Product::Vpc, "DescribeVpcs", &request, "$.Vpcs.Vpc").await?;
        // The API has no CIDR filter
        if let Some(cidr) = args.get("cidr_block").and_then(Value::as_str) {
            objects.retain(|vpc| jsonpath::string(vpc, "CidrBlock").as_deref() == Some(cidr));
        }
        LISTING.finish(&self.schema(), args, objects)
    }
}
