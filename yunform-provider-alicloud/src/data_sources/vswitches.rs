//! alicloud.vswitches

use std::collections::HashMap;

use async_trait::async_trait;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{AlicloudDataSource, Listing, field, list_by_page, scalar_arg};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;
use crate::jsonpath;

const LISTING: Listing = Listing {
    list_key: "vswitches",
    id_field: "VSwitchId",
    name_field: Some("VSwitchName"),
    status_field: Some("Status"),
};

pub struct VSwitches;

#[async_trait]
impl AlicloudDataSource for VSwitches {
    fn name(&self) -> &'static str {
        "vswitches"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "VSwitches in the region",
            vec![
                field("vswitch_id", AttributeType::String, "VSwitchId"),
                field("vswitch_name", AttributeType::String, "VSwitchName"),
                field("vpc_id", AttributeType::String, "VpcId"),
                field("zone_id", AttributeType::String, "ZoneId"),
                field("cidr_block", AttributeType::String, "CidrBlock"),
                field("description", AttributeType::String, "Description"),
                field("is_default", AttributeType::Bool, "IsDefault"),
                field("available_ip_address_count", AttributeType::Int, "AvailableIpAddressCount"),
                field("creation_time", AttributeType::String, "CreationTime"),
                field("status", AttributeType::String, "Status"),
            ],
            vec![
                AttributeSchema::new("vpc_id", AttributeType::String),
                AttributeSchema::new("zone_id", AttributeType::String),
                AttributeSchema::new("cidr_block", AttributeType::String),
                AttributeSchema::new("is_default", AttributeType::Bool),
            ],
        )
    }

    async fn read(
        &self,
        client: &RpcClient,
        args: &HashMap<String, Value>,
    ) -> AlicloudResult<HashMap<String, Value>> {
        let mut request = Request::new();
        for (arg, key) in [("vpc_id", "VpcId"), ("zone_id", "ZoneId"), ("is_default", "IsDefault")] {
            if let Some(value) = scalar_arg(args, arg) {
                request.insert(key.to_string(), value);
            }
        }

        let mut objects = list_by_page(
            client,
            Product::Vpc,
            "DescribeVSwitches",
            &request,
            "$.VSwitches.VSwitch",
        )
        .await?;
        if let Some(cidr) = args.get("cidr_block").and_then(Value::as_str) {
            objects.retain(|vsw| jsonpath::string(vsw, "CidrBlock").as_deref() == Some(cidr));
        }
        LISTING.finish(&self.schema(), args, objects)
    }
}
