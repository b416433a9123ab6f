//! alicloud.vpc

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::{AlicloudResource, client_token, insert_dry_run, response_id};
use crate::client::{Product, RpcClient};
use crate::convert::{attributes_from_response, request_from_attributes};
use crate::error::{AlicloudError, AlicloudResult, is_expected_errors, not_found_error};
use crate::jsonpath;
use crate::resource_data::ResourceData;
use crate::service::request_of;
use crate::service::vpc::{describe_vpc, set_resource_tags, vpc_state_refresh};

const KIND: &str = "VPC";

const NOT_FOUND_CODES: &[&str] = &["InvalidVpcID.NotFound", "Forbidden.VpcNotFound"];

pub struct Vpc;

fn name_type() -> AttributeType {
    types::string_len_between(2, 128)
}

#[async_trait]
impl AlicloudResource for Vpc {
    fn name(&self) -> &'static str {
        "vpc"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Virtual Private Cloud")
            .attribute(
                AttributeSchema::new("cidr_block", types::cidr())
                    .optional_computed()
                    .force_new()
                    .with_provider_name("CidrBlock"),
            )
            .attribute(AttributeSchema::new("vpc_name", name_type()).with_provider_name("VpcName"))
            .attribute(
                AttributeSchema::new("description", types::string_len_between(2, 256))
                    .with_provider_name("Description"),
            )
            .attribute(
                AttributeSchema::new("resource_group_id", AttributeType::String)
                    .optional_computed()
                    .with_provider_name("ResourceGroupId"),
            )
            .attribute(
                AttributeSchema::new("enable_ipv6", AttributeType::Bool)
                    .force_new()
                    .with_provider_name("EnableIpv6"),
            )
            .attribute(
                AttributeSchema::new("ipv6_cidr_block", AttributeType::String)
                    .computed()
                    .with_provider_name("Ipv6CidrBlock"),
            )
            .attribute(
                AttributeSchema::new("router_id", AttributeType::String)
                    .computed()
                    .with_provider_name("VRouterId"),
            )
            .attribute(AttributeSchema::new("route_table_id", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("user_cidrs", types::string_list())
                    .optional_computed()
                    .force_new()
                    .with_provider_name("UserCidrs"),
            )
            .attribute(AttributeSchema::new("tags", types::tags()).with_provider_name("Tags"))
            .attribute(AttributeSchema::new("dry_run", AttributeType::Bool).force_new())
            .attribute(
                AttributeSchema::new("status", AttributeType::String)
                    .computed()
                    .with_provider_name("Status"),
            )
            .with_timeouts(
                Duration::from_secs(600),
                Duration::from_secs(600),
                Duration::from_secs(600),
            )
    }

    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json> {
        describe_vpc(client, id).await
    }

    async fn read(&self, client: &RpcClient, id: &str) -> AlicloudResult<Option<HashMap<String, Value>>> {
        let object = match describe_vpc(client, id).await {
            Ok(object) => object,
            Err(e) if not_found_error(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut attributes = attributes_from_response(&self.schema(), &object);
        if let Some(route_table) = jsonpath::string(&object, "$.RouterTableIds.RouterTableIds[0]") {
            attributes.insert("route_table_id".to_string(), Value::String(route_table));
        }
        Ok(Some(attributes))
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
            &["cidr_block", "vpc_name", "description", "resource_group_id", "enable_ipv6"],
        );
        request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
        let user_cidrs = data.get_strings("user_cidrs");
        if !user_cidrs.is_empty() {
            request.insert("UserCidr".to_string(), Json::String(user_cidrs.join(",")));
        }
        request.insert("ClientToken".to_string(), client_token());
        insert_dry_run(&mut request, data);

        let response = client
            .request_with_retry(
                Product::Vpc,
                "CreateVpc",
                &request,
                timeouts.create,
                &["TaskConflict", "UnknownError", "Throttling"],
            )
            .await?;
        let id = response_id(&response, "VpcId", "CreateVpc")?;
        log::info!("created VPC {}", id);

        client
            .state_change(&["Pending"], &["Available"], timeouts.create)
            .wait_for_state(|| vpc_state_refresh(client, &id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, &id, e))?;

        if let Some(tags) = data.get_map("tags") {
            set_resource_tags(client, "VPC", &id, None, Some(tags)).await?;
        }
        Ok(id)
    }

    async fn update(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        if data.has_change("tags") {
            let previous = data.previous("tags").and_then(Value::as_map);
            set_resource_tags(client, "VPC", id, previous, data.get_map("tags")).await?;
        }

        let changed: Vec<&str> = ["vpc_name", "description"]
            .into_iter()
            .filter(|name| data.has_change(name))
            .collect();
        if !changed.is_empty() {
            let mut request = request_from_attributes(&self.schema(), data.attributes(), &changed);
            request.insert("VpcId".to_string(), Json::String(id.to_string()));
            request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
            client
                .request_with_retry(Product::Vpc, "ModifyVpcAttribute", &request, timeouts.update, &[])
                .await?;
        }

        if data.has_change("resource_group_id")
            && let Some(group) = data.get_str("resource_group_id")
        {
            let request = request_of(
                client,
                &[("ResourceId", id), ("ResourceType", "vpc"), ("NewResourceGroupId", group)],
            );
            client
                .request_with_retry(Product::Vpc, "MoveResourceGroup", &request, timeouts.update, &[])
                .await?;
        }
        Ok(())
    }

    async fn delete(
        &self,
        client: &RpcClient,
        id: &str,
        _data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let request = request_of(client, &[("VpcId", id)]);
        match client
            .request_with_retry(
                Product::Vpc,
                "DeleteVpc",
                &request,
                timeouts.delete,
                &[
                    "DependencyViolation.Instance",
                    "DependencyViolation.RouteEntry",
                    "DependencyViolation.VSwitch",
                    "DependencyViolation.SecurityGroup",
                ],
            )
            .await
        {
            Err(e) if is_expected_errors(&e, NOT_FOUND_CODES) => return Ok(()),
            other => other?,
        };

        client
            .state_change(&[], &[], timeouts.delete)
            .wait_for_state(|| vpc_state_refresh(client, id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        Ok(())
    }
}
