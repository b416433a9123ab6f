//! alicloud.vswitch

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::{AlicloudResource, client_token, response_id};
use crate::client::{Product, RpcClient};
use crate::convert::{attributes_from_response, request_from_attributes};
use crate::error::{AlicloudError, AlicloudResult, is_expected_errors, not_found_error};
use crate::resource_data::ResourceData;
use crate::service::request_of;
use crate::service::vpc::{describe_vswitch, list_tag_resources, set_resource_tags, vswitch_state_refresh};

const KIND: &str = "VSwitch";

pub struct VSwitch;

#[async_trait]
impl AlicloudResource for VSwitch {
    fn name(&self) -> &'static str {
        "vswitch"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Subnet of a VPC in one zone")
            .attribute(
                AttributeSchema::new("vpc_id", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("VpcId"),
            )
            .attribute(
                AttributeSchema::new("cidr_block", types::cidr())
                    .required()
                    .force_new()
                    .with_provider_name("CidrBlock"),
            )
            .attribute(
                AttributeSchema::new("zone_id", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("ZoneId"),
            )
            .attribute(
                AttributeSchema::new("vswitch_name", types::string_len_between(2, 128))
                    .with_provider_name("VSwitchName"),
            )
            .attribute(
                AttributeSchema::new("description", types::string_len_between(2, 256))
                    .with_provider_name("Description"),
            )
            .attribute(AttributeSchema::new("tags", types::tags()))
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
        describe_vswitch(client, id).await
    }

    /// Tags are not part of the attribute response
    async fn read(&self, client: &RpcClient, id: &str) -> AlicloudResult<Option<HashMap<String, Value>>> {
        let object = match describe_vswitch(client, id).await {
            Ok(object) => object,
            Err(e) if not_found_error(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut attributes = attributes_from_response(&self.schema(), &object);
        let tags = list_tag_resources(client, id, "VSWITCH").await?;
        attributes.insert("tags".to_string(), Value::Map(tags));
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
            &["vpc_id", "cidr_block", "zone_id", "vswitch_name", "description"],
        );
        request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
        request.insert("ClientToken".to_string(), client_token());

        let response = client
            .request_with_retry(
                Product::Vpc,
                "CreateVSwitch",
                &request,
                timeouts.create,
                &[
                    "TaskConflict",
                    "Throttling",
                    "OperationFailed.IdempotentTokenProcessing",
                    "InvalidStatus.RouteEntry",
                    "TokenProcessing",
                    "IncorrectVSwitchStatus",
                ],
            )
            .await?;
        let id = response_id(&response, "VSwitchId", "CreateVSwitch")?;
        log::info!("created VSwitch {}", id);

        client
            .state_change(&["Pending"], &["Available"], timeouts.create)
            .wait_for_state(|| vswitch_state_refresh(client, &id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, &id, e))?;

        if let Some(tags) = data.get_map("tags") {
            set_resource_tags(client, "VSWITCH", &id, None, Some(tags)).await?;
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
            set_resource_tags(client, "VSWITCH", id, previous, data.get_map("tags")).await?;
        }

        let changed: Vec<&str> = ["vswitch_name", "description"]
            .into_iter()
            .filter(|name| data.has_change(name))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        let mut request = request_from_attributes(&self.schema(), data.attributes(), &changed);
        request.insert("VSwitchId".to_string(), Json::String(id.to_string()));
        request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
        client
            .request_with_retry(Product::Vpc, "ModifyVSwitchAttribute", &request, timeouts.update, &[])
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
        let request = request_of(client, &[("VSwitchId", id)]);
        match client
            .request_with_retry(
                Product::Vpc,
                "DeleteVSwitch",
                &request,
                timeouts.delete,
                &[
                    "IncorrectVSwitchStatus",
                    "DependencyViolation",
                    "OperationConflict",
                    "IncorrectStatus",
                    "TaskConflict",
                ],
            )
            .await
        {
            Err(e) if is_expected_errors(&e, &["InvalidVSwitchId.NotFound", "InvalidVswitchID.NotFound"]) => {
                return Ok(());
            }
            other => other?,
        };

        client
            .state_change(&[], &[], timeouts.delete)
            .wait_for_state(|| vswitch_state_refresh(client, id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        Ok(())
    }
}
