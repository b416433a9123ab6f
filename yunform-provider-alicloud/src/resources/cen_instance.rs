//! alicloud.cen_instance

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::{AlicloudResource, client_token, response_id};
use crate::client::{Product, Request, RpcClient};
use crate::convert::request_from_attributes;
use crate::error::{AlicloudError, AlicloudResult, is_expected_errors};
use crate::resource_data::ResourceData;
use crate::service::cbn::{cen_instance_state_refresh, describe_cen_instance, set_resource_tags};

const KIND: &str = "CEN";

pub struct CenInstance;

#[async_trait]
impl AlicloudResource for CenInstance {
    fn name(&self) -> &'static str {
        "cen_instance"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Cloud Enterprise Network instance")
            .attribute(
                AttributeSchema::new("cen_instance_name", types::string_len_between(2, 128))
                    .with_provider_name("Name"),
            )
            .attribute(
                AttributeSchema::new("description", types::string_len_between(2, 256))
                    .with_provider_name("Description"),
            )
            .attribute(
                AttributeSchema::new("protection_level", types::one_of(&["REDUCED"]))
                    .optional_computed()
                    .with_provider_name("ProtectionLevel"),
            )
            .attribute(AttributeSchema::new("tags", types::tags()).with_provider_name("Tags"))
            .attribute(
                AttributeSchema::new("status", AttributeType::String)
                    .computed()
                    .with_provider_name("Status"),
            )
            .with_timeouts(
                Duration::from_secs(360),
                Duration::from_secs(360),
                Duration::from_secs(600),
            )
    }

    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json> {
        describe_cen_instance(client, id).await
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
            &["cen_instance_name", "description", "protection_level"],
        );
        request.insert("ClientToken".to_string(), client_token());

        let response = client
            .request_with_retry(Product::Cbn, "CreateCen", &request, timeouts.create, &["Operation.Blocking"])
            .await?;
        let id = response_id(&response, "CenId", "CreateCen")?;
        log::info!("created CEN instance {}", id);

        client
            .state_change(&["Creating"], &["Active"], timeouts.create)
            .wait_for_state(|| cen_instance_state_refresh(client, &id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, &id, e))?;

        if let Some(tags) = data.get_map("tags") {
            set_resource_tags(client, &id, None, Some(tags)).await?;
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
            set_resource_tags(client, id, previous, data.get_map("tags")).await?;
        }

        let names = ["cen_instance_name", "description", "protection_level"];
        if !data.has_changes(&names) {
            return Ok(());
        }

        // ModifyCenAttribute replaces all three fields at once
        let mut request = request_from_attributes(&self.schema(), data.attributes(), &names);
        request.insert("CenId".to_string(), Json::String(id.to_string()));
        client
            .request_with_retry(Product::Cbn, "ModifyCenAttribute", &request, timeouts.update, &["Operation.Blocking"])
            .await?;

        client
            .state_change(&["Updating"], &["Active"], timeouts.update)
            .wait_for_state(|| cen_instance_state_refresh(client, id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        Ok(())
    }

    async fn delete(
        &self,
        client: &RpcClient,
        id: &str,
        _data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let mut request = Request::new();
        request.insert("CenId".to_string(), Json::String(id.to_string()));
        match client
            .request_with_retry(
                Product::Cbn,
                "DeleteCen",
                &request,
                timeouts.delete,
                &["InvalidOperation.CenInstanceStatus", "Operation.Blocking"],
            )
            .await
        {
            Err(e) if is_expected_errors(&e, &["ParameterCenInstanceId"]) => return Ok(()),
            other => other?,
        };

        client
            .state_change(&[], &[], timeouts.delete)
            .wait_for_state(|| cen_instance_state_refresh(client, id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn protection_level_only_accepts_reduced() {
        let schema = CenInstance.schema();
        let ok = HashMap::from([("protection_level".to_string(), Value::String("REDUCED".to_string()))]);
        assert!(schema.validate(&ok).is_ok());

        let bad = HashMap::from([("protection_level".to_string(), Value::String("FULL".to_string()))]);
        assert!(schema.validate(&bad).is_err());
    }

    #[test]
    fn name_maps_to_api_name_field() {
        let attrs = HashMap::from([("cen_instance_name".to_string(), Value::String("core".to_string()))]);
        let request = request_from_attributes(&CenInstance.schema(), &attrs, &["cen_instance_name"]);
        assert_eq!(request.get("Name"), Some(&Json::String("core".to_string())));
    }
}
