//! alicloud.dts_synchronization_job
//!
//! The job is identified by its DTS instance id. Mutating calls after
//! creation address the job id, which is looked up from the job detail.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::AlicloudResource;
use crate::client::{Product, RpcClient};
use crate::convert::{attributes_from_response, json_to_attribute, request_from_attributes};
use crate::error::{AlicloudError, AlicloudResult, not_found_error};
use crate::jsonpath;
use crate::resource_data::ResourceData;
use crate::service::dts::{describe_dts_synchronization_job, dts_synchronization_job_state_refresh};
use crate::service::request_of;

const KIND: &str = "DtsSynchronizationJob";

const FAIL_STATES: &[&str] = &["Failed", "InitializeFailed", "SynchronizingFailed"];

/// Endpoint fields: (attribute suffix, request suffix, detail field)
const ENDPOINT_FIELDS: &[(&str, &str, &str)] = &[
    ("instance_type", "InstanceType", "InstanceType"),
    ("engine_name", "EngineName", "EngineName"),
    ("region", "Region", "Region"),
    ("instance_id", "InstanceID", "InstanceID"),
    ("ip", "IP", "Ip"),
    ("port", "Port", "Port"),
    ("database_name", "DatabaseName", "DatabaseName"),
    ("user_name", "UserName", "UserName"),
    ("password", "Password", "Password"),
];

/// Attribute prefix, request prefix, and detail object of each endpoint
const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("source_endpoint", "SourceEndpoint", "SourceEndpoint"),
    ("destination_endpoint", "DestinationEndpoint", "DestinationEndpoint"),
];

pub struct DtsSynchronizationJob;

fn endpoint_attributes(schema: ResourceSchema) -> ResourceSchema {
    let mut schema = schema;
    for (attr_prefix, api_prefix, _) in ENDPOINTS {
        for (suffix, api_suffix, _) in ENDPOINT_FIELDS {
            let name = format!("{}_{}", attr_prefix, suffix);
            let mut field = AttributeSchema::new(&name, AttributeType::String)
                .with_provider_name(format!("{}{}", api_prefix, api_suffix));
            field = match *suffix {
                "instance_type" => field.required().force_new(),
                "password" => field.sensitive(),
                "user_name" => field,
                _ => field.force_new(),
            };
            schema = schema.attribute(field);
        }
    }
    schema
}

#[async_trait]
impl AlicloudResource for DtsSynchronizationJob {
    fn name(&self) -> &'static str {
        "dts_synchronization_job"
    }

    fn schema(&self) -> ResourceSchema {
        let init_flag = |name: &str, api: &str| {
            AttributeSchema::new(name, AttributeType::Bool)
                .required()
                .force_new()
                .with_provider_name(api)
        };
        let schema = ResourceSchema::new(self.name())
            .with_description("DTS data synchronization job")
            .attribute(
                AttributeSchema::new("dts_instance_id", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("DtsInstanceId"),
            )
            .attribute(
                AttributeSchema::new("dts_job_name", AttributeType::String)
                    .required()
                    .with_provider_name("DtsJobName"),
            )
            .attribute(
                AttributeSchema::new(
                    "instance_class",
                    types::one_of(&["xxlarge", "xlarge", "large", "medium", "small"]),
                )
                .optional_computed()
                .with_provider_name("InstanceClass"),
            )
            .attribute(
                AttributeSchema::new("checkpoint", AttributeType::String)
                    .optional_computed()
                    .force_new()
                    .with_provider_name("Checkpoint"),
            )
            .attribute(
                AttributeSchema::new("db_list", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("DbList"),
            )
            .attribute(init_flag("structure_initialization", "StructureInitialization"))
            .attribute(init_flag("data_initialization", "DataInitialization"))
            .attribute(init_flag("data_synchronization", "DataSynchronization"))
            .attribute(
                AttributeSchema::new("synchronization_direction", types::one_of(&["Forward", "Reverse"]))
                    .optional_computed()
                    .force_new()
                    .with_provider_name("SynchronizationDirection"),
            )
            .attribute(
                AttributeSchema::new("status", types::one_of(&["Synchronizing", "Suspending"]))
                    .optional_computed()
                    .with_provider_name("Status"),
            )
            .with_timeouts(
                Duration::from_secs(600),
                Duration::from_secs(600),
                Duration::from_secs(300),
            );
        endpoint_attributes(schema)
    }

    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json> {
        describe_dts_synchronization_job(client, id).await
    }

    async fn read(&self, client: &RpcClient, id: &str) -> AlicloudResult<Option<HashMap<String, Value>>> {
        let object = match describe_dts_synchronization_job(client, id).await {
            Ok(object) => object,
            Err(e) if not_found_error(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(attributes_from_detail(&self.schema(), &object)))
    }

    async fn create(
        &self,
        client: &RpcClient,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<String> {
        let id = data
            .get_str("dts_instance_id")
            .ok_or_else(|| AlicloudError::InvalidArgument("dts_instance_id is required".to_string()))?
            .to_string();

        let schema = self.schema();
        let names: Vec<&str> = schema
            .attributes
            .keys()
            .map(String::as_str)
            .filter(|name| !matches!(*name, "status" | "instance_class"))
            .collect();
        let mut request = request_from_attributes(&schema, data.attributes(), &names);
        request.insert("RegionId".to_string(), Json::String(client.region().to_string()));
        request.insert("JobType".to_string(), Json::String("SYNC".to_string()));

        client
            .request_with_retry(Product::Dts, "ConfigureDtsJob", &request, timeouts.create, &[])
            .await?;
        log::info!("configured DTS synchronization job on {}", id);

        client
            .state_change(&[], &["Synchronizing"], timeouts.create)
            .wait_for_state(|| dts_synchronization_job_state_refresh(client, &id, FAIL_STATES))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, &id, e))?;

        if data.get_str("status") == Some("Suspending") {
            let job_id = job_id(client, &id).await?;
            set_status(client, &id, &job_id, "Suspending", timeouts.create).await?;
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
        let job_id = job_id(client, id).await?;

        if data.has_change("dts_job_name")
            && let Some(name) = data.get_str("dts_job_name")
        {
            let request = request_of(client, &[("DtsJobId", &job_id), ("DtsJobName", name)]);
            client
                .request_with_retry(Product::Dts, "ModifyDtsJobName", &request, timeouts.update, &[])
                .await?;
        }

        for (endpoint, prefix) in [("Src", "source_endpoint"), ("Dest", "destination_endpoint")] {
            let password_attr = format!("{}_password", prefix);
            let user_attr = format!("{}_user_name", prefix);
            if !data.has_changes(&[&password_attr, &user_attr]) {
                continue;
            }
            let mut request = request_of(client, &[("DtsJobId", &job_id), ("Endpoint", endpoint)]);
            for (attr, key) in [(&user_attr, "UserName"), (&password_attr, "Password")] {
                if let Some(value) = data.get_str(attr) {
                    request.insert(key.to_string(), Json::String(value.to_string()));
                }
            }
            client
                .request_with_retry(Product::Dts, "ModifyDtsJobPassword", &request, timeouts.update, &[])
                .await?;
        }

        if data.has_change("instance_class")
            && let Some(class) = data.get_str("instance_class")
        {
            let request = request_of(
                client,
                &[("DtsJobId", &job_id), ("InstanceClass", class), ("OrderType", "UPGRADE")],
            );
            client
                .request_with_retry(Product::Dts, "TransferInstanceClass", &request, timeouts.update, &[])
                .await?;
            client
                .state_change(&[], &["Synchronizing"], timeouts.update)
                .wait_for_state(|| dts_synchronization_job_state_refresh(client, id, FAIL_STATES))
                .await
                .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        }

        if data.has_change("status")
            && let Some(status) = data.get_str("status")
        {
            set_status(client, id, &job_id, status, timeouts.update).await?;
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
        let job_id = match job_id(client, id).await {
            Ok(job_id) => job_id,
            Err(e) if not_found_error(&e) => return Ok(()),
            Err(e) => return Err(e),
        };
        let request = request_of(client, &[("DtsJobId", &job_id), ("DtsInstanceId", id)]);
        client
            .request_with_retry(Product::Dts, "DeleteDtsJob", &request, timeouts.delete, &[])
            .await?;
        Ok(())
    }
}

/// Job id of the synchronization job running on instance `id`
async fn job_id(client: &RpcClient, id: &str) -> AlicloudResult<String> {
    let detail = describe_dts_synchronization_job(client, id).await?;
    jsonpath::string(&detail, "DtsJobId")
        .filter(|job| !job.is_empty())
        .ok_or_else(|| AlicloudError::decode("DescribeDtsJobDetail", "response has no DtsJobId"))
}

/// `SuspendDtsJob` or `StartDtsJob`, then wait for the new status
async fn set_status(
    client: &RpcClient,
    id: &str,
    job_id: &str,
    status: &str,
    timeout: Duration,
) -> AlicloudResult<()> {
    let action = match status {
        "Suspending" => "SuspendDtsJob",
        "Synchronizing" => "StartDtsJob",
        other => {
            return Err(AlicloudError::InvalidArgument(format!(
                "status must be Synchronizing or Suspending, got {}",
                other
            )));
        }
    };
    let request = request_of(client, &[("DtsJobId", job_id)]);
    client
        .request_with_retry(Product::Dts, action, &request, timeout, &[])
        .await?;

    client
        .state_change(&[], &[status], timeout)
        .wait_for_state(|| dts_synchronization_job_state_refresh(client, id, FAIL_STATES))
        .await
        .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
    Ok(())
}

/// Map the job detail, whose endpoints and migration flags are nested
fn attributes_from_detail(schema: &ResourceSchema, detail: &Json) -> HashMap<String, Value> {
    let mut attributes = attributes_from_response(schema, detail);

    let mut copy = |name: &str, path: &str, attr_type: &AttributeType| {
        if let Some(value) = jsonpath::lookup(detail, path).and_then(|json| json_to_attribute(attr_type, json)) {
            attributes.insert(name.to_string(), value);
        }
    };

    copy("dts_instance_id", "DtsInstanceID", &AttributeType::String);
    copy("db_list", "DbObject", &AttributeType::String);
    for (flag, api) in [
        ("structure_initialization", "StructureInitialization"),
        ("data_initialization", "DataInitialization"),
        ("data_synchronization", "DataSynchronization"),
    ] {
        copy(flag, &format!("MigrationMode.{}", api), &AttributeType::Bool);
    }
    for (attr_prefix, _, object) in ENDPOINTS {
        for (suffix, _, field) in ENDPOINT_FIELDS {
            if *suffix == "password" {
                continue;
            }
            copy(
                &format!("{}_{}", attr_prefix, suffix),
                &format!("{}.{}", object, field),
                &AttributeType::String,
            );
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_is_flattened_without_passwords() {
        let detail = json!({
            "DtsInstanceID": "dtsi-1",
            "DtsJobId": "job-1",
            "DtsJobName": "orders",
            "Status": "Synchronizing",
            "DbObject": "{\"orders\":{\"name\":\"orders\"}}",
            "MigrationMode": {
                "StructureInitialization": true,
                "DataInitialization": true,
                "DataSynchronization": true
            },
            "SourceEndpoint": {
                "InstanceType": "RDS",
                "EngineName": "MySQL",
                "InstanceID": "rm-1",
                "Port": 3306,
                "UserName": "repl"
            },
            "DestinationEndpoint": {"InstanceType": "RDS", "InstanceID": "rm-2"}
        });
        let schema = DtsSynchronizationJob.schema();
        let attrs = attributes_from_detail(&schema, &detail);

        assert_eq!(attrs.get("dts_instance_id"), Some(&Value::String("dtsi-1".to_string())));
        assert_eq!(attrs.get("dts_job_name"), Some(&Value::String("orders".to_string())));
        assert_eq!(attrs.get("data_synchronization"), Some(&Value::Bool(true)));
        assert_eq!(attrs.get("source_endpoint_port"), Some(&Value::String("3306".to_string())));
        assert_eq!(
            attrs.get("destination_endpoint_instance_id"),
            Some(&Value::String("rm-2".to_string()))
        );
        assert!(!attrs.contains_key("source_endpoint_password"));
    }

    #[test]
    fn endpoint_passwords_are_sensitive_and_mutable() {
        let schema = DtsSynchronizationJob.schema();
        let password = &schema.attributes["source_endpoint_password"];
        assert!(password.sensitive);
        assert!(!password.force_new);
        assert_eq!(password.api_name(), "SourceEndpointPassword");
        assert!(schema.attributes["destination_endpoint_ip"].force_new);
        assert_eq!(schema.attributes["destination_endpoint_ip"].api_name(), "DestinationEndpointIP");
    }
}
