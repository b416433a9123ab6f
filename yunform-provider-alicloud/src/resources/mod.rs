//! Managed resources
//!
//! Each resource maps the generic create/read/update/delete lifecycle onto
//! its product's RPC actions and waits for the asynchronous result.

pub mod alb_listener;
pub mod alb_rule;
pub mod cen_instance;
pub mod cloud_storage_gateway_storage_bundle;
pub mod dbfs_snapshot;
pub mod dts_synchronization_job;
pub mod vpc;
pub mod vswitch;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{ResourceSchema, Timeouts};

use crate::client::{Request, RpcClient};
use crate::convert::attributes_from_response;
use crate::error::{AlicloudResult, not_found_error};
use crate::resource_data::ResourceData;

#[async_trait]
pub trait AlicloudResource: Send + Sync {
    /// Type name without the provider prefix, e.g. `alb_rule`
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Fetch the raw API object
    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json>;

    /// Create the resource and return its id once it is usable
    async fn create(
        &self,
        client: &RpcClient,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<String>;

    /// Current attributes, or `None` if the resource no longer exists
    async fn read(&self, client: &RpcClient, id: &str) -> AlicloudResult<Option<HashMap<String, Value>>> {
        match self.describe(client, id).await {
            Ok(object) => Ok(Some(attributes_from_response(&self.schema(), &object))),
            Err(e) if not_found_error(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()>;

    async fn delete(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()>;
}

/// Every resource this provider manages
pub fn all() -> Vec<Box<dyn AlicloudResource>> {
    vec![
        Box::new(alb_rule::AlbRule),
        Box::new(alb_listener::AlbListener),
        Box::new(vpc::Vpc),
        Box::new(vswitch::VSwitch),
        Box::new(cen_instance::CenInstance),
        Box::new(dbfs_snapshot::DbfsSnapshot),
        Box::new(cloud_storage_gateway_storage_bundle::StorageBundle),
        Box::new(dts_synchronization_job::DtsSynchronizationJob),
    ]
}

/// Idempotency token for mutating calls
pub(crate) fn client_token() -> Json {
    Json::String(uuid::Uuid::new_v4().to_string())
}

/// Insert `DryRun` when the resource sets it
pub(crate) fn insert_dry_run(request: &mut Request, data: &ResourceData<'_>) {
    if let Some(dry_run) = data.get_bool("dry_run") {
        request.insert("DryRun".to_string(), Json::Bool(dry_run));
    }
}

/// String field of a create/update response
pub(crate) fn response_id(response: &Json, field: &str, action: &str) -> AlicloudResult<String> {
    crate::jsonpath::string(response, field)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| crate::error::AlicloudError::decode(action, format!("response has no {}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_names_are_unique_and_match_schemas() {
        let resources = all();
        let names: HashSet<&str> = resources.iter().map(|r| r.name()).collect();
        assert_eq!(names.len(), resources.len());
        for resource in &resources {
            let schema = resource.schema();
            assert_eq!(schema.resource_type, resource.name());
            assert!(!schema.data_source);
        }
    }

    #[test]
    fn response_id_requires_a_value() {
        let body = serde_json::json!({"RuleId": "rule-1", "Empty": ""});
        assert_eq!(response_id(&body, "RuleId", "CreateRule").unwrap(), "rule-1");
        assert!(response_id(&body, "Empty", "CreateRule").is_err());
        assert!(response_id(&body, "Missing", "CreateRule").is_err());
    }
}
