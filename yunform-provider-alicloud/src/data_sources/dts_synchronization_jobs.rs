//! alicloud.dts_synchronization_jobs

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{AlicloudDataSource, Listing, field, list_by_page};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;

const LISTING: Listing = Listing {
    list_key: "jobs",
    id_field: "DtsInstanceID",
    name_field: Some("DtsJobName"),
    status_field: Some("Status"),
};

pub struct DtsSynchronizationJobs;

fn endpoint() -> AttributeType {
    AttributeType::Struct(vec![
        field("instance_type", AttributeType::String, "InstanceType"),
        field("engine_name", AttributeType::String, "EngineName"),
        field("region", AttributeType::String, "Region"),
        field("instance_id", AttributeType::String, "InstanceID"),
        field("ip", AttributeType::String, "Ip"),
        field("port", AttributeType::String, "Port"),
        field("database_name", AttributeType::String, "DatabaseName"),
        field("user_name", AttributeType::String, "UserName"),
    ])
}

#[async_trait]
impl AlicloudDataSource for DtsSynchronizationJobs {
    fn name(&self) -> &'static str {
        "dts_synchronization_jobs"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "DTS data synchronization jobs",
            vec![
                field("dts_instance_id", AttributeType::String, "DtsInstanceID"),
                field("dts_job_id", AttributeType::String, "DtsJobId"),
                field("dts_job_name", AttributeType::String, "DtsJobName"),
                field("checkpoint", AttributeType::String, "Checkpoint"),
                field("db_list", AttributeType::String, "DbObject"),
                field("expire_time", AttributeType::String, "ExpireTime"),
                field("pay_type", AttributeType::String, "PayType"),
                field("status", AttributeType::String, "Status"),
                field("source_endpoint", endpoint(), "SourceEndpoint"),
                field("destination_endpoint", endpoint(), "DestinationEndpoint"),
            ],
            Vec::<AttributeSchema>::new(),
        )
    }

    async fn read(
        &self,
        client: &RpcClient,
        args: &HashMap<String, Value>,
    ) -> AlicloudResult<HashMap<String, Value>> {
        let mut request = Request::new();
        request.insert("JobType".to_string(), Json::String("SYNC".to_string()));

        let objects =
            list_by_page(client, Product::Dts, "DescribeDtsJobs", &request, "$.DtsJobList").await?;
        LISTING.finish(&self.schema(), args, objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_flatten_to_nested_maps() {
        let objects = vec![json!({
            "DtsInstanceID": "dtsi-1",
            "DtsJobName": "orders",
            "Status": "Synchronizing",
            "SourceEndpoint": {"EngineName": "MySQL", "Port": "3306", "Password": "ignored"}
        })];
        let result = LISTING
            .finish(&DtsSynchronizationJobs.schema(), &HashMap::new(), objects)
            .unwrap();
        let jobs = result["jobs"].as_list().unwrap();
        let source = jobs[0].as_map().unwrap()["source_endpoint"].as_map().unwrap();
        assert_eq!(source["engine_name"], Value::String("MySQL".to_string()));
        assert!(!source.contains_key("password"));
    }
}
