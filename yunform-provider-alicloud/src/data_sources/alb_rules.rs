//! alicloud.alb_rules

use std::collections::HashMap;

use async_trait::async_trait;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{AlicloudDataSource, Listing, field, list_arg, list_by_token};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;

const LISTING: Listing = Listing {
    list_key: "rules",
    id_field: "RuleId",
    name_field: Some("RuleName"),
    status_field: Some("RuleStatus"),
};

pub struct AlbRules;

#[async_trait]
impl AlicloudDataSource for AlbRules {
    fn name(&self) -> &'static str {
        "alb_rules"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "Forwarding rules of ALB listeners",
            vec![
                field("rule_id", AttributeType::String, "RuleId"),
                field("rule_name", AttributeType::String, "RuleName"),
                field("listener_id", AttributeType::String, "ListenerId"),
                field("load_balancer_id", AttributeType::String, "LoadBalancerId"),
                field("priority", AttributeType::Int, "Priority"),
                field("status", AttributeType::String, "RuleStatus"),
            ],
            vec![
                AttributeSchema::new("listener_ids", types::string_list()),
                AttributeSchema::new("load_balancer_ids", types::string_list()),
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
            ("listener_ids", "ListenerIds"),
            ("load_balancer_ids", "LoadBalancerIds"),
            ("ids", "RuleIds"),
        ] {
            if let Some(values) = list_arg(args, arg) {
                request.insert(key.to_string(), values);
            }
        }

        let objects = list_by_token(client, Product::Alb, "ListRules", &request, "$.Rules").await?;
        LISTING.finish(&self.schema(), args, objects)
    }
}
