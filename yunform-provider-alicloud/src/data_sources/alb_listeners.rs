//! alicloud.alb_listeners

use std::collections::HashMap;

use async_trait::async_trait;
use yunform_core::resource::Value;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{AlicloudDataSource, Listing, field, list_arg, list_by_token, scalar_arg};
use crate::client::{Product, Request, RpcClient};
use crate::error::AlicloudResult;

// Listeners have no name; `name_regex` is not offered
const LISTING: Listing = Listing {
    list_key: "listeners",
    id_field: "ListenerId",
    name_field: None,
    status_field: Some("ListenerStatus"),
};

pub struct AlbListeners;

#[async_trait]
impl AlicloudDataSource for AlbListeners {
    fn name(&self) -> &'static str {
        "alb_listeners"
    }

    fn schema(&self) -> ResourceSchema {
        LISTING.schema(
            self.name(),
            "Listeners of application load balancers",
            vec![
                field("listener_id", AttributeType::String, "ListenerId"),
                field("listener_description", AttributeType::String, "ListenerDescription"),
                field("listener_port", AttributeType::Int, "ListenerPort"),
                field("listener_protocol", AttributeType::String, "ListenerProtocol"),
                field("load_balancer_id", AttributeType::String, "LoadBalancerId"),
                field("idle_timeout", AttributeType::Int, "IdleTimeout"),
                field("request_timeout", AttributeType::Int, "RequestTimeout"),
                field("gzip_enabled", AttributeType::Bool, "GzipEnabled"),
                field("http2_enabled", AttributeType::Bool, "Http2Enabled"),
                field("status", AttributeType::String, "ListenerStatus"),
            ],
            vec![
                AttributeSchema::new("listener_protocol", types::one_of(&["HTTP", "HTTPS", "QUIC"])),
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
        if let Some(protocol) = scalar_arg(args, "listener_protocol") {
            request.insert("ListenerProtocol".to_string(), protocol);
        }
        for (arg, key) in [("load_balancer_ids", "LoadBalancerIds"), ("ids", "ListenerIds")] {
            if let Some(values) = list_arg(args, arg) {
                request.insert(key.to_string(), values);
            }
        }

        let objects =
            list_by_token(client, Product::Alb, "ListListeners", &request, "$.Listeners").await?;
        LISTING.finish(&self.schema(), args, objects)
    }
}
