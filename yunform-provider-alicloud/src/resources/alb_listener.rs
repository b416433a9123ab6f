//! alicloud.alb_listener

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::{AlicloudResource, client_token, insert_dry_run, response_id};
use crate::client::{Product, Request, RpcClient};
use crate::convert::request_from_attributes;
use crate::error::{AlicloudError, AlicloudResult, is_expected_errors};
use crate::resource_data::ResourceData;
use crate::service::alb::{alb_listener_state_refresh, describe_alb_listener};

const KIND: &str = "AlbListener";

const RETRY_CODES: &[&str] = &[
    "IdempotenceProcessing",
    "IncorrectBusinessStatus.LoadBalancer",
    "SystemBusy",
    "Throttling",
];

/// Attributes changed through `UpdateListenerAttribute`
const MUTABLE: &[&str] = &[
    "certificates",
    "default_actions",
    "gzip_enabled",
    "http2_enabled",
    "idle_timeout",
    "listener_description",
    "request_timeout",
    "security_policy_id",
    "x_forwarded_for_config",
];

pub struct AlbListener;

fn toggle(name: &str, api: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Bool)
        .optional_computed()
        .with_provider_name(api)
}

#[async_trait]
impl AlicloudResource for AlbListener {
    fn name(&self) -> &'static str {
        "alb_listener"
    }

    fn schema(&self) -> ResourceSchema {
        let two_minutes = Duration::from_secs(120);
        let default_action = types::blocks(vec![
            AttributeSchema::new("type", types::one_of(&["ForwardGroup"]))
                .required()
                .with_provider_name("Type"),
            AttributeSchema::new(
                "forward_group_config",
                types::blocks(vec![
                    AttributeSchema::new(
                        "server_group_tuples",
                        types::blocks(vec![
                            AttributeSchema::new("server_group_id", AttributeType::String)
                                .required()
                                .with_provider_name("ServerGroupId"),
                        ]),
                    )
                    .required()
                    .with_provider_name("ServerGroupTuples"),
                ]),
            )
            .required()
            .with_provider_name("ForwardGroupConfig")
            .with_max_items(1),
        ]);

        ResourceSchema::new(self.name())
            .with_description("Listener of an Application Load Balancer")
            .attribute(
                AttributeSchema::new("load_balancer_id", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("LoadBalancerId"),
            )
            .attribute(
                AttributeSchema::new("listener_port", types::int_between(1, 65535))
                    .required()
                    .force_new()
                    .with_provider_name("ListenerPort"),
            )
            .attribute(
                AttributeSchema::new("listener_protocol", types::one_of(&["HTTP", "HTTPS", "QUIC"]))
                    .required()
                    .force_new()
                    .with_provider_name("ListenerProtocol"),
            )
            .attribute(
                AttributeSchema::new(
                    "listener_description",
                    types::string_match(
                        r"^([^\x00-\xff]|[\w.,;/@-]){2,256}$",
                        "listener_description must be 2 to 256 characters",
                    ),
                )
                .with_provider_name("ListenerDescription"),
            )
            .attribute(
                AttributeSchema::new("idle_timeout", types::int_between(1, 60))
                    .optional_computed()
                    .with_provider_name("IdleTimeout"),
            )
            .attribute(
                AttributeSchema::new("request_timeout", types::int_between(1, 180))
                    .optional_computed()
                    .with_provider_name("RequestTimeout"),
            )
            .attribute(toggle("gzip_enabled", "GzipEnabled"))
            .attribute(toggle("http2_enabled", "Http2Enabled"))
            .attribute(
                AttributeSchema::new("security_policy_id", AttributeType::String)
                    .optional_computed()
                    .with_provider_name("SecurityPolicyId"),
            )
            .attribute(
                AttributeSchema::new(
                    "certificates",
                    types::blocks(vec![
                        AttributeSchema::new("certificate_id", AttributeType::String)
                            .with_provider_name("CertificateId"),
                    ]),
                )
                .with_provider_name("Certificates"),
            )
            .attribute(
                AttributeSchema::new("default_actions", default_action)
                    .required()
                    .with_provider_name("DefaultActions"),
            )
            .attribute(
                AttributeSchema::new(
                    "x_forwarded_for_config",
                    types::blocks(vec![
                        toggle("x_forwarded_for_enabled", "XForwardedForEnabled"),
                        toggle("x_forwarded_for_proto_enabled", "XForwardedForProtoEnabled"),
                        toggle("x_forwarded_for_slb_id_enabled", "XForwardedForSLBIdEnabled"),
                        toggle("x_forwarded_for_slb_port_enabled", "XForwardedForSLBPortEnabled"),
                        toggle(
                            "x_forwarded_for_client_src_port_enabled",
                            "XForwardedForClientSrcPortEnabled",
                        ),
                    ]),
                )
                .with_provider_name("XForwardedForConfig")
                .with_max_items(1),
            )
            .attribute(
                AttributeSchema::new("status", types::one_of(&["Running", "Stopped"]))
                    .optional_computed()
                    .with_provider_name("ListenerStatus"),
            )
            .attribute(AttributeSchema::new("dry_run", AttributeType::Bool))
            .with_timeouts(two_minutes, two_minutes, two_minutes)
    }

    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json> {
        describe_alb_listener(client, id).await
    }

    async fn create(
        &self,
        client: &RpcClient,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<String> {
        let mut names = vec!["load_balancer_id", "listener_port", "listener_protocol"];
        names.extend_from_slice(MUTABLE);
        let mut request = request_from_attributes(&self.schema(), data.attributes(), &names);
        insert_dry_run(&mut request, data);
        request.insert("ClientToken".to_string(), client_token());

        let response = client
            .request_with_retry(Product::Alb, "CreateListener", &request, timeouts.create, RETRY_CODES)
            .await?;
        let id = response_id(&response, "ListenerId", "CreateListener")?;
        log::info!("created ALB listener {}", id);

        wait_for_status(client, &id, "Running", timeouts.create).await?;

        if data.get_str("status") == Some("Stopped") {
            set_status(client, &id, data, "Stopped", timeouts.create).await?;
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
        let changed: Vec<&str> = MUTABLE
            .iter()
            .copied()
            .filter(|name| data.has_change(name))
            .collect();

        if !changed.is_empty() {
            let mut request = request_from_attributes(&self.schema(), data.attributes(), &changed);
            request.insert("ListenerId".to_string(), Json::String(id.to_string()));
            insert_dry_run(&mut request, data);
            request.insert("ClientToken".to_string(), client_token());

            client
                .request_with_retry(
                    Product::Alb,
                    "UpdateListenerAttribute",
                    &request,
                    timeouts.update,
                    RETRY_CODES,
                )
                .await?;

            client
                .state_change(&[], &["Running", "Stopped"], timeouts.update)
                .wait_for_state(|| alb_listener_state_refresh(client, id, &[]))
                .await
                .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        }

        if data.has_change("status")
            && let Some(status) = data.get_str("status")
        {
            set_status(client, id, data, status, timeouts.update).await?;
        }
        Ok(())
    }

    async fn delete(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let mut request = Request::new();
        request.insert("ListenerId".to_string(), Json::String(id.to_string()));
        insert_dry_run(&mut request, data);
        request.insert("ClientToken".to_string(), client_token());

        let mut codes = RETRY_CODES.to_vec();
        codes.push("-22031");
        match client
            .request_with_retry(Product::Alb, "DeleteListener", &request, timeouts.delete, &codes)
            .await
        {
            Err(e) if is_expected_errors(&e, &["ResourceNotFound.Listener", "ResourceNotFound.LoadBalancer"]) => {
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }
}

async fn wait_for_status(client: &RpcClient, id: &str, status: &str, timeout: Duration) -> AlicloudResult<()> {
    client
        .state_change(&[], &[status], timeout)
        .wait_for_state(|| alb_listener_state_refresh(client, id, &[]))
        .await
        .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
    Ok(())
}

/// `StartListener` or `StopListener`, then wait for the new status
async fn set_status(
    client: &RpcClient,
    id: &str,
    data: &ResourceData<'_>,
    status: &str,
    timeout: Duration,
) -> AlicloudResult<()> {
    let action = match status {
        "Running" => "StartListener",
        "Stopped" => "StopListener",
        other => {
            return Err(AlicloudError::InvalidArgument(format!(
                "status must be Running or Stopped, got {}",
                other
            )));
        }
    };

    let mut request = Request::new();
    request.insert("ListenerId".to_string(), Json::String(id.to_string()));
    insert_dry_run(&mut request, data);
    request.insert("ClientToken".to_string(), client_token());
    client
        .request_with_retry(Product::Alb, action, &request, timeout, RETRY_CODES)
        .await?;

    wait_for_status(client, id, status, timeout).await
}
