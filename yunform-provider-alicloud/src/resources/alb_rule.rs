//! alicloud.alb_rule - forwarding rule on an ALB listener

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Timeouts, types};

use super::{AlicloudResource, client_token, insert_dry_run, response_id};
use crate::client::{Product, RpcClient};
use crate::convert::request_from_attributes;
use crate::error::{AlicloudError, AlicloudResult, is_expected_errors};
use crate::resource_data::ResourceData;
use crate::service::alb::{alb_rule_state_refresh, describe_alb_rule};

const KIND: &str = "AlbRule";

const HOST_PATTERN: &str = r"^[a-z0-9\-\.\*\?]{3,128}$";
const PATH_PATTERN: &str = r"^/[A-Za-z0-9\$\-_\.\+/\&\~\@\:]{1,127}$";
const HEADER_KEY_PATTERN: &str = r"^[A-Za-z0-9_-]{1,40}$";

pub struct AlbRule;

fn string(name: &str, api: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String).with_provider_name(api)
}

/// Optional single nested block
fn single(name: &str, api: &str, fields: Vec<AttributeSchema>) -> AttributeSchema {
    AttributeSchema::new(name, types::blocks(fields))
        .with_provider_name(api)
        .with_max_items(1)
}

fn values_list() -> AttributeSchema {
    AttributeSchema::new("values", types::string_list()).with_provider_name("Values")
}

fn key_value_pairs() -> AttributeSchema {
    AttributeSchema::new(
        "values",
        types::blocks(vec![
            AttributeSchema::new("key", types::string_len_between(1, 100)).with_provider_name("Key"),
            AttributeSchema::new("value", types::string_len_between(1, 128)).with_provider_name("Value"),
        ]),
    )
    .with_provider_name("Values")
}

fn rule_actions() -> AttributeSchema {
    let redirect_path = types::string_match(PATH_PATTERN, "path must start with / and be 2 to 128 characters");
    let host = || types::string_match(HOST_PATTERN, "host must be 3 to 128 lowercase letters, digits, or - . * ?");

    let fields = vec![
        AttributeSchema::new("order", types::int_between(1, 50000))
            .required()
            .with_provider_name("Order"),
        AttributeSchema::new(
            "type",
            types::one_of(&[
                "ForwardGroup",
                "Redirect",
                "FixedResponse",
                "Rewrite",
                "InsertHeader",
                "TrafficLimit",
                "TrafficMirror",
            ]),
        )
        .required()
        .with_provider_name("Type"),
        single(
            "fixed_response_config",
            "FixedResponseConfig",
            vec![
                AttributeSchema::new("content", types::string_len_between(0, 1024))
                    .required()
                    .with_provider_name("Content"),
                AttributeSchema::new(
                    "content_type",
                    types::one_of(&[
                        "text/plain",
                        "text/css",
                        "text/html",
                        "application/javascript",
                        "application/json",
                    ]),
                )
                .with_provider_name("ContentType"),
                AttributeSchema::new(
                    "http_code",
                    types::string_match(r"^[2-5][0-9]{2}$", "http_code must be 2xx, 4xx or 5xx"),
                )
                .with_provider_name("HttpCode"),
            ],
        ),
        single(
            "forward_group_config",
            "ForwardGroupConfig",
            vec![
                AttributeSchema::new(
                    "server_group_tuples",
                    types::blocks(vec![string("server_group_id", "ServerGroupId")]),
                )
                .with_provider_name("ServerGroupTuples"),
            ],
        ),
        single(
            "insert_header_config",
            "InsertHeaderConfig",
            vec![
                AttributeSchema::new(
                    "key",
                    types::string_match(HEADER_KEY_PATTERN, "header key must be 1 to 40 letters, digits, _ or -"),
                )
                .with_provider_name("Key"),
                string("value", "Value"),
                AttributeSchema::new(
                    "value_type",
                    types::one_of(&["UserDefined", "ReferenceHeader", "SystemDefined"]),
                )
                .with_provider_name("ValueType"),
            ],
        ),
        single(
            "redirect_config",
            "RedirectConfig",
            vec![
                AttributeSchema::new("host", host()).with_provider_name("Host"),
                AttributeSchema::new("http_code", types::one_of(&["301", "302", "303", "307", "308"]))
                    .with_provider_name("HttpCode"),
                AttributeSchema::new("path", redirect_path.clone()).with_provider_name("Path"),
                AttributeSchema::new("port", types::int_between(1, 63335)).with_provider_name("Port"),
                AttributeSchema::new("protocol", types::one_of(&["HTTP", "HTTPS"])).with_provider_name("Protocol"),
                AttributeSchema::new("query", types::string_len_between(1, 128)).with_provider_name("Query"),
            ],
        ),
        single(
            "rewrite_config",
            "RewriteConfig",
            vec![
                AttributeSchema::new("host", host()).with_provider_name("Host"),
                AttributeSchema::new("path", redirect_path).with_provider_name("Path"),
                AttributeSchema::new("query", types::string_len_between(1, 128)).with_provider_name("Query"),
            ],
        ),
    ];

    AttributeSchema::new("rule_actions", types::blocks(fields))
        .required()
        .with_provider_name("RuleActions")
        .with_items(1, 20)
}

fn rule_conditions() -> AttributeSchema {
    let fields = vec![
        AttributeSchema::new(
            "type",
            types::one_of(&["Host", "Path", "Header", "QueryString", "Method", "Cookie", "SourceIp"]),
        )
        .required()
        .with_provider_name("Type"),
        single("cookie_config", "CookieConfig", vec![key_value_pairs()]),
        single(
            "header_config",
            "HeaderConfig",
            vec![
                AttributeSchema::new(
                    "key",
                    types::string_match(HEADER_KEY_PATTERN, "header key must be 1 to 40 letters, digits, _ or -"),
                )
                .with_provider_name("Key"),
                values_list(),
            ],
        ),
        single("host_config", "HostConfig", vec![values_list()]),
        single("method_config", "MethodConfig", vec![values_list()]),
        single("path_config", "PathConfig", vec![values_list()]),
        single("query_string_config", "QueryStringConfig", vec![key_value_pairs()]),
        single("source_ip_config", "SourceIpConfig", vec![values_list()]),
    ];

    AttributeSchema::new("rule_conditions", types::blocks(fields))
        .required()
        .with_provider_name("RuleConditions")
        .with_items(1, 10)
}

#[async_trait]
impl AlicloudResource for AlbRule {
    fn name(&self) -> &'static str {
        "alb_rule"
    }

    fn schema(&self) -> ResourceSchema {
        let two_minutes = Duration::from_secs(120);
        ResourceSchema::new(self.name())
            .with_description("Forwarding rule of an Application Load Balancer listener")
            .attribute(string("listener_id", "ListenerId").required().force_new())
            .attribute(
                AttributeSchema::new("priority", types::int_between(1, 10000))
                    .required()
                    .with_provider_name("Priority"),
            )
            .attribute(
                AttributeSchema::new(
                    "rule_name",
                    types::string_match(
                        r"^[A-Za-z\p{Han}][A-Za-z0-9\p{Han}._-]{1,127}$",
                        "rule_name must be 2 to 128 characters and start with a letter",
                    ),
                )
                .required()
                .with_provider_name("RuleName"),
            )
            .attribute(rule_actions())
            .attribute(rule_conditions())
            .attribute(AttributeSchema::new("dry_run", AttributeType::Bool))
            .attribute(string("status", "RuleStatus").computed())
            .with_timeouts(two_minutes, two_minutes, two_minutes)
    }

    async fn describe(&self, client: &RpcClient, id: &str) -> AlicloudResult<Json> {
        describe_alb_rule(client, id).await
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
            &["listener_id", "priority", "rule_name", "rule_actions", "rule_conditions"],
        );
        insert_dry_run(&mut request, data);
        request.insert("ClientToken".to_string(), client_token());

        let response = client
            .request_with_retry(
                Product::Alb,
                "CreateRule",
                &request,
                timeouts.create,
                &["IdempotenceProcessing", "IncorrectStatus.Listener", "SystemBusy", "Throttling"],
            )
            .await?;
        let id = response_id(&response, "RuleId", "CreateRule")?;
        log::info!("created ALB rule {}", id);

        client
            .state_change(&[], &["Available"], timeouts.create)
            .wait_for_state(|| alb_rule_state_refresh(client, &id, &["CreateFailed"]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, &id, e))?;
        Ok(id)
    }

    async fn update(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let changed: Vec<&str> = ["priority", "rule_name", "rule_actions", "rule_conditions"]
            .into_iter()
            .filter(|name| data.has_change(name))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        let mut request = request_from_attributes(&self.schema(), data.attributes(), &changed);
        request.insert("RuleId".to_string(), Json::String(id.to_string()));
        insert_dry_run(&mut request, data);
        request.insert("ClientToken".to_string(), client_token());

        client
            .request_with_retry(Product::Alb, "UpdateRuleAttribute", &request, timeouts.update, &[])
            .await?;

        client
            .state_change(&[], &["Available"], timeouts.update)
            .wait_for_state(|| alb_rule_state_refresh(client, id, &["CreateFailed"]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        Ok(())
    }

    async fn delete(
        &self,
        client: &RpcClient,
        id: &str,
        data: &ResourceData<'_>,
        timeouts: &Timeouts,
    ) -> AlicloudResult<()> {
        let mut request = crate::client::Request::new();
        request.insert("RuleId".to_string(), Json::String(id.to_string()));
        insert_dry_run(&mut request, data);
        request.insert("ClientToken".to_string(), client_token());

        match client
            .request_with_retry(
                Product::Alb,
                "DeleteRule",
                &request,
                timeouts.delete,
                &["IdempotenceProcessing", "IncorrectStatus.Rule", "SystemBusy", "Throttling"],
            )
            .await
        {
            Err(e) if is_expected_errors(&e, &["ResourceNotFound.Rule"]) => return Ok(()),
            other => other?,
        };

        client
            .state_change(&[], &[], timeouts.delete)
            .wait_for_state(|| alb_rule_state_refresh(client, id, &[]))
            .await
            .map_err(|e| AlicloudError::from_wait(KIND, id, e))?;
        Ok(())
    }
}
