//! RPC client for Alibaba Cloud product APIs
//!
//! Every product speaks the same RPC protocol: a signed, form-encoded POST
//! whose `Action` parameter names the operation.

pub mod params;
pub mod signature;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value as Json;
use yunform_core::retry::{Backoff, RetryError, RetryOutcomeError, retry};
use yunform_core::wait::StateChangeConf;

use crate::config::AlicloudConfig;
use crate::error::{AlicloudError, AlicloudResult, is_expected_errors, need_retry};

pub use params::Request;

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 512;

/// Products used by this provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Alb,
    Vpc,
    Cbn,
    Dbfs,
    Sgw,
    Dts,
}

impl Product {
    /// Endpoint code, also the key for endpoint overrides
    pub fn code(&self) -> &'static str {
        match self {
            Product::Alb => "alb",
            Product::Vpc => "vpc",
            Product::Cbn => "cbn",
            Product::Dbfs => "dbfs",
            Product::Sgw => "sgw",
            Product::Dts => "dts",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Product::Alb => "2020-06-16",
            Product::Vpc => "2016-04-28",
            Product::Cbn => "2017-09-12",
            Product::Dbfs => "2020-04-18",
            Product::Sgw => "2018-05-11",
            Product::Dts => "2020-01-01",
        }
    }

    fn default_endpoint(&self, region: &str) -> String {
        match self {
            // CEN is a global service
            Product::Cbn => "cbn.aliyuncs.com".to_string(),
            _ => format!("{}.{}.aliyuncs.com", self.code(), region),
        }
    }
}

/// Timing of status polling after asynchronous operations
#[derive(Debug, Clone, Copy)]
pub struct WaitSettings {
    pub delay: Duration,
    pub poll_interval: Duration,
    /// Consecutive not-found polls before a deleted object counts as gone
    pub gone_checks: u32,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(3),
            gone_checks: 3,
        }
    }
}

pub struct RpcClient {
    config: AlicloudConfig,
    http: Client,
    backoff: Backoff,
    wait: WaitSettings,
}

impl RpcClient {
    pub fn new(config: AlicloudConfig) -> AlicloudResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("yunform/", env!("CARGO_PKG_VERSION")))
            .timeout(config.read_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AlicloudError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            backoff: Backoff::default(),
            wait: WaitSettings::default(),
        })
    }

    /// Delay between retried API calls
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_wait_settings(mut self, wait: WaitSettings) -> Self {
        self.wait = wait;
        self
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    pub fn endpoint(&self, product: Product) -> String {
        let host = self
            .config
            .endpoints
            .get(product.code())
            .cloned()
            .unwrap_or_else(|| product.default_endpoint(&self.config.region));

        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/", host.trim_end_matches('/'))
        } else {
            format!("{}://{}/", self.config.protocol.scheme(), host)
        }
    }

    /// Status poller preconfigured with this client's timing
    pub fn state_change(&self, pending: &[&str], target: &[&str], timeout: Duration) -> StateChangeConf {
        let conf = StateChangeConf::new(pending, target, timeout)
            .with_delay(self.wait.delay)
            .with_poll_interval(self.wait.poll_interval);
        if target.is_empty() {
            conf.with_not_found_checks(self.wait.gone_checks)
        } else {
            conf
        }
    }

    fn signed_params(&self, product: Product, action: &str, request: &Request) -> AlicloudResult<BTreeMap<String, String>> {
        let mut params = params::flatten_request(request);

        let common = [
            ("Action", action.to_string()),
            ("Version", product.version().to_string()),
            ("Format", "JSON".to_string()),
            ("AccessKeyId", self.config.access_key.clone()),
            ("SignatureMethod", "HMAC-SHA1".to_string()),
            ("SignatureVersion", "1.0".to_string()),
            ("SignatureNonce", uuid::Uuid::new_v4().to_string()),
            (
                "Timestamp",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
        ];
        for (key, value) in common {
            params.insert(key.to_string(), value);
        }
        params
            .entry("RegionId".to_string())
            .or_insert_with(|| self.config.region.clone());
        if let Some(token) = &self.config.security_token {
            params.insert("SecurityToken".to_string(), token.clone());
        }

        let to_sign = signature::string_to_sign("POST", &params);
        let signature = signature::sign(&to_sign, &self.config.secret_key)?;
        params.insert("Signature".to_string(), signature);
        Ok(params)
    }

    /// Issue a single RPC call and decode the JSON response
    pub async fn do_request(&self, product: Product, action: &str, request: &Request) -> AlicloudResult<Json> {
        let url = self.endpoint(product);
        let params = self.signed_params(product, action, request)?;
        let body = signature::canonicalized_query(&params);

        log::debug!("POST {} Action={} Version={}", url, action, product.version());

        let mut builder = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        if let Some(source_ip) = &self.config.source_ip {
            builder = builder.header("x-acs-source-ip", source_ip);
        }

        let response = builder.send().await.map_err(|source| AlicloudError::Http {
            action: action.to_string(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| AlicloudError::Http {
            action: action.to_string(),
            source,
        })?;
        log::debug!("{} responded {}: {}", action, status, sanitize_for_log(&text));

        let json: Json = if text.trim().is_empty() {
            Json::Object(Default::default())
        } else {
            serde_json::from_str(&text).map_err(|e| AlicloudError::decode(action, e.to_string()))?
        };

        let success_flag = json.get("Success").and_then(Json::as_bool);
        if !status.is_success() || success_flag == Some(false) {
            let field = |name: &str| {
                json.get(name)
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let code = match field("Code") {
                c if c.is_empty() => status.as_u16().to_string(),
                c => c,
            };
            return Err(AlicloudError::Api {
                action: action.to_string(),
                code,
                message: field("Message"),
                request_id: field("RequestId"),
                status: status.as_u16(),
            });
        }

        Ok(json)
    }

    /// `do_request`, retried while the error is transient or one of `codes`
    pub async fn request_with_retry(
        &self,
        product: Product,
        action: &str,
        request: &Request,
        timeout: Duration,
        codes: &[&str],
    ) -> AlicloudResult<Json> {
        let timeout = match self.config.max_retry_timeout {
            Some(max) => timeout.min(max),
            None => timeout,
        };

        retry(timeout, self.backoff, move || async move {
            match self.do_request(product, action, request).await {
                Ok(json) => Ok(json),
                Err(e) if is_expected_errors(&e, codes) || need_retry(&e) => {
                    Err(RetryError::Retryable(e))
                }
                Err(e) => Err(RetryError::NonRetryable(e)),
            }
        })
        .await
        .map_err(RetryOutcomeError::into_inner)
    }
}

/// Truncate long responses and drop control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
    let mut out: String = truncated
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .collect();
    if truncated.len() < body.len() {
        out.push_str(&format!("... [truncated, {} bytes total]", body.len()));
    }
    out
}
