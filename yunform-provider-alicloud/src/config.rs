//! Provider configuration
//!
//! Values come from the `provider alicloud { ... }` block, falling back to
//! environment variables.

use std::collections::HashMap;
use std::time::Duration;

use yunform_core::resource::Value;

use crate::error::{AlicloudError, AlicloudResult};

const DEFAULT_CLIENT_TIMEOUT_MS: u64 = 30000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

#[derive(Clone)]
pub struct AlicloudConfig {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub security_token: Option<String>,
    pub protocol: Protocol,
    /// Endpoint overrides keyed by product code (`vpc`, `alb`, ...)
    pub endpoints: HashMap<String, String>,
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    /// Upper bound for retrying a single API call
    pub max_retry_timeout: Option<Duration>,
    pub source_ip: Option<String>,
}

// Credentials stay out of debug output
impl std::fmt::Debug for AlicloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlicloudConfig")
            .field("region", &self.region)
            .field("protocol", &self.protocol)
            .field("endpoints", &self.endpoints)
            .field("read_timeout", &self.read_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl AlicloudConfig {
    pub fn new(
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            security_token: None,
            protocol: Protocol::Https,
            endpoints: HashMap::new(),
            read_timeout: Duration::from_millis(DEFAULT_CLIENT_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CLIENT_TIMEOUT_MS),
            max_retry_timeout: None,
            source_ip: None,
        }
    }

    pub fn with_endpoint(mut self, product: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.endpoints.insert(product.into(), endpoint.into());
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Build from provider block attributes and the process environment
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> AlicloudResult<Self> {
        Self::from_attributes_with_env(attributes, |key| std::env::var(key).ok())
    }

    pub fn from_attributes_with_env(
        attributes: &HashMap<String, Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> AlicloudResult<Self> {
        let lookup = |attr: &str, vars: &[&str]| -> Option<String> {
            attributes
                .get(attr)
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| vars.iter().find_map(|v| env(*v)))
                .filter(|s| !s.is_empty())
        };

        let access_key = lookup("access_key", &["ALICLOUD_ACCESS_KEY"]).ok_or_else(|| {
            AlicloudError::Config(
                "access_key is required (set it or ALICLOUD_ACCESS_KEY)".to_string(),
            )
        })?;
        let secret_key = lookup("secret_key", &["ALICLOUD_SECRET_KEY"]).ok_or_else(|| {
            AlicloudError::Config(
                "secret_key is required (set it or ALICLOUD_SECRET_KEY)".to_string(),
            )
        })?;
        let region = lookup("region", &["ALICLOUD_REGION"]).ok_or_else(|| {
            AlicloudError::Config("region is required (set it or ALICLOUD_REGION)".to_string())
        })?;

        let mut config = Self::new(region, access_key, secret_key);
        config.security_token = lookup(
            "security_token",
            &["ALICLOUD_SECURITY_TOKEN", "SECURITY_TOKEN"],
        );
        config.source_ip = lookup("source_ip", &[]);

        if let Some(protocol) = lookup("protocol", &[]) {
            config.protocol = match protocol.to_ascii_uppercase().as_str() {
                "HTTP" => Protocol::Http,
                "HTTPS" => Protocol::Https,
                other => {
                    return Err(AlicloudError::Config(format!(
                        "protocol must be HTTP or HTTPS, got {}",
                        other
                    )));
                }
            };
        }

        config.read_timeout = millis(attributes, &env, "client_read_timeout", "CLIENT_READ_TIMEOUT")?
            .unwrap_or(config.read_timeout);
        config.connect_timeout =
            millis(attributes, &env, "client_connect_timeout", "CLIENT_CONNECT_TIMEOUT")?
                .unwrap_or(config.connect_timeout);

        if let Some(value) = attributes.get("max_retry_timeout") {
            let secs = value.as_int().filter(|s| *s > 0).ok_or_else(|| {
                AlicloudError::Config("max_retry_timeout must be a positive number of seconds".to_string())
            })?;
            config.max_retry_timeout = Some(Duration::from_secs(secs as u64));
        }

        match attributes.get("endpoints") {
            None => {}
            Some(Value::Map(map)) => {
                for (product, endpoint) in map {
                    let endpoint = endpoint.as_str().ok_or_else(|| {
                        AlicloudError::Config(format!("endpoint for {} must be a string", product))
                    })?;
                    config.endpoints.insert(product.to_lowercase(), endpoint.to_string());
                }
            }
            Some(_) => {
                return Err(AlicloudError::Config(
                    "endpoints must be a map of product to host".to_string(),
                ));
            }
        }

        Ok(config)
    }
}

fn millis(
    attributes: &HashMap<String, Value>,
    env: &impl Fn(&str) -> Option<String>,
    attr: &str,
    var: &str,
) -> AlicloudResult<Option<Duration>> {
    if let Some(value) = attributes.get(attr) {
        return match value.as_int() {
            Some(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms as u64))),
            _ => Err(AlicloudError::Config(format!(
                "{} must be a positive number of milliseconds",
                attr
            ))),
        };
    }
    match env(var) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| AlicloudError::Config(format!("{} must be milliseconds, got {}", var, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn block_values_win_over_environment() {
        let attrs = HashMap::from([
            ("region".to_string(), s("cn-shanghai")),
            ("access_key".to_string(), s("block-key")),
        ]);
        let env = env_of(&[
            ("ALICLOUD_ACCESS_KEY", "env-key"),
            ("ALICLOUD_SECRET_KEY", "env-secret"),
            ("ALICLOUD_REGION", "cn-hangzhou"),
        ]);

        let config = AlicloudConfig::from_attributes_with_env(&attrs, env).unwrap();
        assert_eq!(config.region, "cn-shanghai");
        assert_eq!(config.access_key, "block-key");
        assert_eq!(config.secret_key, "env-secret");
        assert_eq!(config.protocol, Protocol::Https);
        assert_eq!(config.read_timeout, Duration::from_millis(30000));
    }

    #[test]
    fn security_token_falls_back_to_legacy_variable() {
        let env = env_of(&[
            ("ALICLOUD_ACCESS_KEY", "k"),
            ("ALICLOUD_SECRET_KEY", "s"),
            ("ALICLOUD_REGION", "cn-hangzhou"),
            ("SECURITY_TOKEN", "sts-token"),
            ("CLIENT_READ_TIMEOUT", "45000"),
        ]);
        let config = AlicloudConfig::from_attributes_with_env(&HashMap::new(), env).unwrap();
        assert_eq!(config.security_token.as_deref(), Some("sts-token"));
        assert_eq!(config.read_timeout, Duration::from_millis(45000));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let env = env_of(&[("ALICLOUD_REGION", "cn-hangzhou")]);
        let err = AlicloudConfig::from_attributes_with_env(&HashMap::new(), env).unwrap_err();
        assert!(err.to_string().contains("access_key"));
    }

    #[test]
    fn endpoints_and_protocol() {
        let attrs = HashMap::from([
            ("protocol".to_string(), s("http")),
            (
                "endpoints".to_string(),
                Value::Map(HashMap::from([("VPC".to_string(), s("127.0.0.1:8080"))])),
            ),
        ]);
        let env = env_of(&[
            ("ALICLOUD_ACCESS_KEY", "k"),
            ("ALICLOUD_SECRET_KEY", "s"),
            ("ALICLOUD_REGION", "cn-hangzhou"),
        ]);
        let config = AlicloudConfig::from_attributes_with_env(&attrs, env).unwrap();
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.endpoints.get("vpc").map(String::as_str), Some("127.0.0.1:8080"));
    }

    #[test]
    fn debug_hides_secrets() {
        let config = AlicloudConfig::new("cn-hangzhou", "AKID", "very-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("AKID"));
    }
}
