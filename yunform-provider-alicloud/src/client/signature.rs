//! RPC signature version 1.0 (HMAC-SHA1)

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{AlicloudError, AlicloudResult};

type HmacSha1 = Hmac<Sha1>;

/// RFC3986 encoding as the RPC gateway expects it
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value)
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Sorted `key=value` pairs joined by `&`, both sides encoded
pub fn canonicalized_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn string_to_sign(method: &str, params: &BTreeMap<String, String>) -> String {
    format!(
        "{}&{}&{}",
        method,
        percent_encode("/"),
        percent_encode(&canonicalized_query(params))
    )
}

pub fn sign(string_to_sign: &str, secret: &str) -> AlicloudResult<String> {
    let mut mac = HmacSha1::new_from_slice(format!("{}&", secret).as_bytes())
        .map_err(|e| AlicloudError::InvalidArgument(format!("signing key: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
