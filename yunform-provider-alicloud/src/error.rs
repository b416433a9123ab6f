//! Error classification for Alibaba Cloud API calls

use yunform_core::provider::ProviderError;
use yunform_core::resource::ResourceId;
use yunform_core::wait::WaitError;

#[derive(Debug, thiserror::Error)]
pub enum AlicloudError {
    #[error("{action} failed ({status}): {code}: {message} (RequestId: {request_id})")]
    Api {
        action: String,
        code: String,
        message: String,
        request_id: String,
        status: u16,
    },

    #[error("{action} request failed: {source}")]
    Http {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode {action} response: {message}")]
    Decode { action: String, message: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    #[error("{kind} {id} is in unexpected status {status}")]
    UnexpectedStatus {
        kind: String,
        id: String,
        status: String,
    },

    #[error("timeout waiting for {what}: {message}")]
    WaitTimeout { what: String, message: String },

    #[error("invalid provider configuration: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to write {path}: {source}")]
    OutputFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AlicloudError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        AlicloudError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn decode(action: impl Into<String>, message: impl Into<String>) -> Self {
        AlicloudError::Decode {
            action: action.into(),
            message: message.into(),
        }
    }

    /// API error code, if this error came from the service
    pub fn code(&self) -> Option<&str> {
        match self {
            AlicloudError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Flatten a failed status wait on `kind` `id`
    pub fn from_wait(kind: &str, id: &str, err: WaitError<AlicloudError>) -> Self {
        match err {
            WaitError::Refresh(e) => e,
            WaitError::UnexpectedState { state, .. } => AlicloudError::UnexpectedStatus {
                kind: kind.to_string(),
                id: id.to_string(),
                status: state,
            },
            WaitError::NotFound { .. } => AlicloudError::not_found(kind, id),
            timeout @ WaitError::Timeout { .. } => AlicloudError::WaitTimeout {
                what: format!("{} {}", kind, id),
                message: timeout.to_string(),
            },
        }
    }

    /// Convert into the error type used at the provider boundary
    pub fn into_provider_error(self, id: &ResourceId, operation: &str) -> ProviderError {
        let not_found = not_found_error(&self);
        ProviderError::new(format!("{} failed", operation))
            .for_resource(id.clone())
            .with_not_found(not_found)
            .with_cause(self)
    }
}

pub type AlicloudResult<T> = Result<T, AlicloudError>;

const RETRYABLE_CODES: &[&str] = &[
    "Throttling",
    "Throttling.User",
    "Throttling.Api",
    "ServiceUnavailable",
    "SystemBusy",
    "InternalError",
    "UnknownError",
    "ServiceBusy",
    "IncorrectStatus",
    "OperationConflict",
    "LastTokenProcessing",
    "IdempotenceProcessing",
];

/// Transient failures that are worth another attempt
pub fn need_retry(err: &AlicloudError) -> bool {
    match err {
        AlicloudError::Api { code, status, .. } => {
            *status >= 500 || RETRYABLE_CODES.contains(&code.as_str()) || code.starts_with("Throttling.")
        }
        AlicloudError::Http { source, .. } => source.is_timeout() || source.is_connect(),
        _ => false,
    }
}

/// True if the error's code is one of `codes`, or its message mentions one
pub fn is_expected_errors(err: &AlicloudError, codes: &[&str]) -> bool {
    match err {
        AlicloudError::Api { code, message, .. } => codes
            .iter()
            .any(|c| code.as_str() == *c || message.contains(c)),
        _ => false,
    }
}

pub fn not_found_error(err: &AlicloudError) -> bool {
    match err {
        AlicloudError::NotFound { .. } => true,
        AlicloudError::Api { code, .. } => {
            code.ends_with("NotFound") || code.starts_with("ResourceNotFound")
        }
        _ => false,
    }
}

#[cfg(test)]
pub(crate) fn api_error(code: &str, status: u16) -> AlicloudError {
    AlicloudError::Api {
        action: "Test".to_string(),
        code: code.to_string(),
        message: format!("{} occurred", code),
        request_id: "req-1".to_string(),
        status,
    }
}
