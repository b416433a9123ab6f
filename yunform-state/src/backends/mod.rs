//! Backend implementations for state storage

mod local;

pub use local::LocalBackend;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};

/// Build the backend named by `config.backend_type`
pub fn create_backend(config: &BackendConfig) -> BackendResult<Box<dyn StateBackend>> {
    match config.backend_type.as_str() {
        "local" => Ok(Box::new(LocalBackend::from_config(config)?)),
        other => Err(BackendError::unsupported_backend(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unknown_backend_type_is_rejected() {
        let config = BackendConfig {
            backend_type: "oss".to_string(),
            attributes: HashMap::new(),
        };
        match create_backend(&config) {
            Err(BackendError::UnsupportedBackend(name)) => assert_eq!(name, "oss"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("oss backend should not exist"),
        }
    }

    #[test]
    fn local_is_the_default_backend() {
        assert!(create_backend(&BackendConfig::local()).is_ok());
    }
}
