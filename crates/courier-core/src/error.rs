use thiserror::Error;

use crate::domain::TaskType;

/// Errors from the store seam.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("store operation failed: {0}")]
    OperationFailed(String),
}

/// Errors from the queue seam.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue connection failed: {0}")]
    ConnectionFailed(String),

    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}

/// Errors from executor registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("executor already registered for task type {0}")]
    AlreadyRegistered(TaskType),
}

/// Field-level decode errors for stored task records.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has invalid value `{value}`")]
    InvalidValue { field: &'static str, value: String },
}

impl DecodeError {
    pub(crate) fn invalid(field: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            field,
            value: value.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}
