use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Unavailable,
    Internal,
}

/// Error surface of the document-store boundary. `Unavailable` is the only
/// code the entry workflow treats specially: it marks connectivity as
/// degraded instead of reporting a hard failure.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Unavailable, message)
    }

    pub fn is_unavailable(&self) -> bool {
        self.code == StoreErrorCode::Unavailable
    }
}
