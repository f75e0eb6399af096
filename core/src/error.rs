//! Error types for HANDLERSYNC

use thiserror::Error;

use crate::types::{Field, ScopePath};

/// Main error type for HANDLERSYNC
#[derive(Error, Debug)]
pub enum SyncError {
    // ============ Store Errors ============
    #[error("store query failed: {0}")]
    StoreQueryFailed(String),

    #[error("store mutation failed: {0}")]
    StoreMutationFailed(String),

    #[error("ambiguous entry: more than one '{name}' within scope '{scope}'")]
    AmbiguousEntry { name: String, scope: ScopePath },

    // ============ Data Model Errors ============
    #[error("invalid access rights value: {0}")]
    InvalidAccessRights(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("field {0} cannot be cleared")]
    FieldNotClearable(Field),

    #[error("unknown field: {0}")]
    UnknownField(String),

    // ============ Tooling Errors ============
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationError(err.to_string())
    }
}
