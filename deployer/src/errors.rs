//! Error types for the CVM deployer

use http::StatusCode;
use thiserror::Error;

/// Main error type for the CVM deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Secret '{0}' is not present in the available secrets")]
    MissingSecret(String),

    #[error("{purpose} file not found at: {path}")]
    FileNotFound { purpose: String, path: String },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Provider API error: {status} - {body}")]
    ProviderApi { status: StatusCode, body: String },

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl DeployError {
    /// HTTP status of a provider error, if this is one
    pub fn provider_status(&self) -> Option<StatusCode> {
        match self {
            DeployError::ProviderApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}
