//! Deployment models

use std::fmt;

use openapi_client::models::Teepod;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// An environment variable forwarded into the CVM
pub struct EnvVar {
    /// Variable name inside the CVM
    pub key: String,

    /// Plaintext value, only exposed when sealing
    pub value: SecretString,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: SecretString::from(value.into()),
        }
    }

    /// JSON form expected inside the sealed envelope
    pub fn to_plain_json(&self) -> serde_json::Value {
        serde_json::json!({
            "key": self.key,
            "value": self.value.expose_secret(),
        })
    }
}

impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVar")
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Everything needed to create or update one CVM
#[derive(Debug)]
pub struct DeploymentRequest {
    pub vm_name: String,

    /// Existing VM to update; absent means create
    pub vm_id: Option<String>,

    pub image: String,

    /// Rendered docker-compose text
    pub compose: String,

    pub docker_tag: String,

    pub prelaunch_script: Option<String>,

    /// Target node, only set for create
    pub node: Option<Teepod>,

    pub vcpu: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,

    pub public_logs: bool,
    pub public_sysinfo: bool,
    pub listed: bool,

    /// Ordered variables to seal before transmission
    pub env: Vec<EnvVar>,
}

impl DeploymentRequest {
    /// Operation implied by the request
    pub fn operation(&self) -> Operation {
        operation_for(self.vm_id.as_deref())
    }
}

/// Operation implied by an optional VM id
pub fn operation_for(vm_id: Option<&str>) -> Operation {
    match vm_id {
        Some(_) => Operation::Update,
        None => Operation::Create,
    }
}

/// Kind of provisioning performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    UpdateSkipped,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::UpdateSkipped => "update_skipped",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status of the step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Success,
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
        }
    }
}

/// Outcome reported to the CI step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub status: DeploymentStatus,

    /// Only set when confirmed by the provider
    pub vm_id: Option<String>,

    pub vm_name: String,

    pub operation: Operation,

    /// Human readable diagnostic for failures and skips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeploymentResult {
    pub fn success(vm_id: String, vm_name: String, operation: Operation) -> Self {
        Self {
            status: DeploymentStatus::Success,
            vm_id: Some(vm_id),
            vm_name,
            operation,
            message: None,
        }
    }

    pub fn failed(vm_name: String, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            status: DeploymentStatus::Failed,
            vm_id: None,
            vm_name,
            operation,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeploymentStatus::Success
    }
}
