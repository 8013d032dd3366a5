//! API models

use serde::{Deserialize, Deserializer, Serialize};

/// Available teepods response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailableTeepodsResponse {
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Teepod>,
}

/// A host able to run a CVM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teepod {
    pub teepod_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub listed: Option<bool>,
    #[serde(default)]
    pub region_identifier: Option<String>,
    #[serde(default)]
    pub remaining_vcpu: Option<f64>,
    #[serde(default)]
    pub remaining_memory: Option<f64>,
    #[serde(default)]
    pub remaining_cvm_slots: Option<u64>,
    #[serde(default)]
    pub images: Vec<TeepodImage>,
}

impl Teepod {
    /// Whether the node advertises the given OS image.
    ///
    /// Nodes that advertise no images at all are treated as compatible.
    pub fn supports_image(&self, image: &str) -> bool {
        self.images.is_empty() || self.images.iter().any(|i| i.name == image)
    }
}

/// OS image offered by a teepod
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeepodImage {
    pub name: String,
    #[serde(default)]
    pub is_dev: Option<bool>,
}

/// Compose manifest submitted on create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeManifest {
    pub manifest_version: u32,
    pub name: String,
    pub docker_compose_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_launch_script: Option<String>,
    pub tproxy_enabled: bool,
    pub kms_enabled: bool,
    pub public_sysinfo: bool,
    pub public_logs: bool,
}

/// VM configuration, used both to derive the env public key and to create the VM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConfiguration {
    pub name: String,
    pub compose_manifest: ComposeManifest,
    pub vcpu: u32,
    pub memory: u32,
    pub disk_size: u32,
    pub teepod_id: u64,
    pub image: String,
    pub listed: bool,
}

/// Public key response for a VM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubkeyResponse {
    pub app_env_encrypt_pubkey: String,
    pub app_id_salt: String,
}

/// Create VM request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVmRequest {
    #[serde(flatten)]
    pub config: VmConfiguration,
    pub app_id_salt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_env: Option<String>,
}

/// CVM as returned by the create call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvmResponse {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
}

/// Current compose state of a CVM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmComposeResponse {
    pub compose_file: CurrentComposeFile,
    #[serde(default)]
    pub env_pubkey: Option<String>,
}

/// Compose manifest held by an existing CVM
///
/// Fields this client does not touch are kept verbatim in `other` so that an
/// update sends them back unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentComposeFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub docker_compose_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_launch_script: Option<String>,
    #[serde(default)]
    pub public_logs: bool,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Update compose request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateComposeRequest {
    pub compose_manifest: CurrentComposeFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_env: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
