//! Deployment configuration resolved from the action inputs

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::app::inputs::{self, Inputs};
use crate::errors::DeployError;
use crate::http::retry::RetryPolicy;
use crate::logs::{LogLevel, LogOptions};
use crate::secrets::projector::{AvailableSecrets, SecretSelection};

pub const DEFAULT_API_BASE_URL: &str = "https://cloud-api.phala.network/api/v1";
pub const DEFAULT_IMAGE: &str = "dstack-0.3.6";
pub const DEFAULT_DOCKER_TAG: &str = "latest";
pub const DEFAULT_VCPU: u32 = 2;
pub const DEFAULT_MEMORY_MB: u32 = 8192;
pub const DEFAULT_DISK_GB: u32 = 40;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Immutable configuration for one deployment
///
/// Built once at startup; no other component reads the environment.
#[derive(Debug)]
pub struct DeployConfig {
    /// Provider API access
    pub api: ApiOptions,

    /// Name of the VM to create or update
    pub vm_name: String,

    /// Existing VM; presence switches to update
    pub vm_id: Option<String>,

    /// OS image for a new VM
    pub image: String,

    /// Compose file, relative to the workspace
    pub compose_file: PathBuf,

    /// Substituted for `${DOCKER_TAG}` in the compose file
    pub docker_tag: String,

    /// Optional pre-launch script, relative to the workspace
    pub prelaunch_script_file: Option<PathBuf>,

    /// Explicit teepod; auto-selected when absent
    pub node_id: Option<String>,

    /// Resources for a new VM
    pub resources: ResourceOptions,

    /// Visibility flags for a new VM
    pub visibility: VisibilityOptions,

    /// Secrets and which of them to forward
    pub secrets: SecretOptions,

    /// Return a failed status when an update is skipped
    pub fail_on_update_skip: bool,

    /// CI runner integration
    pub ci: CiOptions,

    /// Logging
    pub log: LogOptions,
}

/// Provider API options
#[derive(Debug)]
pub struct ApiOptions {
    pub api_key: SecretString,
    pub base_url: Url,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

/// VM resource sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceOptions {
    pub vcpu: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            vcpu: DEFAULT_VCPU,
            memory_mb: DEFAULT_MEMORY_MB,
            disk_gb: DEFAULT_DISK_GB,
        }
    }
}

/// VM visibility flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityOptions {
    pub public_logs: bool,
    pub public_sysinfo: bool,
    pub listed: bool,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            public_logs: false,
            public_sysinfo: true,
            listed: false,
        }
    }
}

/// Secret inputs
#[derive(Debug, Default)]
pub struct SecretOptions {
    pub available: AvailableSecrets,
    pub selection: SecretSelection,
}

/// CI runner paths
#[derive(Debug, Clone)]
pub struct CiOptions {
    pub workspace: PathBuf,
    pub output_file: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,
}

impl Default for CiOptions {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            output_file: None,
            summary_file: None,
        }
    }
}

impl DeployConfig {
    /// Resolve and validate the configuration
    pub fn resolve(inputs: &Inputs) -> Result<Self, DeployError> {
        let api_key = inputs
            .first_of(&[inputs::API_KEY, inputs::API_KEY_FALLBACK])
            .map(|key| SecretString::from(key.to_string()))
            .ok_or_else(|| missing("API key", inputs::API_KEY))?;

        let base_url = inputs.get(inputs::API_BASE_URL).unwrap_or(DEFAULT_API_BASE_URL);
        let base_url = Url::parse(base_url).map_err(|e| {
            DeployError::ConfigError(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(DeployError::ConfigError(format!(
                "API base URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let timeout_secs = parse_positive::<u64>(inputs, inputs::TIMEOUT_SECS)?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_attempts = parse_positive::<u32>(inputs, inputs::MAX_ATTEMPTS)?
            .unwrap_or_else(|| RetryPolicy::default().max_attempts);

        let vm_name = match inputs.get(inputs::VM_NAME) {
            Some(name) => name.to_string(),
            None => repository_name(inputs)
                .ok_or_else(|| missing("VM name", inputs::VM_NAME))?,
        };

        let compose_file = inputs
            .get(inputs::DOCKER_COMPOSE_FILE)
            .map(PathBuf::from)
            .ok_or_else(|| missing("Docker Compose file", inputs::DOCKER_COMPOSE_FILE))?;

        let defaults = ResourceOptions::default();
        let resources = ResourceOptions {
            vcpu: parse_positive(inputs, inputs::VCPU)?.unwrap_or(defaults.vcpu),
            memory_mb: parse_positive(inputs, inputs::MEMORY)?.unwrap_or(defaults.memory_mb),
            disk_gb: parse_positive(inputs, inputs::DISK_SIZE)?.unwrap_or(defaults.disk_gb),
        };

        let defaults = VisibilityOptions::default();
        let visibility = VisibilityOptions {
            public_logs: parse_bool(inputs, inputs::PUBLIC_LOGS)?.unwrap_or(defaults.public_logs),
            public_sysinfo: parse_bool(inputs, inputs::PUBLIC_SYSINFO)?
                .unwrap_or(defaults.public_sysinfo),
            listed: parse_bool(inputs, inputs::LISTED)?.unwrap_or(defaults.listed),
        };

        let available = match inputs.first_of(&[inputs::SECRETS_JSON, inputs::DOPPLER_SECRETS_JSON]) {
            Some(raw) => AvailableSecrets::from_json(raw)?,
            None => AvailableSecrets::default(),
        };
        let selection = SecretSelection::from_inputs(
            inputs.get(inputs::ENCRYPT),
            inputs.get(inputs::EXCLUDE_ENV_VARS),
        )?;

        let log_level = match inputs.get(inputs::LOG_LEVEL) {
            Some(level) => level.parse::<LogLevel>().map_err(DeployError::ConfigError)?,
            None => LogLevel::default(),
        };
        let json_format = match inputs.get(inputs::LOG_FORMAT) {
            None => false,
            Some(format) if format.eq_ignore_ascii_case("json") => true,
            Some(format) if format.eq_ignore_ascii_case("text") => false,
            Some(format) => {
                return Err(DeployError::ConfigError(format!(
                    "Invalid log format '{}' (expected text or json)",
                    format
                )))
            }
        };

        Ok(Self {
            api: ApiOptions {
                api_key,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
                retry: RetryPolicy {
                    max_attempts,
                    ..Default::default()
                },
            },
            vm_name,
            vm_id: inputs.get(inputs::VM_ID).map(str::to_string),
            image: inputs.get(inputs::IMAGE).unwrap_or(DEFAULT_IMAGE).to_string(),
            compose_file,
            docker_tag: inputs
                .get(inputs::DOCKER_TAG)
                .unwrap_or(DEFAULT_DOCKER_TAG)
                .to_string(),
            prelaunch_script_file: inputs.get(inputs::PRELAUNCH_SCRIPT_FILE).map(PathBuf::from),
            node_id: inputs
                .first_of(&[inputs::TEEPOD_ID, inputs::NODE_ID])
                .map(str::to_string),
            resources,
            visibility,
            secrets: SecretOptions {
                available,
                selection,
            },
            fail_on_update_skip: parse_bool(inputs, inputs::FAIL_ON_UPDATE_SKIP)?.unwrap_or(false),
            ci: CiOptions {
                workspace: inputs
                    .get(inputs::GITHUB_WORKSPACE)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| CiOptions::default().workspace),
                output_file: inputs.get(inputs::GITHUB_OUTPUT).map(PathBuf::from),
                summary_file: inputs.get(inputs::GITHUB_STEP_SUMMARY).map(PathBuf::from),
            },
            log: LogOptions {
                log_level,
                json_format,
            },
        })
    }
}

/// Best-effort VM name for reporting when configuration itself failed
pub fn fallback_vm_name(inputs: &Inputs) -> String {
    inputs
        .get(inputs::VM_NAME)
        .map(str::to_string)
        .or_else(|| repository_name(inputs))
        .unwrap_or_default()
}

// "owner/repo" -> "repo"
fn repository_name(inputs: &Inputs) -> Option<String> {
    inputs
        .get(inputs::GITHUB_REPOSITORY)
        .and_then(|repo| repo.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn missing(what: &str, input: &str) -> DeployError {
    DeployError::ConfigError(format!("{} is required (set {})", what, input))
}

fn parse_positive<T>(inputs: &Inputs, name: &str) -> Result<Option<T>, DeployError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = inputs.get(name) else {
        return Ok(None);
    };
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Ok(Some(value)),
        _ => Err(DeployError::ConfigError(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

fn parse_bool(inputs: &Inputs, name: &str) -> Result<Option<bool>, DeployError> {
    let Some(raw) = inputs.get(name) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(Some(true)),
        "false" | "no" | "0" => Ok(Some(false)),
        _ => Err(DeployError::ConfigError(format!(
            "{} must be true or false, got '{}'",
            name, raw
        ))),
    }
}
