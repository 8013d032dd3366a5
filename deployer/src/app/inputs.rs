//! Snapshot of the action inputs
//!
//! The process environment is read exactly once, in `main`. Everything else
//! works from this snapshot so that configuration can be resolved (and tested)
//! without touching global state.

use std::collections::BTreeMap;

pub const API_KEY: &str = "INPUT_API_KEY";
pub const API_KEY_FALLBACK: &str = "PHALA_CLOUD_API_KEY";
pub const API_BASE_URL: &str = "INPUT_API_BASE_URL";
pub const VM_NAME: &str = "INPUT_VM_NAME";
pub const VM_ID: &str = "INPUT_VM_ID";
pub const IMAGE: &str = "INPUT_IMAGE";
pub const DOCKER_COMPOSE_FILE: &str = "INPUT_DOCKER_COMPOSE_FILE";
pub const DOCKER_TAG: &str = "INPUT_DOCKER_TAG";
pub const PRELAUNCH_SCRIPT_FILE: &str = "INPUT_PRELAUNCH_SCRIPT_FILE";
pub const TEEPOD_ID: &str = "INPUT_TEEPOD_ID";
pub const NODE_ID: &str = "INPUT_NODE_ID";
pub const VCPU: &str = "INPUT_VCPU";
pub const MEMORY: &str = "INPUT_MEMORY";
pub const DISK_SIZE: &str = "INPUT_DISK_SIZE";
pub const SECRETS_JSON: &str = "INPUT_SECRETS_JSON";
pub const DOPPLER_SECRETS_JSON: &str = "INPUT_DOPPLER_SECRETS_JSON";
pub const ENCRYPT: &str = "INPUT_ENCRYPT";
pub const EXCLUDE_ENV_VARS: &str = "INPUT_EXCLUDE_ENV_VARS";
pub const PUBLIC_LOGS: &str = "INPUT_PUBLIC_LOGS";
pub const PUBLIC_SYSINFO: &str = "INPUT_PUBLIC_SYSINFO";
pub const LISTED: &str = "INPUT_LISTED";
pub const TIMEOUT_SECS: &str = "INPUT_TIMEOUT_SECS";
pub const MAX_ATTEMPTS: &str = "INPUT_MAX_ATTEMPTS";
pub const FAIL_ON_UPDATE_SKIP: &str = "INPUT_FAIL_ON_UPDATE_SKIP";
pub const LOG_LEVEL: &str = "INPUT_LOG_LEVEL";
pub const LOG_FORMAT: &str = "INPUT_LOG_FORMAT";
pub const GITHUB_ACTIONS: &str = "GITHUB_ACTIONS";
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const GITHUB_WORKSPACE: &str = "GITHUB_WORKSPACE";
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";
pub const GITHUB_STEP_SUMMARY: &str = "GITHUB_STEP_SUMMARY";

/// Immutable view of the named inputs
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    values: BTreeMap<String, String>,
}

impl Inputs {
    /// Capture the current process environment
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed value of an input; empty strings count as absent
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First present value among `names`
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }
}
