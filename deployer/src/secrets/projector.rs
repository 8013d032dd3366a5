//! Selects which secrets are forwarded into the CVM

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::models::deployment::EnvVar;
use crate::utils::is_valid_env_name;

/// Secrets available to the step, keyed by name
///
/// A `None` value is a secret that exists but is null in the source JSON.
#[derive(Debug, Default)]
pub struct AvailableSecrets {
    values: BTreeMap<String, Option<SecretString>>,
}

impl AvailableSecrets {
    /// Parse a JSON object of secret name to value
    ///
    /// Strings are taken as-is, nulls are kept as missing values and any other
    /// JSON value is forwarded in its JSON text form.
    pub fn from_json(raw: &str) -> Result<Self, DeployError> {
        let parsed: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| DeployError::ConfigError(format!("Invalid secrets JSON: {}", e)))?;

        let object = match parsed {
            serde_json::Value::Object(object) => object,
            _ => {
                return Err(DeployError::ConfigError(
                    "Secrets JSON must be an object of name to value".to_string(),
                ))
            }
        };

        let values = object
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(SecretString::from(s)),
                    other => Some(SecretString::from(other.to_string())),
                };
                (name, value)
            })
            .collect();

        Ok(Self { values })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), Some(SecretString::from(value.into())));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&SecretString, DeployError> {
        match self.values.get(name) {
            Some(Some(value)) => Ok(value),
            _ => Err(DeployError::MissingSecret(name.to_string())),
        }
    }
}

/// Which secrets to forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSelection {
    /// Every available secret except the listed names
    AllExcept(Vec<String>),

    /// Exactly these secrets, under their own names
    ExplicitList(Vec<String>),

    /// Secret name to target variable name
    NameMapping(Vec<(String, String)>),
}

impl Default for SecretSelection {
    fn default() -> Self {
        SecretSelection::AllExcept(Vec::new())
    }
}

impl SecretSelection {
    /// Resolve the selection inputs
    ///
    /// `encrypt` is either a JSON list of names or a JSON object mapping secret
    /// names to target names. A non-empty `exclude` list takes precedence over
    /// `encrypt` and selects every other available secret.
    pub fn from_inputs(encrypt: Option<&str>, exclude: Option<&str>) -> Result<Self, DeployError> {
        let exclude = match exclude {
            Some(raw) => parse_name_list(raw, "exclude list")?,
            None => Vec::new(),
        };

        let raw = match encrypt {
            Some(raw) if exclude.is_empty() => raw,
            Some(_) => {
                warn!(
                    "Exclude list supplied; ignoring the encrypt selection and forwarding all other secrets"
                );
                return Ok(SecretSelection::AllExcept(exclude));
            }
            None => return Ok(SecretSelection::AllExcept(exclude)),
        };

        let parsed: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| DeployError::ConfigError(format!("Invalid encrypt selection JSON: {}", e)))?;

        match parsed {
            serde_json::Value::Array(_) => Ok(SecretSelection::ExplicitList(parse_name_list(
                raw,
                "encrypt list",
            )?)),
            serde_json::Value::Object(_) => {
                // Re-read keeping the order the mapping was written in
                let object: IndexMap<String, serde_json::Value> = serde_json::from_str(raw)?;
                let mut pairs = Vec::with_capacity(object.len());
                for (secret, target) in object {
                    match target {
                        serde_json::Value::String(target) => pairs.push((secret, target)),
                        other => {
                            return Err(DeployError::ConfigError(format!(
                                "Target name for secret '{}' must be a string, got {}",
                                secret, other
                            )))
                        }
                    }
                }
                Ok(SecretSelection::NameMapping(pairs))
            }
            _ => Err(DeployError::ConfigError(
                "Encrypt selection must be a JSON list or object".to_string(),
            )),
        }
    }
}

fn parse_name_list(raw: &str, what: &str) -> Result<Vec<String>, DeployError> {
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|e| DeployError::ConfigError(format!("Invalid {} (expected a JSON list of names): {}", what, e)))
}

/// Project the selected secrets into an ordered env list
///
/// Every target name appears exactly once and is a valid variable name.
pub fn project(available: &AvailableSecrets, selection: &SecretSelection) -> Result<Vec<EnvVar>, DeployError> {
    let pairs: Vec<(&str, &str)> = match selection {
        SecretSelection::AllExcept(exclude) => {
            info!("Processing {} available secrets", available.len());
            let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();
            let mut pairs = Vec::new();
            for (name, value) in &available.values {
                if excluded.contains(name.as_str()) {
                    info!("  - Excluding '{}' as requested", name);
                    continue;
                }
                if value.is_none() {
                    info!("  - Skipping '{}' because its value is null", name);
                    continue;
                }
                pairs.push((name.as_str(), name.as_str()));
            }
            pairs
        }
        SecretSelection::ExplicitList(names) => names
            .iter()
            .map(|name| (name.as_str(), name.as_str()))
            .collect(),
        SecretSelection::NameMapping(mapping) => mapping
            .iter()
            .map(|(secret, target)| (secret.as_str(), target.as_str()))
            .collect(),
    };

    let mut seen = HashSet::new();
    let mut envs = Vec::with_capacity(pairs.len());
    for (secret, target) in pairs {
        if !is_valid_env_name(target) {
            return Err(DeployError::ConfigError(format!(
                "'{}' is not a valid environment variable name",
                target
            )));
        }
        if !seen.insert(target) {
            return Err(DeployError::ConfigError(format!(
                "Environment variable '{}' is selected more than once",
                target
            )));
        }
        let value = available.lookup(secret)?;
        debug!("  - Adding '{}' for encryption", target);
        envs.push(EnvVar::new(target, value.expose_secret()));
    }

    Ok(envs)
}
