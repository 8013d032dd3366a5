//! Create-or-update provisioning against the provider

use http::StatusCode;
use openapi_client::models::{
    ComposeManifest, CreateVmRequest, UpdateComposeRequest, VmComposeResponse, VmConfiguration,
};
use tracing::{info, warn};

use crate::crypto::envelope::EnvSealer;
use crate::deploy::fsm::{ProvisioningEvent, ProvisioningFsm, ProvisioningState};
use crate::deploy::provider::CvmProvider;
use crate::errors::DeployError;
use crate::models::deployment::{DeploymentRequest, EnvVar, Operation};

const MANIFEST_VERSION: u32 = 2;

/// What the provider confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub operation: Operation,
    pub vm_id: String,
    pub vm_name: String,

    /// Set when the update was not applied
    pub skip_reason: Option<String>,
}

/// Drives one create or update through the provisioning FSM
pub struct Provisioner<'a, P: ?Sized, S: ?Sized> {
    provider: &'a P,
    sealer: &'a S,
    fsm: ProvisioningFsm,
}

impl<'a, P, S> Provisioner<'a, P, S>
where
    P: CvmProvider + ?Sized,
    S: EnvSealer + ?Sized,
{
    pub fn new(provider: &'a P, sealer: &'a S) -> Self {
        Self {
            provider,
            sealer,
            fsm: ProvisioningFsm::new(),
        }
    }

    /// Current FSM state
    pub fn state(&self) -> ProvisioningState {
        self.fsm.state()
    }

    /// Create when the request has no VM id, update otherwise
    pub async fn provision(
        &mut self,
        request: &DeploymentRequest,
    ) -> Result<ProvisionOutcome, DeployError> {
        match request.vm_id.as_deref() {
            None => self.create(request).await,
            Some(vm_id) => self.update(vm_id, request).await,
        }
    }

    async fn create(&mut self, request: &DeploymentRequest) -> Result<ProvisionOutcome, DeployError> {
        info!("Creating new VM: {}", request.vm_name);
        self.fsm.process(ProvisioningEvent::Create)?;

        let result = self.try_create(request).await;
        match result {
            Ok(outcome) => {
                self.fsm.process(ProvisioningEvent::Succeeded)?;
                info!("VM creation initiated successfully (id {})", outcome.vm_id);
                Ok(outcome)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    async fn try_create(&self, request: &DeploymentRequest) -> Result<ProvisionOutcome, DeployError> {
        let node = request.node.as_ref().ok_or_else(|| {
            DeployError::ConfigError("A teepod must be selected before creating a VM".to_string())
        })?;

        let config = VmConfiguration {
            name: request.vm_name.clone(),
            compose_manifest: ComposeManifest {
                manifest_version: MANIFEST_VERSION,
                name: request.vm_name.clone(),
                docker_compose_file: request.compose.clone(),
                pre_launch_script: request.prelaunch_script.clone(),
                tproxy_enabled: true,
                kms_enabled: true,
                public_sysinfo: request.public_sysinfo,
                public_logs: request.public_logs,
            },
            vcpu: request.vcpu,
            memory: request.memory_mb,
            disk_size: request.disk_gb,
            teepod_id: node.teepod_id,
            image: request.image.clone(),
            listed: request.listed,
        };

        let pubkey = self.provider.get_pubkey(&config).await?;
        let encrypted_env = self.seal(&request.env, Some(pubkey.app_env_encrypt_pubkey.as_str()))?;

        let create = CreateVmRequest {
            config,
            app_id_salt: pubkey.app_id_salt,
            encrypted_env,
        };
        let response = self.provider.create_vm(&create).await?;

        let vm_id = response.id.ok_or_else(|| DeployError::ProviderApi {
            status: StatusCode::OK,
            body: "create response did not include a VM id".to_string(),
        })?;

        Ok(ProvisionOutcome {
            operation: Operation::Create,
            vm_id,
            vm_name: response.name.unwrap_or_else(|| request.vm_name.clone()),
            skip_reason: None,
        })
    }

    async fn update(
        &mut self,
        vm_id: &str,
        request: &DeploymentRequest,
    ) -> Result<ProvisionOutcome, DeployError> {
        info!("Updating existing VM with ID: {}", vm_id);
        self.fsm.process(ProvisioningEvent::Update)?;

        let fetched = self.provider.get_vm_compose(vm_id).await;
        let current = match fetched {
            Ok(current) => current,
            Err(e) => {
                warn!("Could not retrieve details for VM {}; ensure it exists and is accessible", vm_id);
                return Err(self.record_failure(e));
            }
        };
        self.fsm.process(ProvisioningEvent::Fetched)?;

        info!("Image, vCPU, memory, disk size and teepod are not changed by a compose update");

        if let Some(reason) = unchanged_reason(&current, request) {
            info!("Skipping update of VM {}: {}", vm_id, reason);
            self.fsm.process(ProvisioningEvent::Unchanged(reason.clone()))?;
            return Ok(self.skipped(vm_id, request, reason));
        }
        self.fsm.process(ProvisioningEvent::Changed)?;

        let encrypted_env = match self.seal(&request.env, current.env_pubkey.as_deref()) {
            Ok(env) => env,
            Err(e) => return Err(self.record_failure(e)),
        };

        let mut manifest = current.compose_file;
        manifest.name = Some(request.vm_name.clone());
        manifest.docker_compose_file = Some(request.compose.clone());
        if let Some(script) = &request.prelaunch_script {
            manifest.pre_launch_script = Some(script.clone());
        }

        let update = UpdateComposeRequest {
            compose_manifest: manifest,
            encrypted_env,
        };

        let updated = self.provider.update_vm_compose(vm_id, &update).await;
        match updated {
            Ok(()) => {
                self.fsm.process(ProvisioningEvent::Succeeded)?;
                info!("VM update request accepted successfully");
                Ok(ProvisionOutcome {
                    operation: Operation::Update,
                    vm_id: vm_id.to_string(),
                    vm_name: request.vm_name.clone(),
                    skip_reason: None,
                })
            }
            Err(e) if is_update_unsupported(&e) => {
                let reason = format!("provider does not support updating this VM ({})", e);
                warn!("Skipping update of VM {}: {}", vm_id, reason);
                self.fsm.process(ProvisioningEvent::Unsupported(reason.clone()))?;
                Ok(self.skipped(vm_id, request, reason))
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn skipped(&self, vm_id: &str, request: &DeploymentRequest, reason: String) -> ProvisionOutcome {
        ProvisionOutcome {
            operation: Operation::UpdateSkipped,
            vm_id: vm_id.to_string(),
            vm_name: request.vm_name.clone(),
            skip_reason: Some(reason),
        }
    }

    fn seal(&self, envs: &[EnvVar], pubkey: Option<&str>) -> Result<Option<String>, DeployError> {
        if envs.is_empty() {
            return Ok(None);
        }
        let pubkey = pubkey.ok_or_else(|| {
            DeployError::EncryptionError(
                "provider returned no env public key, cannot encrypt environment variables"
                    .to_string(),
            )
        })?;
        info!("Encrypting {} environment variable(s)", envs.len());
        self.sealer.seal(envs, pubkey).map(Some)
    }

    fn record_failure(&mut self, err: DeployError) -> DeployError {
        if let Err(e) = self.fsm.process(ProvisioningEvent::Failed(err.to_string())) {
            warn!("{}", e);
        }
        err
    }
}

/// Provider statuses meaning there is no update endpoint for the resource
fn is_update_unsupported(err: &DeployError) -> bool {
    matches!(
        err.provider_status(),
        Some(StatusCode::METHOD_NOT_ALLOWED) | Some(StatusCode::NOT_IMPLEMENTED)
    )
}

fn unchanged_reason(current: &VmComposeResponse, request: &DeploymentRequest) -> Option<String> {
    let compose = &current.compose_file;
    let same_compose = compose.docker_compose_file.as_deref() == Some(request.compose.as_str());
    let same_script = match &request.prelaunch_script {
        Some(script) => compose.pre_launch_script.as_deref() == Some(script.as_str()),
        None => true,
    };
    let same_name = compose.name.as_deref() == Some(request.vm_name.as_str());

    if same_compose && same_script && same_name && request.env.is_empty() {
        Some("compose manifest is unchanged and no environment variables were supplied".to_string())
    } else {
        None
    }
}
