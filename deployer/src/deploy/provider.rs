//! Provider seam used by the provisioning flow

use async_trait::async_trait;
use openapi_client::models::{
    CreateVmRequest, CvmResponse, PubkeyResponse, Teepod, UpdateComposeRequest, VmComposeResponse,
    VmConfiguration,
};

use crate::errors::DeployError;

/// Operations the deployer needs from the cloud provider
#[async_trait]
pub trait CvmProvider: Send + Sync {
    /// Teepods currently accepting deployments
    async fn list_nodes(&self) -> Result<Vec<Teepod>, DeployError>;

    /// Env encryption key and app id salt derived from a VM configuration
    async fn get_pubkey(&self, config: &VmConfiguration) -> Result<PubkeyResponse, DeployError>;

    async fn create_vm(&self, request: &CreateVmRequest) -> Result<CvmResponse, DeployError>;

    async fn get_vm_compose(&self, vm_id: &str) -> Result<VmComposeResponse, DeployError>;

    async fn update_vm_compose(
        &self,
        vm_id: &str,
        request: &UpdateComposeRequest,
    ) -> Result<(), DeployError>;
}
