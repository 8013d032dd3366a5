//! CVM API client

use async_trait::async_trait;
use openapi_client::models::{
    CreateVmRequest, CvmResponse, PubkeyResponse, Teepod, UpdateComposeRequest, VmComposeResponse,
    VmConfiguration,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::info;

use crate::deploy::provider::CvmProvider;
use crate::errors::DeployError;
use crate::http::client::{HttpClient, Idempotency};

impl HttpClient {
    /// Request the public key used to encrypt env vars for a new VM
    pub async fn get_pubkey(&self, config: &VmConfiguration) -> Result<PubkeyResponse, DeployError> {
        info!("Requesting env encryption pubkey for VM '{}'", config.name);
        self.post(
            "/cvms/pubkey/from_cvm_configuration",
            config,
            Idempotency::Retryable,
        )
        .await
    }

    /// Create a new VM
    ///
    /// Sent exactly once: a retried create could leave a duplicate VM behind.
    pub async fn create_vm(&self, request: &CreateVmRequest) -> Result<CvmResponse, DeployError> {
        info!("Sending VM creation request for '{}'", request.config.name);
        self.post("/cvms/from_cvm_configuration", request, Idempotency::Once)
            .await
    }

    /// Get the compose manifest and env pubkey of an existing VM
    pub async fn get_vm_compose(&self, vm_id: &str) -> Result<VmComposeResponse, DeployError> {
        info!("Fetching compose details for VM {}", vm_id);
        self.get(&compose_path(vm_id)).await
    }

    /// Replace the compose manifest of an existing VM
    pub async fn update_vm_compose(
        &self,
        vm_id: &str,
        request: &UpdateComposeRequest,
    ) -> Result<(), DeployError> {
        info!("Sending compose update for VM {}", vm_id);
        let _: serde_json::Value = self.put(&compose_path(vm_id), request).await?;
        Ok(())
    }
}

// Characters that cannot appear raw inside one path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ').add(b'"').add(b'<').add(b'>').add(b'`')
    .add(b'#').add(b'?').add(b'{').add(b'}')
    .add(b'/').add(b'%').add(b'+');

fn compose_path(vm_id: &str) -> String {
    format!("/cvms/{}/compose", utf8_percent_encode(vm_id, PATH_SEGMENT))
}

#[async_trait]
impl CvmProvider for HttpClient {
    async fn list_nodes(&self) -> Result<Vec<Teepod>, DeployError> {
        self.get_available_teepods().await
    }

    async fn get_pubkey(&self, config: &VmConfiguration) -> Result<PubkeyResponse, DeployError> {
        HttpClient::get_pubkey(self, config).await
    }

    async fn create_vm(&self, request: &CreateVmRequest) -> Result<CvmResponse, DeployError> {
        HttpClient::create_vm(self, request).await
    }

    async fn get_vm_compose(&self, vm_id: &str) -> Result<VmComposeResponse, DeployError> {
        HttpClient::get_vm_compose(self, vm_id).await
    }

    async fn update_vm_compose(
        &self,
        vm_id: &str,
        request: &UpdateComposeRequest,
    ) -> Result<(), DeployError> {
        HttpClient::update_vm_compose(self, vm_id, request).await
    }
}
