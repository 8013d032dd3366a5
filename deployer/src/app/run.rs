//! Deployment orchestration

use tracing::{error, info, warn};

use crate::app::options::DeployConfig;
use crate::crypto::envelope::{EnvSealer, X25519Sealer};
use crate::deploy::compose::ComposeRenderer;
use crate::deploy::node::select_node;
use crate::deploy::provider::CvmProvider;
use crate::deploy::provisioner::{ProvisionOutcome, Provisioner};
use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::models::deployment::{
    operation_for, DeploymentRequest, DeploymentResult, DeploymentStatus, Operation,
};
use crate::secrets::projector::project;

/// Run one deployment against the real provider API
///
/// Always produces a result; errors are folded into a failed status.
pub async fn run(config: &DeployConfig) -> DeploymentResult {
    let client = match HttpClient::new(
        config.api.base_url.as_str(),
        &config.api.api_key,
        config.api.timeout,
        config.api.retry.clone(),
    ) {
        Ok(client) => client,
        Err(e) => return into_result(config, Err(e)),
    };

    let outcome = deploy(config, &client, &X25519Sealer).await;
    into_result(config, outcome)
}

/// Project secrets, render compose, select a node and provision
///
/// Every local step runs before the first provider call, and no
/// provisioning call is made once node selection fails.
pub async fn deploy<P, S>(
    config: &DeployConfig,
    provider: &P,
    sealer: &S,
) -> Result<ProvisionOutcome, DeployError>
where
    P: CvmProvider + ?Sized,
    S: EnvSealer + ?Sized,
{
    let env = project(&config.secrets.available, &config.secrets.selection)?;
    info!("{} environment variable(s) selected for encryption", env.len());

    let rendered = ComposeRenderer::new(&config.ci.workspace)
        .render(
            &config.compose_file,
            &config.docker_tag,
            config.prelaunch_script_file.as_deref(),
        )
        .await?;

    let node = match &config.vm_id {
        None => {
            if config.node_id.is_none() {
                info!("No teepod ID specified, finding an available one...");
            }
            let nodes = provider.list_nodes().await?;
            Some(select_node(config.node_id.as_deref(), &nodes, &config.image)?)
        }
        Some(_) => {
            if config.node_id.is_some() {
                warn!("Teepod ID is ignored when updating an existing VM");
            }
            None
        }
    };

    let request = DeploymentRequest {
        vm_name: config.vm_name.clone(),
        vm_id: config.vm_id.clone(),
        image: config.image.clone(),
        compose: rendered.docker_compose_file,
        docker_tag: config.docker_tag.clone(),
        prelaunch_script: rendered.pre_launch_script,
        node,
        vcpu: config.resources.vcpu,
        memory_mb: config.resources.memory_mb,
        disk_gb: config.resources.disk_gb,
        public_logs: config.visibility.public_logs,
        public_sysinfo: config.visibility.public_sysinfo,
        listed: config.visibility.listed,
        env,
    };

    info!(
        "Starting {} of VM '{}' (tag {})",
        request.operation(),
        request.vm_name,
        request.docker_tag
    );
    let mut provisioner = Provisioner::new(provider, sealer);
    provisioner.provision(&request).await
}

/// Fold a provisioning outcome into the reported result
pub fn into_result(
    config: &DeployConfig,
    outcome: Result<ProvisionOutcome, DeployError>,
) -> DeploymentResult {
    match outcome {
        Ok(outcome) if outcome.operation == Operation::UpdateSkipped => {
            let status = if config.fail_on_update_skip {
                DeploymentStatus::Failed
            } else {
                DeploymentStatus::Success
            };
            DeploymentResult {
                status,
                vm_id: Some(outcome.vm_id),
                vm_name: outcome.vm_name,
                operation: Operation::UpdateSkipped,
                message: outcome.skip_reason,
            }
        }
        Ok(outcome) => DeploymentResult::success(outcome.vm_id, outcome.vm_name, outcome.operation),
        Err(e) => {
            error!("An error occurred during deployment: {}", e);
            DeploymentResult::failed(
                config.vm_name.clone(),
                operation_for(config.vm_id.as_deref()),
                e.to_string(),
            )
        }
    }
}
