//! Orchestration tests against a recording provider

use cvm_deployer::app::inputs;
use cvm_deployer::app::run::{deploy, into_result};
use cvm_deployer::errors::DeployError;
use cvm_deployer::models::deployment::{DeploymentStatus, Operation};
use cvm_deployer::report::output::render_outputs;
use http::StatusCode;
use tokio_test::{assert_err, assert_ok};

use crate::common::{config, workspace, FakeProvider, TagSealer};

const SECRETS: &str = r#"{"B_TOKEN": "2", "A_TOKEN": "1"}"#;
const RENDERED: &str = "services:\n  app:\n    image: ghcr.io/acme/app:v2\n";

#[tokio::test]
async fn test_create_without_vm_id() {
    let ws = workspace();
    let config = config(ws.path(), &[(inputs::SECRETS_JSON, SECRETS)]);
    let provider = FakeProvider::with_nodes(&[8, 3, 5]);

    let outcome = assert_ok!(deploy(&config, &provider, &TagSealer).await);
    assert_eq!(outcome.operation, Operation::Create);
    assert_eq!(outcome.vm_id, "cvm-1");
    assert_eq!(provider.calls(), vec!["list_nodes", "get_pubkey", "create_vm"]);

    let created = provider.created.lock().unwrap().clone().unwrap();
    assert_eq!(created.config.teepod_id, 3);
    assert_eq!(created.config.compose_manifest.docker_compose_file, RENDERED);
    assert_eq!(created.config.vcpu, 2);
    assert_eq!(created.config.memory, 8192);
    assert_eq!(created.config.disk_size, 40);
    assert_eq!(created.app_id_salt, "salt-1");
    assert_eq!(
        created.encrypted_env.as_deref(),
        Some("sealed:app-pubkey:A_TOKEN,B_TOKEN")
    );

    let result = into_result(&config, Ok(outcome));
    assert_eq!(result.status, DeploymentStatus::Success);
    assert_eq!(result.vm_id.as_deref(), Some("cvm-1"));
}

#[tokio::test]
async fn test_create_without_secrets_sends_no_env() {
    let ws = workspace();
    let config = config(ws.path(), &[]);
    let provider = FakeProvider::with_nodes(&[1]);

    assert_ok!(deploy(&config, &provider, &TagSealer).await);
    let created = provider.created.lock().unwrap().clone().unwrap();
    assert!(created.encrypted_env.is_none());
}

#[tokio::test]
async fn test_excluded_secret_is_not_forwarded() {
    let ws = workspace();
    let config = config(
        ws.path(),
        &[
            (inputs::SECRETS_JSON, r#"{"X": "1", "Y": "2"}"#),
            (inputs::EXCLUDE_ENV_VARS, r#"["X"]"#),
        ],
    );
    let provider = FakeProvider::with_nodes(&[1]);

    assert_ok!(deploy(&config, &provider, &TagSealer).await);
    let created = provider.created.lock().unwrap().clone().unwrap();
    assert_eq!(created.encrypted_env.as_deref(), Some("sealed:app-pubkey:Y"));
}

#[tokio::test]
async fn test_unknown_node_makes_no_provisioning_calls() {
    let ws = workspace();
    let config = config(ws.path(), &[(inputs::TEEPOD_ID, "n1")]);
    let provider = FakeProvider::with_nodes(&[1, 2]);

    let err = assert_err!(deploy(&config, &provider, &TagSealer).await);
    assert!(matches!(err, DeployError::NodeNotFound(_)));
    assert_eq!(provider.calls(), vec!["list_nodes"]);
}

#[tokio::test]
async fn test_missing_secret_fails_before_any_call() {
    let ws = workspace();
    let config = config(
        ws.path(),
        &[
            (inputs::SECRETS_JSON, SECRETS),
            (inputs::ENCRYPT, r#"["A_TOKEN", "C_TOKEN"]"#),
        ],
    );
    let provider = FakeProvider::with_nodes(&[1]);

    let err = assert_err!(deploy(&config, &provider, &TagSealer).await);
    assert!(matches!(err, DeployError::MissingSecret(name) if name == "C_TOKEN"));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_failed_create_reports_no_vm_id() {
    let ws = workspace();
    let config = config(ws.path(), &[]);
    let provider = FakeProvider {
        create_failure: Some(StatusCode::INTERNAL_SERVER_ERROR),
        ..FakeProvider::with_nodes(&[1])
    };

    let outcome = deploy(&config, &provider, &TagSealer).await;
    assert!(matches!(
        outcome,
        Err(DeployError::ProviderApi { status, .. }) if status == StatusCode::INTERNAL_SERVER_ERROR
    ));

    let result = into_result(&config, outcome);
    assert_eq!(result.status, DeploymentStatus::Failed);
    assert_eq!(result.operation, Operation::Create);
    assert!(result.vm_id.is_none());
    assert!(!render_outputs(&result).contains("vm-id"));
}

#[tokio::test]
async fn test_update_with_changed_compose() {
    let ws = workspace();
    let config = config(
        ws.path(),
        &[
            (inputs::VM_ID, "cvm-9"),
            (inputs::TEEPOD_ID, "4"),
            (inputs::SECRETS_JSON, SECRETS),
        ],
    );
    let provider = FakeProvider::with_current("services: {}\n", Some("vm-pubkey"));

    let outcome = assert_ok!(deploy(&config, &provider, &TagSealer).await);
    assert_eq!(outcome.operation, Operation::Update);
    assert_eq!(outcome.vm_id, "cvm-9");
    assert_eq!(provider.calls(), vec!["get_vm_compose", "update_vm_compose"]);

    let updated = provider.updated.lock().unwrap().clone().unwrap();
    let manifest = updated.compose_manifest;
    assert_eq!(manifest.docker_compose_file.as_deref(), Some(RENDERED));
    assert!(manifest.public_logs);
    assert_eq!(manifest.other.get("kms_enabled"), Some(&serde_json::json!(true)));
    assert_eq!(
        updated.encrypted_env.as_deref(),
        Some("sealed:vm-pubkey:A_TOKEN,B_TOKEN")
    );
}

#[tokio::test]
async fn test_update_without_changes_is_skipped() {
    let ws = workspace();
    let config = config(ws.path(), &[(inputs::VM_ID, "cvm-9")]);
    let provider = FakeProvider::with_current(RENDERED, Some("vm-pubkey"));

    let outcome = assert_ok!(deploy(&config, &provider, &TagSealer).await);
    assert_eq!(outcome.operation, Operation::UpdateSkipped);
    assert!(outcome.skip_reason.is_some());
    assert_eq!(provider.calls(), vec!["get_vm_compose"]);

    let result = into_result(&config, Ok(outcome));
    assert_eq!(result.status, DeploymentStatus::Success);
    assert_eq!(result.operation, Operation::UpdateSkipped);
    assert_eq!(result.vm_id.as_deref(), Some("cvm-9"));
}

#[tokio::test]
async fn test_skipped_update_can_fail_the_step() {
    let ws = workspace();
    let config = config(
        ws.path(),
        &[(inputs::VM_ID, "cvm-9"), (inputs::FAIL_ON_UPDATE_SKIP, "true")],
    );
    let provider = FakeProvider::with_current(RENDERED, None);

    let outcome = deploy(&config, &provider, &TagSealer).await;
    let result = into_result(&config, outcome);
    assert_eq!(result.status, DeploymentStatus::Failed);
    assert_eq!(result.operation, Operation::UpdateSkipped);
}

#[tokio::test]
async fn test_update_endpoint_unavailable_is_skipped() {
    let ws = workspace();
    let config = config(ws.path(), &[(inputs::VM_ID, "cvm-9")]);
    let provider = FakeProvider {
        update_failure: Some(StatusCode::METHOD_NOT_ALLOWED),
        ..FakeProvider::with_current("services: {}\n", None)
    };

    let outcome = assert_ok!(deploy(&config, &provider, &TagSealer).await);
    assert_eq!(outcome.operation, Operation::UpdateSkipped);
    assert_eq!(provider.calls(), vec!["get_vm_compose", "update_vm_compose"]);
}

#[tokio::test]
async fn test_update_failure_is_never_create() {
    let ws = workspace();
    let config = config(ws.path(), &[(inputs::VM_ID, "cvm-9")]);
    let provider = FakeProvider {
        update_failure: Some(StatusCode::BAD_REQUEST),
        ..FakeProvider::with_current("services: {}\n", None)
    };

    let outcome = deploy(&config, &provider, &TagSealer).await;
    let result = into_result(&config, outcome);
    assert_eq!(result.status, DeploymentStatus::Failed);
    assert_eq!(result.operation, Operation::Update);
    assert!(!provider.calls().contains(&"create_vm"));
}

#[tokio::test]
async fn test_update_of_missing_vm_fails() {
    let ws = workspace();
    let config = config(ws.path(), &[(inputs::VM_ID, "cvm-404")]);
    let provider = FakeProvider::default();

    let err = assert_err!(deploy(&config, &provider, &TagSealer).await);
    assert_eq!(err.provider_status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(provider.calls(), vec!["get_vm_compose"]);
}

#[tokio::test]
async fn test_update_with_env_needs_vm_pubkey() {
    let ws = workspace();
    let config = config(
        ws.path(),
        &[(inputs::VM_ID, "cvm-9"), (inputs::SECRETS_JSON, SECRETS)],
    );
    let provider = FakeProvider::with_current(RENDERED, None);

    let err = assert_err!(deploy(&config, &provider, &TagSealer).await);
    assert!(matches!(err, DeployError::EncryptionError(_)));
    assert_eq!(provider.calls(), vec!["get_vm_compose"]);
}

#[tokio::test]
async fn test_missing_compose_file() {
    let ws = tempfile::tempdir().unwrap();
    let config = config(ws.path(), &[]);
    let provider = FakeProvider::with_nodes(&[1]);

    let err = assert_err!(deploy(&config, &provider, &TagSealer).await);
    assert!(matches!(err, DeployError::FileNotFound { .. }));
    assert!(provider.calls().is_empty());
}
