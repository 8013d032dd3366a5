//! Secret projection tests

use cvm_deployer::errors::DeployError;
use cvm_deployer::models::deployment::EnvVar;
use cvm_deployer::secrets::projector::{project, AvailableSecrets, SecretSelection};
use secrecy::ExposeSecret;

const SECRETS: &str = r#"{
    "DB_PASS": "hunter2",
    "API_TOKEN": "tok",
    "EMPTY": "",
    "PORT": 8080,
    "UNSET": null
}"#;

fn pairs(envs: &[EnvVar]) -> Vec<(String, String)> {
    envs.iter()
        .map(|e| (e.key.clone(), e.value.expose_secret().to_string()))
        .collect()
}

fn selection(encrypt: Option<&str>, exclude: Option<&str>) -> SecretSelection {
    SecretSelection::from_inputs(encrypt, exclude).unwrap()
}

#[test]
fn test_all_secrets_by_default() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();
    let envs = project(&available, &SecretSelection::default()).unwrap();

    assert_eq!(
        pairs(&envs),
        vec![
            ("API_TOKEN".to_string(), "tok".to_string()),
            ("DB_PASS".to_string(), "hunter2".to_string()),
            ("EMPTY".to_string(), String::new()),
            ("PORT".to_string(), "8080".to_string()),
        ]
    );
}

#[test]
fn test_exclude_list() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();
    let envs = project(&available, &selection(None, Some(r#"["DB_PASS", "NOT_THERE"]"#))).unwrap();

    let keys: Vec<String> = envs.into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["API_TOKEN", "EMPTY", "PORT"]);
}

#[test]
fn test_explicit_list_keeps_requested_order() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();
    let envs = project(&available, &selection(Some(r#"["PORT", "DB_PASS"]"#), None)).unwrap();

    assert_eq!(
        pairs(&envs),
        vec![
            ("PORT".to_string(), "8080".to_string()),
            ("DB_PASS".to_string(), "hunter2".to_string()),
        ]
    );
}

#[test]
fn test_name_mapping_renames() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();
    let envs = project(
        &available,
        &selection(Some(r#"{"DB_PASS": "DATABASE_PASSWORD"}"#), None),
    )
    .unwrap();

    assert_eq!(
        pairs(&envs),
        vec![("DATABASE_PASSWORD".to_string(), "hunter2".to_string())]
    );
}

#[test]
fn test_name_mapping_keeps_selection_order() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();
    let envs = project(
        &available,
        &selection(
            Some(r#"{"PORT": "APP_PORT", "DB_PASS": "DATABASE_PASSWORD", "API_TOKEN": "TOKEN"}"#),
            None,
        ),
    )
    .unwrap();

    let keys: Vec<String> = envs.into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["APP_PORT", "DATABASE_PASSWORD", "TOKEN"]);
}

#[test]
fn test_exclude_list_takes_precedence() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();
    let envs = project(
        &available,
        &selection(Some(r#"["DB_PASS"]"#), Some(r#"["DB_PASS", "EMPTY"]"#)),
    )
    .unwrap();

    let keys: Vec<String> = envs.into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["API_TOKEN", "PORT"]);
}

#[test]
fn test_explicit_missing_secret() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();

    let err = project(&available, &selection(Some(r#"["DB_PASS", "NOPE"]"#), None)).unwrap_err();
    assert!(matches!(err, DeployError::MissingSecret(name) if name == "NOPE"));

    // A null secret cannot be forwarded when asked for by name
    let err = project(&available, &selection(Some(r#"["UNSET"]"#), None)).unwrap_err();
    assert!(matches!(err, DeployError::MissingSecret(name) if name == "UNSET"));
}

#[test]
fn test_duplicate_targets_are_rejected() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();

    let err = project(&available, &selection(Some(r#"["PORT", "PORT"]"#), None)).unwrap_err();
    assert!(matches!(err, DeployError::ConfigError(_)));

    let err = project(
        &available,
        &selection(Some(r#"{"API_TOKEN": "TOKEN", "DB_PASS": "TOKEN"}"#), None),
    )
    .unwrap_err();
    assert!(matches!(err, DeployError::ConfigError(_)));
}

#[test]
fn test_no_secrets_yields_empty_env() {
    let envs = project(&AvailableSecrets::default(), &SecretSelection::default()).unwrap();
    assert!(envs.is_empty());
}

#[test]
fn test_env_debug_hides_values() {
    let available = AvailableSecrets::from_json(SECRETS).unwrap();
    let envs = project(&available, &selection(Some(r#"["DB_PASS"]"#), None)).unwrap();

    let rendered = format!("{:?}", envs);
    assert!(rendered.contains("DB_PASS"));
    assert!(!rendered.contains("hunter2"));
}
