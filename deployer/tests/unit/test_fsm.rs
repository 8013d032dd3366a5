//! FSM unit tests

use cvm_deployer::deploy::fsm::{ProvisioningEvent, ProvisioningFsm, ProvisioningState};
use cvm_deployer::errors::DeployError;

#[test]
fn test_fsm_initial_state() {
    let fsm = ProvisioningFsm::new();
    assert_eq!(fsm.state(), ProvisioningState::Idle);
    assert!(fsm.error().is_none());
    assert!(fsm.skip_reason().is_none());
    assert!(!fsm.is_terminal());
}

#[test]
fn test_fsm_update_success_flow() {
    let mut fsm = ProvisioningFsm::new();

    // Idle -> FetchingCurrent
    fsm.process(ProvisioningEvent::Update).unwrap();
    assert_eq!(fsm.state(), ProvisioningState::FetchingCurrent);

    // FetchingCurrent -> Comparing
    fsm.process(ProvisioningEvent::Fetched).unwrap();
    assert_eq!(fsm.state(), ProvisioningState::Comparing);

    // Comparing -> Updating
    fsm.process(ProvisioningEvent::Changed).unwrap();
    assert_eq!(fsm.state(), ProvisioningState::Updating);

    // Updating -> Done
    fsm.process(ProvisioningEvent::Succeeded).unwrap();
    assert_eq!(fsm.state(), ProvisioningState::Done);
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_unchanged_update_is_skipped() {
    let mut fsm = ProvisioningFsm::new();
    fsm.process(ProvisioningEvent::Update).unwrap();
    fsm.process(ProvisioningEvent::Fetched).unwrap();
    fsm.process(ProvisioningEvent::Unchanged("same compose".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), ProvisioningState::SkippedNoChange);
    assert_eq!(fsm.skip_reason(), Some("same compose"));
    assert!(fsm.error().is_none());
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_unsupported_update_is_skipped() {
    let mut fsm = ProvisioningFsm::new();
    fsm.process(ProvisioningEvent::Update).unwrap();
    fsm.process(ProvisioningEvent::Fetched).unwrap();
    fsm.process(ProvisioningEvent::Changed).unwrap();
    fsm.process(ProvisioningEvent::Unsupported("405".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), ProvisioningState::SkippedNoChange);
    assert_eq!(fsm.skip_reason(), Some("405"));
}

#[test]
fn test_fsm_fetch_failure() {
    let mut fsm = ProvisioningFsm::new();
    fsm.process(ProvisioningEvent::Update).unwrap();
    fsm.process(ProvisioningEvent::Failed("not found".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), ProvisioningState::Failed);
    assert_eq!(fsm.error(), Some("not found"));
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_invalid_transitions() {
    let mut fsm = ProvisioningFsm::new();

    // Nothing was sent yet
    let result = fsm.process(ProvisioningEvent::Succeeded);
    assert!(matches!(result, Err(DeployError::InvalidTransition(_))));
    assert_eq!(fsm.state(), ProvisioningState::Idle);

    // A create never goes through the compare step
    fsm.process(ProvisioningEvent::Create).unwrap();
    assert!(fsm.process(ProvisioningEvent::Fetched).is_err());
    assert!(fsm
        .process(ProvisioningEvent::Unchanged("x".to_string()))
        .is_err());
    assert_eq!(fsm.state(), ProvisioningState::Creating);
}

#[test]
fn test_fsm_terminal_states_reject_events() {
    let mut fsm = ProvisioningFsm::new();
    fsm.process(ProvisioningEvent::Create).unwrap();
    fsm.process(ProvisioningEvent::Succeeded).unwrap();

    assert!(fsm.process(ProvisioningEvent::Create).is_err());
    assert!(fsm.process(ProvisioningEvent::Update).is_err());
    assert!(fsm
        .process(ProvisioningEvent::Failed("late".to_string()))
        .is_err());
    assert_eq!(fsm.state(), ProvisioningState::Done);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_failed_is_final() {
    let mut fsm = ProvisioningFsm::new();
    fsm.process(ProvisioningEvent::Create).unwrap();
    fsm.process(ProvisioningEvent::Failed("boom".to_string()))
        .unwrap();

    assert!(fsm.process(ProvisioningEvent::Succeeded).is_err());
    assert_eq!(fsm.state(), ProvisioningState::Failed);
    assert_eq!(fsm.error(), Some("boom"));
}
