//! Finite State Machine for CVM provisioning

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Provisioning state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    /// Nothing sent yet
    Idle,

    /// Create call in flight
    Creating,

    /// Reading the existing VM before an update
    FetchingCurrent,

    /// Deciding whether the update changes anything
    Comparing,

    /// Update call in flight
    Updating,

    /// Update not applied: nothing changed or the provider cannot update
    SkippedNoChange,

    /// Provider accepted the request
    Done,

    /// A step failed
    Failed,
}

/// Provisioning event
#[derive(Debug, Clone)]
pub enum ProvisioningEvent {
    /// Start a create
    Create,

    /// Start an update
    Update,

    /// Current VM state received
    Fetched,

    /// Request differs from the current state
    Changed,

    /// Request matches the current state
    Unchanged(String),

    /// Provider has no update endpoint for this resource
    Unsupported(String),

    /// Provider accepted the request
    Succeeded,

    /// A step failed
    Failed(String),
}

/// Provisioning FSM
#[derive(Debug, Clone)]
pub struct ProvisioningFsm {
    state: ProvisioningState,
    error: Option<String>,
    skip_reason: Option<String>,
}

impl ProvisioningFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: ProvisioningState::Idle,
            error: None,
            skip_reason: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Why an update was skipped, if it was
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }

    /// Whether no further events are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ProvisioningState::Done | ProvisioningState::Failed | ProvisioningState::SkippedNoChange
        )
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: ProvisioningEvent) -> Result<(), DeployError> {
        use ProvisioningEvent as E;
        use ProvisioningState as S;

        let new_state = match (self.state, &event) {
            // From Idle
            (S::Idle, E::Create) => S::Creating,
            (S::Idle, E::Update) => S::FetchingCurrent,

            // From Creating
            (S::Creating, E::Succeeded) => S::Done,

            // From FetchingCurrent
            (S::FetchingCurrent, E::Fetched) => S::Comparing,

            // From Comparing
            (S::Comparing, E::Changed) => S::Updating,
            (S::Comparing, E::Unchanged(reason)) => {
                self.skip_reason = Some(reason.clone());
                S::SkippedNoChange
            }

            // From Updating
            (S::Updating, E::Succeeded) => S::Done,
            (S::Updating, E::Unsupported(reason)) => {
                self.skip_reason = Some(reason.clone());
                S::SkippedNoChange
            }

            // Any in-flight step can fail
            (S::Creating | S::FetchingCurrent | S::Comparing | S::Updating, E::Failed(err)) => {
                self.error = Some(err.clone());
                S::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(DeployError::InvalidTransition(format!(
                    "{:?} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for ProvisioningFsm {
    fn default() -> Self {
        Self::new()
    }
}
